// ==========================================
// 金矿物流溯源系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls, 全部工作表) / CSV (.csv) / JSON (.json)
// 输出: 按工作表分组的原始行（列名 → 文本）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 数据行序号（从 1 开始, 不含表头, 空白行也计数）
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: usize, fields: HashMap<String, String>) -> Self {
        Self { row_number, fields }
    }

    /// 完全空白的行
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

/// 原始工作表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<RawRow>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_sheets(&self, file_path: &Path) -> ImportResult<Vec<RawSheet>> {
        ensure_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let mut fields = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    fields.insert(header.clone(), value.trim().to_string());
                }
            }

            let row = RawRow::new(idx + 1, fields);
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        Ok(vec![RawSheet::new(file_stem(file_path), rows)])
    }
}

// ==========================================
// Excel Parser 实现（读取全部工作表）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_sheets(&self, file_path: &Path) -> ImportResult<Vec<RawSheet>> {
        ensure_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        }

        let mut sheets = Vec::new();
        for sheet_name in sheet_names {
            let range = workbook.worksheet_range(&sheet_name)?;

            let mut data_rows = range.rows();
            let headers: Vec<String> = match data_rows.next() {
                Some(header_row) => header_row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect(),
                None => {
                    tracing::debug!(sheet = %sheet_name, "工作表为空, 跳过");
                    continue;
                }
            };

            let mut rows = Vec::new();
            for (idx, data_row) in data_rows.enumerate() {
                let mut fields = HashMap::new();
                for (col_idx, cell) in data_row.iter().enumerate() {
                    if let Some(header) = headers.get(col_idx) {
                        if header.is_empty() {
                            continue;
                        }
                        fields.insert(header.clone(), cell.to_string().trim().to_string());
                    }
                }

                let row = RawRow::new(idx + 1, fields);
                if row.is_blank() {
                    continue;
                }
                rows.push(row);
            }

            sheets.push(RawSheet::new(sheet_name, rows));
        }

        Ok(sheets)
    }
}

// ==========================================
// JSON Parser 实现
// ==========================================
// 接受两种上游交接形态:
// - [ {列: 值}, ... ]            → 单个工作表（以文件名命名）
// - { 工作表: [ {列: 值}, ... ] } → 多个工作表
pub struct JsonParser;

impl JsonParser {
    pub fn parse_value(&self, default_name: &str, value: Value) -> ImportResult<Vec<RawSheet>> {
        match value {
            Value::Array(items) => Ok(vec![rows_from_array(default_name, items)?]),
            Value::Object(map) => map
                .into_iter()
                .map(|(name, rows)| match rows {
                    Value::Array(items) => rows_from_array(&name, items),
                    _ => Err(ImportError::JsonParseError(format!(
                        "工作表 {} 必须是行数组",
                        name
                    ))),
                })
                .collect(),
            _ => Err(ImportError::JsonParseError(
                "顶层必须是行数组或 工作表→行数组 的对象".to_string(),
            )),
        }
    }
}

impl FileParser for JsonParser {
    fn parse_sheets(&self, file_path: &Path) -> ImportResult<Vec<RawSheet>> {
        ensure_exists(file_path)?;
        let text = std::fs::read_to_string(file_path)?;
        let value: Value = serde_json::from_str(&text)?;
        self.parse_value(&file_stem(file_path), value)
    }
}

fn rows_from_array(sheet_name: &str, items: Vec<Value>) -> ImportResult<RawSheet> {
    let mut rows = Vec::new();
    for (idx, item) in items.into_iter().enumerate() {
        let object = match item {
            Value::Object(object) => object,
            _ => {
                return Err(ImportError::JsonParseError(format!(
                    "工作表 {} 第 {} 行不是对象",
                    sheet_name,
                    idx + 1
                )))
            }
        };

        let fields = object
            .into_iter()
            .map(|(key, value)| (key.trim().to_string(), value_to_text(&value)))
            .collect();

        let row = RawRow::new(idx + 1, fields);
        if row.is_blank() {
            continue;
        }
        rows.push(row);
    }
    Ok(RawSheet::new(sheet_name, rows))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawSheet>> {
        let path = file_path.as_ref();
        match extension(path).as_str() {
            "csv" => CsvParser.parse_sheets(path),
            "xlsx" | "xls" => ExcelParser.parse_sheets(path),
            "json" => JsonParser.parse_sheets(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
