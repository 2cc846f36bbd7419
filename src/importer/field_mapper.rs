// ==========================================
// 金矿物流溯源系统 - 字段映射器实现
// ==========================================
// 职责: 原始行 → 规范化记录（运输 / 转运 / 化验）
// 红线: 单行问题就地恢复: 可选字段置空, 必填字段缺失则整行拒绝
//       （拒绝行由编排器转为 record_rejected 告警）, 绝不中止整批
// ==========================================

use crate::config::config_loader::EngineConfig;
use crate::domain::records::{
    AssayRecord, CanonicalName, RecordId, SampleCodeStatus, ShipmentRecord, TransferRecord,
};
use crate::domain::types::{FacilityCode, RecordType};
use crate::importer::error::RowError;
use crate::importer::file_parser::{RawRow, RawSheet};
use crate::importer::normalizer::Normalizer;
use crate::importer::sample_code_parser::SampleCodeParser;
use std::collections::{BTreeMap, HashMap};

/// 汇总行标记（"合计"）
const SUMMARY_MARKER: &str = "جمع";

/// 已知表头笔误
const HEADER_TYPOS: [(&str, &str); 3] = [
    ("تاربخ", "تاریخ"),
    ("جمع نتاژ", "جمع تناژ"),
    ("samole", "sample"),
];

// ==========================================
// 列名别名
// ==========================================
const DATE: &[&str] = &["date", "تاریخ"];
const ROW_NUMBER: &[&str] = &["row_number", "ردیف"];
const TRUCK_NUMBER: &[&str] = &["truck_number", "شماره کامیون"];
const RECEIPT_NUMBER: &[&str] = &["receipt_number", "شماره رسید"];
const NET_WEIGHT: &[&str] = &["tonnage_kg", "net_weight_kg", "tonnage", "تناژ", "وزن خالص"];
const GROSS_WEIGHT: &[&str] = &["gross_weight_kg", "وزن ناخالص"];
const DESTINATION: &[&str] = &["destination", "مقصد"];
const COST_PER_TON: &[&str] = &["cost_per_ton", "cost_per_ton_rial", "هزینه به ازای هر تن"];
const DRIVER: &[&str] = &["driver_name", "driver", "نام راننده", "راننده"];
const NOTES: &[&str] = &["notes", "توضیحات"];
const CUMULATIVE_WEIGHT: &[&str] = &["cumulative_tonnage", "cumulative_weight_kg", "جمع تناژ"];
const SAMPLE_CODE: &[&str] = &["sample_code", "sample"];

/// 被拒绝的原始行
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub record_id: RecordId,
    pub record_type: RecordType,
    pub error: RowError,
}

/// 单条数据流的映射结果
#[derive(Debug, Clone, PartialEq)]
pub struct MappedStream<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
    pub skipped_summary_rows: usize,
}

impl<T> Default for MappedStream<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
            skipped_summary_rows: 0,
        }
    }
}

/// 行视图: 表头经笔误修正并转小写后的 列名 → 值
struct RowView<'r> {
    fields: HashMap<String, &'r str>,
}

impl<'r> RowView<'r> {
    fn new(row: &'r RawRow) -> Self {
        let fields = row
            .fields
            .iter()
            .map(|(key, value)| (normalize_header(key), value.as_str()))
            .collect();
        Self { fields }
    }

    /// 提取文本字段（按别名依次尝试, 空值视为缺失）
    fn get(&self, aliases: &[&str]) -> Option<&'r str> {
        aliases.iter().find_map(|alias| {
            self.fields
                .get(&alias.to_lowercase())
                .copied()
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
    }

    fn get_owned(&self, aliases: &[String]) -> Option<&'r str> {
        let refs: Vec<&str> = aliases.iter().map(String::as_str).collect();
        self.get(&refs)
    }

    fn is_summary(&self) -> bool {
        self.fields.values().any(|v| v.contains(SUMMARY_MARKER))
    }
}

fn normalize_header(header: &str) -> String {
    let lowered = header.trim().to_lowercase();
    HEADER_TYPOS
        .iter()
        .find(|(typo, _)| *typo == lowered)
        .map(|(_, fixed)| fixed.to_string())
        .unwrap_or(lowered)
}

pub struct FieldMapper<'a> {
    normalizer: Normalizer,
    config: &'a EngineConfig,
    parser: &'a SampleCodeParser,
}

impl<'a> FieldMapper<'a> {
    pub fn new(config: &'a EngineConfig, parser: &'a SampleCodeParser) -> Self {
        Self {
            normalizer: Normalizer,
            config,
            parser,
        }
    }

    // ==========================================
    // 运输记录
    // ==========================================

    pub fn map_shipments(&self, sheets: &[RawSheet]) -> MappedStream<ShipmentRecord> {
        let mut stream = MappedStream::default();
        for sheet in sheets {
            for row in &sheet.rows {
                let view = RowView::new(row);
                if view.is_summary() {
                    stream.skipped_summary_rows += 1;
                    continue;
                }

                let record_id = RecordId::shipment(&sheet.name, row.row_number);
                match self.map_shipment(&sheet.name, row.row_number, &view, record_id.clone()) {
                    Ok(record) => stream.records.push(record),
                    Err(error) => {
                        tracing::warn!(record_id = %record_id, error = %error, "运输记录被拒绝");
                        stream.rejected.push(RejectedRow {
                            record_id,
                            record_type: RecordType::Shipment,
                            error,
                        });
                    }
                }
            }
        }
        stream
    }

    fn map_shipment(
        &self,
        sheet_name: &str,
        row_number: usize,
        view: &RowView<'_>,
        record_id: RecordId,
    ) -> Result<ShipmentRecord, RowError> {
        let date_text = view.get(DATE).ok_or_else(|| missing("date"))?;
        let date = self
            .normalizer
            .normalize_calendar_date(date_text)
            .ok_or_else(|| unrecognized("date", date_text))?;

        let net_weight_kg = self.required_positive(view, NET_WEIGHT, "tonnage_kg")?;

        let destination_text = view.get(DESTINATION).ok_or_else(|| missing("destination"))?;
        let destination = self
            .config
            .facilities
            .facility_for_destination(destination_text)
            .ok_or_else(|| RowError::UnregisteredFacility(destination_text.to_string()))?;

        let cost_per_ton_rial = self.optional_numeric(&record_id, view, COST_PER_TON, "cost_per_ton");
        let transport_cost_rial =
            cost_per_ton_rial.map(|cost| self.normalizer.transport_cost(net_weight_kg, cost));

        Ok(ShipmentRecord {
            sheet_name: sheet_name.to_string(),
            row_number,
            source_row: view
                .get(ROW_NUMBER)
                .map(|v| self.normalizer.clean_identifier_number(v)),
            date,
            destination,
            destination_text: destination_text.to_string(),
            net_weight_kg,
            gross_weight_kg: self.optional_numeric(&record_id, view, GROSS_WEIGHT, "gross_weight_kg"),
            cost_per_ton_rial,
            transport_cost_rial,
            truck_number: self.identifier(view, TRUCK_NUMBER),
            receipt_number: self.identifier(view, RECEIPT_NUMBER),
            driver: self.identity(view),
            notes: view.get(NOTES).map(str::to_string),
            record_id,
        })
    }

    // ==========================================
    // 料仓转运记录
    // ==========================================

    pub fn map_transfers(&self, sheets: &[RawSheet]) -> MappedStream<TransferRecord> {
        let mut stream = MappedStream::default();
        for sheet in sheets {
            let origin = self.config.facilities.facility_for_sheet(&sheet.name);
            if origin.is_none() {
                tracing::warn!(sheet = %sheet.name, rows = sheet.rows.len(), "未知的转运工作表");
            }

            for row in &sheet.rows {
                let view = RowView::new(row);
                if view.is_summary() {
                    stream.skipped_summary_rows += 1;
                    continue;
                }

                let record_id = RecordId::transfer(&sheet.name, row.row_number);
                let mapped = match origin {
                    Some(origin) => self.map_transfer(sheet, row.row_number, origin, &view, record_id.clone()),
                    None => Err(RowError::UnknownSheet(sheet.name.clone())),
                };

                match mapped {
                    Ok(record) => stream.records.push(record),
                    Err(error) => {
                        tracing::warn!(record_id = %record_id, error = %error, "转运记录被拒绝");
                        stream.rejected.push(RejectedRow {
                            record_id,
                            record_type: RecordType::Transfer,
                            error,
                        });
                    }
                }
            }
        }
        stream
    }

    fn map_transfer(
        &self,
        sheet: &RawSheet,
        row_number: usize,
        origin: FacilityCode,
        view: &RowView<'_>,
        record_id: RecordId,
    ) -> Result<TransferRecord, RowError> {
        let date_text = view.get(DATE).ok_or_else(|| missing("date"))?;
        let date = self
            .normalizer
            .normalize_calendar_date(date_text)
            .ok_or_else(|| unrecognized("date", date_text))?;

        let weight_kg = self.required_positive(view, NET_WEIGHT, "tonnage_kg")?;
        let settings = &self.config.settings;

        Ok(TransferRecord {
            sheet_name: sheet.name.clone(),
            row_number,
            origin,
            date,
            weight_kg,
            cumulative_weight_kg: self.optional_numeric(
                &record_id,
                view,
                CUMULATIVE_WEIGHT,
                "cumulative_tonnage",
            ),
            destination: settings.plant_name.clone(),
            driver: self.identity(view),
            transport_cost_rial: self
                .normalizer
                .transport_cost(weight_kg, settings.bunker_cost_per_ton_rial),
            record_id,
        })
    }

    // ==========================================
    // 化验记录
    // ==========================================

    pub fn map_assays(&self, sheets: &[RawSheet]) -> MappedStream<AssayRecord> {
        let mut stream = MappedStream::default();
        let analyte_columns: Vec<(String, Vec<String>)> = self
            .config
            .settings
            .analytes
            .iter()
            .map(|a| (a.to_lowercase(), analyte_aliases(a)))
            .collect();

        for sheet in sheets {
            for row in &sheet.rows {
                let view = RowView::new(row);
                let record_id = RecordId::assay(&sheet.name, row.row_number);

                let sample_code = match view.get(SAMPLE_CODE) {
                    Some(code) => code.to_string(),
                    None => {
                        tracing::warn!(record_id = %record_id, "化验记录缺少样品编码");
                        stream.rejected.push(RejectedRow {
                            record_id,
                            record_type: RecordType::Assay,
                            error: missing("sample_code"),
                        });
                        continue;
                    }
                };

                let code = match self.parser.parse(&sample_code) {
                    Ok(descriptor) => SampleCodeStatus::Parsed { descriptor },
                    Err(e) => {
                        tracing::warn!(record_id = %record_id, sample_code = %sample_code, error = %e, "样品编码无效");
                        SampleCodeStatus::Invalid {
                            reason: e.to_string(),
                        }
                    }
                };

                let mut analytes = BTreeMap::new();
                for (analyte, aliases) in &analyte_columns {
                    let Some(text) = view.get_owned(aliases) else {
                        continue;
                    };
                    match self.normalizer.parse_concentration(text) {
                        Ok(Some(value)) => {
                            analytes.insert(analyte.clone(), value);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(record_id = %record_id, analyte = %analyte, error = %e, "含量无法解析, 字段置空");
                        }
                    }
                }

                stream.records.push(AssayRecord {
                    record_id,
                    sheet_name: sheet.name.clone(),
                    row_number: row.row_number,
                    sample_code,
                    code,
                    analytes,
                });
            }
        }
        stream
    }

    // ==========================================
    // 字段辅助
    // ==========================================

    fn required_positive(
        &self,
        view: &RowView<'_>,
        aliases: &[&str],
        field: &str,
    ) -> Result<f64, RowError> {
        let text = view.get(aliases).ok_or_else(|| missing(field))?;
        let value = self.normalizer.clean_numeric(text)?.ok_or_else(|| missing(field))?;
        if value <= 0.0 {
            return Err(RowError::NonPositive {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }

    /// 可选数值字段: 格式错误时记录警告并置空
    fn optional_numeric(
        &self,
        record_id: &RecordId,
        view: &RowView<'_>,
        aliases: &[&str],
        field: &str,
    ) -> Option<f64> {
        let text = view.get(aliases)?;
        match self.normalizer.clean_numeric(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(record_id = %record_id, field = field, error = %e, "可选字段无法解析, 置空");
                None
            }
        }
    }

    fn identifier(&self, view: &RowView<'_>, aliases: &[&str]) -> Option<String> {
        view.get(aliases)
            .map(|v| self.normalizer.clean_identifier_number(v))
            .filter(|v| !v.is_empty())
    }

    fn identity(&self, view: &RowView<'_>) -> Option<CanonicalName> {
        view.get(DRIVER)
            .map(|raw| self.normalizer.canonicalize_identity(raw, &self.config.identities))
    }
}

/// 元素含量列别名: au_ppm / Au (ppm) / au
fn analyte_aliases(analyte: &str) -> Vec<String> {
    let lower = analyte.to_lowercase();
    vec![
        format!("{}_ppm", lower),
        format!("{} (ppm)", lower),
        format!("{}(ppm)", lower),
        lower,
    ]
}

fn missing(field: &str) -> RowError {
    RowError::MissingField {
        field: field.to_string(),
    }
}

fn unrecognized(field: &str, value: &str) -> RowError {
    RowError::UnrecognizedValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::registries::{
        CategoryAlphabet, DriversFile, FacilityInfo, FacilityRegistry, IdentityEntry,
        IdentityRegistry,
    };
    use crate::config::rule_set::RuleSet;
    use crate::config::settings::EngineSettings;
    use crate::domain::records::Concentration;

    fn config() -> EngineConfig {
        let mut facilities = BTreeMap::new();
        facilities.insert(
            "A".to_string(),
            FacilityInfo {
                truck_dest: Some("رباط".to_string()),
                bunker_sheet: Some("رباط سفید".to_string()),
                ..Default::default()
            },
        );
        facilities.insert("B".to_string(), FacilityInfo::default());
        facilities.insert("C".to_string(), FacilityInfo::default());

        let mut drivers = BTreeMap::new();
        drivers.insert(
            "علی کریمی".to_string(),
            IdentityEntry {
                aliases: vec!["کریمی".to_string()],
                status: "active".to_string(),
            },
        );

        EngineConfig {
            facilities: FacilityRegistry::from_map(facilities).unwrap(),
            categories: CategoryAlphabet::all(),
            identities: IdentityRegistry::from_file(DriversFile {
                canonical_drivers: drivers,
            })
            .unwrap(),
            rules: RuleSet::default(),
            settings: EngineSettings::default(),
        }
    }

    fn row(n: usize, pairs: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            n,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_map_shipment_persian_headers() {
        let config = config();
        let parser = SampleCodeParser::new(&config.facilities, &config.categories).unwrap();
        let mapper = FieldMapper::new(&config, &parser);

        let sheet = RawSheet::new(
            "trucking",
            vec![row(
                1,
                &[
                    ("تاربخ", "1404/10/14"),
                    ("تناژ", "25,000"),
                    ("مقصد", "آسیاب رباط سفید"),
                    ("هزینه به ازای هر تن", "7,000,000"),
                    ("شماره رسید", "14978.0"),
                    ("نام راننده", "كريمي"),
                ],
            )],
        );

        let stream = mapper.map_shipments(&[sheet]);
        assert!(stream.rejected.is_empty());
        let s = &stream.records[0];
        assert_eq!(s.destination, FacilityCode::A);
        assert_eq!(s.net_weight_kg, 25000.0);
        assert_eq!(s.transport_cost_rial, Some(175_000_000.0));
        assert_eq!(s.receipt_number.as_deref(), Some("14978"));
        assert_eq!(s.driver.as_ref().map(|d| d.display_name()), Some("علی کریمی"));
        assert_eq!(s.record_id.as_str(), "shipment:trucking:1");
    }

    #[test]
    fn test_shipment_rejections_and_summary_rows() {
        let config = config();
        let parser = SampleCodeParser::new(&config.facilities, &config.categories).unwrap();
        let mapper = FieldMapper::new(&config, &parser);

        let sheet = RawSheet::new(
            "trucking",
            vec![
                row(1, &[("date", "1404/13/01"), ("tonnage_kg", "20000"), ("destination", "C")]),
                row(2, &[("date", "1404/10/14"), ("tonnage_kg", "0"), ("destination", "C")]),
                row(3, &[("date", "1404/10/14"), ("tonnage_kg", "20000"), ("destination", "D")]),
                row(4, &[("date", "جمع"), ("tonnage_kg", "40000")]),
            ],
        );

        let stream = mapper.map_shipments(&[sheet]);
        assert!(stream.records.is_empty());
        assert_eq!(stream.skipped_summary_rows, 1);
        assert_eq!(stream.rejected.len(), 3);
        assert!(matches!(stream.rejected[0].error, RowError::UnrecognizedValue { .. }));
        assert!(matches!(stream.rejected[1].error, RowError::NonPositive { .. }));
        assert!(matches!(stream.rejected[2].error, RowError::UnregisteredFacility(_)));
    }

    #[test]
    fn test_map_transfers_by_sheet() {
        let config = config();
        let parser = SampleCodeParser::new(&config.facilities, &config.categories).unwrap();
        let mapper = FieldMapper::new(&config, &parser);

        let known = RawSheet::new(
            "رباط سفید",
            vec![row(1, &[("تاریخ", "1404/10/14"), ("تناژ", "10000"), ("جمع نتاژ", "10000")])],
        );
        let unknown = RawSheet::new("Sheet9", vec![row(1, &[("تاریخ", "1404/10/14"), ("تناژ", "1")])]);

        let stream = mapper.map_transfers(&[known, unknown]);
        assert_eq!(stream.records.len(), 1);
        let t = &stream.records[0];
        assert_eq!(t.origin, FacilityCode::A);
        assert_eq!(t.cumulative_weight_kg, Some(10000.0));
        assert_eq!(t.transport_cost_rial, 32_000_000.0);
        assert_eq!(stream.rejected.len(), 1);
        assert_eq!(stream.rejected[0].error, RowError::UnknownSheet("Sheet9".to_string()));
    }

    #[test]
    fn test_map_assays_keeps_invalid_codes() {
        let config = config();
        let parser = SampleCodeParser::new(&config.facilities, &config.categories).unwrap();
        let mapper = FieldMapper::new(&config, &parser);

        let sheet = RawSheet::new(
            "Solids",
            vec![
                row(1, &[("Samole", "A14041014K2"), ("Au (ppm)", "6.2")]),
                row(2, &[("Sample", "XX99"), ("Au (ppm)", "<0.05")]),
                row(3, &[("Au (ppm)", "1.0")]),
            ],
        );

        let stream = mapper.map_assays(&[sheet]);
        assert_eq!(stream.records.len(), 2);
        assert_eq!(stream.rejected.len(), 1);

        let first = &stream.records[0];
        assert!(first.descriptor().is_some());
        assert_eq!(
            first.concentration("au"),
            Some(&Concentration::Measured { ppm: 6.2 })
        );

        let second = &stream.records[1];
        assert!(matches!(second.code, SampleCodeStatus::Invalid { .. }));
        assert_eq!(
            second.concentration("au"),
            Some(&Concentration::BelowDetectionLimit {
                limit_ppm: Some(0.05)
            })
        );
    }
}
