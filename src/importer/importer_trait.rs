// ==========================================
// 金矿物流溯源系统 - 导入接口 Trait
// ==========================================
// 职责: 定义导入边界接口（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawSheet;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 原始文件 → 按工作表分组的原始行
// 实现者: CsvParser, ExcelParser, JsonParser
pub trait FileParser: Send + Sync {
    /// 解析文件
    ///
    /// # 返回
    /// - Ok(Vec<RawSheet>): 每个工作表一项（CSV 只有一项, 以文件名命名）
    /// - Err: 文件不存在 / 格式不支持 / 解析失败
    ///
    /// # 说明
    /// - 完全空白的行被跳过, 但保留原始行号
    fn parse_sheets(&self, file_path: &Path) -> ImportResult<Vec<RawSheet>>;
}
