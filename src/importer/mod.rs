// ==========================================
// 金矿物流溯源系统 - 导入层
// ==========================================
// 职责: 外部数据导入, 生成规范化记录
// 支持: Excel, CSV, JSON
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod normalizer;
pub mod sample_code_parser;

// 重导出核心类型
pub use error::{ImportError, ImportResult, NormalizeError, RowError, SampleCodeError};
pub use field_mapper::{FieldMapper, MappedStream, RejectedRow};
pub use file_parser::{CsvParser, ExcelParser, JsonParser, RawRow, RawSheet, UniversalFileParser};
pub use importer_trait::FileParser;
pub use normalizer::Normalizer;
pub use sample_code_parser::SampleCodeParser;
