// ==========================================
// 金矿物流溯源系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 单条记录的格式/解析问题一律在本地恢复为数据 (空字段 / 告警),
//       只有文件级错误才向调用方传播
// ==========================================

use thiserror::Error;

/// 文本规范化错误（FormatError）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("数值格式错误: '{value}' ({message})")]
    Format { value: String, message: String },
}

/// 样品编码错误（InvalidSampleCodeError）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleCodeError {
    #[error("样品编码为空")]
    Empty,

    #[error("样品编码结构不符 '{code}': {message}")]
    Malformed { code: String, message: String },

    #[error("未注册的工厂代码 '{facility}' (编码 {code})")]
    UnknownFacility { code: String, facility: String },

    #[error("非法日历日期 '{date}' (编码 {code})")]
    InvalidDate { code: String, date: String },

    #[error("未注册的样品类别 '{category}' (编码 {code})")]
    UnknownCategory { code: String, category: String },
}

/// 行级拒绝原因（记录不满足实体不变量, 转为 record_rejected 告警）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("必填字段缺失: {field}")]
    MissingField { field: String },

    #[error("字段 {field} 无法识别: '{value}'")]
    UnrecognizedValue { field: String, value: String },

    #[error("字段 {field} 必须大于 0, 实际 {value}")]
    NonPositive { field: String, value: f64 },

    #[error("未注册的工厂: {0}")]
    UnregisteredFacility(String),

    #[error("未知的工作表: {0}")]
    UnknownSheet(String),

    #[error(transparent)]
    Format(#[from] NormalizeError),
}

/// 文件级导入错误
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv/.json）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
