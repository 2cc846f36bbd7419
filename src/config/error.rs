// ==========================================
// 金矿物流溯源系统 - 配置错误类型
// ==========================================
// 红线: 配置错误对整次运行是致命的, 在处理任何记录之前中止
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("配置文件缺失: {0}")]
    MissingFile(String),

    #[error("配置文件读取失败 {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("配置文件 JSON 格式错误 {path}: {message}")]
    Json { path: String, message: String },

    #[error("未知的工厂代码: {0}")]
    UnknownFacility(String),

    #[error("未知的样品类别代码: {0}")]
    UnknownCategory(String),

    #[error("工厂登记表为空")]
    EmptyFacilityRegistry,

    #[error("人员别名冲突: '{variant}' 同时指向 '{first}' 与 '{second}'")]
    AmbiguousAlias {
        variant: String,
        first: String,
        second: String,
    },

    #[error("规则 {rule}: 未知的记录类型 '{record_type}'")]
    UnknownRecordType { rule: String, record_type: String },

    #[error("规则 {rule}: 记录类型 {record_type} 没有字段 '{field}'")]
    UnknownField {
        rule: String,
        record_type: String,
        field: String,
    },

    #[error("规则 {rule}: 未知的比较符 '{comparator}'")]
    UnknownComparator { rule: String, comparator: String },

    #[error("规则 {rule}: 比较符 {comparator} 不适用于字段 '{field}'")]
    IncompatibleComparator {
        rule: String,
        comparator: String,
        field: String,
    },

    #[error("规则 {rule}: 缺少阈值 '{key}'")]
    MissingThreshold { rule: String, key: String },

    #[error("规则 {rule}: 阈值 '{key}' 不是数值: {value}")]
    NonNumericThreshold {
        rule: String,
        key: String,
        value: String,
    },

    #[error("规则 {rule}: 区间下限 {low} 大于上限 {high}")]
    InvalidRange { rule: String, low: f64, high: f64 },

    #[error("规则 {rule}: 未知的告警级别 '{severity}'")]
    InvalidSeverity { rule: String, severity: String },

    #[error("规则 {rule}: 工厂 '{code}' 未在登记表中")]
    UnregisteredFacility { rule: String, code: String },

    #[error("规则 {rule}: 样品类别 '{code}' 未在登记表中")]
    UnregisteredCategory { rule: String, code: String },

    #[error("规则名 '{0}' 与内置数据质量规则重名")]
    ReservedRuleName(String),

    #[error("规则 {rule}: 类别过滤只适用于化验记录")]
    CategoryFilterNotApplicable { rule: String },

    #[error("正则表达式编译失败 '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("环境变量 {key} 取值非法: '{value}'")]
    InvalidEnv { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
