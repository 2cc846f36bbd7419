// ==========================================
// 金矿物流溯源系统 - 核心库
// ==========================================
// 数据流: 原始记录 → 规范化 → 样品编码解析 → 链路追溯
//         → 规则校验 → 告警聚合 → 通知/存储
// 技术栈: Rust + SQLite
// 系统定位: 单次全量批处理（每次运行完整替换派生数据）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 原始行 → 规范化记录
pub mod importer;

// 引擎层 - 链路追溯 / 规则校验 / 告警聚合
pub mod engine;

// 配置层 - 外部配置加载（失败即中止）
pub mod config;

// 通知层 - 告警投递
pub mod notify;

// 数据仓储层 - 运行结果持久化
pub mod repository;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    Alert, AssayRecord, CanonicalName, Concentration, FacilityCode, JalaliDate, LinkResult,
    LinkStatus, RecordId, RecordSnapshot, RecordType, SampleCategory, SampleCodeDescriptor,
    Severity, ShipmentRecord, StampedAlert, TransferRecord, ValidationRule,
};

// 配置
pub use config::{ConfigLoader, ConfigurationError, EngineConfig, RuleSet};

// 导入
pub use importer::{Normalizer, SampleCodeError, SampleCodeParser};

// 引擎
pub use engine::{AlertAggregator, LinkSet, RunInputs, RunOutput, TraceLinker, TraceRun, Validator};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "金矿物流溯源系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
