// ==========================================
// 金矿物流溯源系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、类型
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod alert;
pub mod calendar;
pub mod link;
pub mod records;
pub mod rule;
pub mod sample_code;
pub mod types;

// 重导出核心类型
pub use alert::{Alert, AlertSummary, StampedAlert};
pub use calendar::JalaliDate;
pub use link::{ChainLink, LinkResult, LinkStatus, TraceReport};
pub use records::{
    AssayRecord, CanonicalName, Concentration, RecordId, RecordSnapshot, SampleCodeStatus,
    ShipmentRecord, TransferRecord,
};
pub use rule::{Comparator, FieldKind, RuleApplicability, RuleField, ValidationRule};
pub use sample_code::SampleCodeDescriptor;
pub use types::{FacilityCode, RecordType, SampleCategory, Severity};
