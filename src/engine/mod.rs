// ==========================================
// 金矿物流溯源系统 - 引擎层
// ==========================================
// 职责: 链路追溯、规则校验、告警聚合、运行编排
// 红线: 引擎不做 I/O; 所有告警必须携带原因
// ==========================================

pub mod alert_aggregator;
pub mod linker;
pub mod pipeline;
pub mod statistics;
pub mod validator;

// 重导出核心引擎
pub use alert_aggregator::{stable_alert_id, AlertAggregator};
pub use linker::{LinkSet, TraceLinker};
pub use pipeline::{RunInputs, RunOutput, TraceRun};
pub use statistics::{CategoryStatistics, DestinationStatistics, RunSummary};
pub use validator::{FieldValue, Subject, Validator};
