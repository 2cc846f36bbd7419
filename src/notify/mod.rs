// ==========================================
// 金矿物流溯源系统 - 通知层
// ==========================================
// 职责: 把聚合后的告警交付给外部渠道
// ==========================================

pub mod error;
pub mod hub;
pub mod json_lines;
pub mod notifier_trait;
pub mod tracing_notifier;

pub use error::{NotifyError, NotifyResult};
pub use hub::{DeliveryReport, NotifierHub};
pub use json_lines::{AlertLogEntry, JsonLinesNotifier};
pub use notifier_trait::AlertNotifier;
pub use tracing_notifier::TracingNotifier;
