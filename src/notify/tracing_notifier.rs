// ==========================================
// 金矿物流溯源系统 - 日志通知渠道
// ==========================================

use crate::domain::alert::StampedAlert;
use crate::domain::types::Severity;
use crate::notify::error::NotifyResult;
use crate::notify::notifier_trait::AlertNotifier;
use async_trait::async_trait;

/// 通过 tracing 输出告警（critical → error, warning → warn）
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl AlertNotifier for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn notify(&self, alerts: &[StampedAlert]) -> NotifyResult<usize> {
        for stamped in alerts {
            let alert = &stamped.alert;
            match alert.severity {
                Severity::Critical => tracing::error!(
                    alert_id = %stamped.alert_id,
                    rule = %alert.rule,
                    subject = %alert.subject,
                    "{}",
                    alert.message
                ),
                Severity::Warning => tracing::warn!(
                    alert_id = %stamped.alert_id,
                    rule = %alert.rule,
                    subject = %alert.subject,
                    "{}",
                    alert.message
                ),
            }
        }
        Ok(alerts.len())
    }
}
