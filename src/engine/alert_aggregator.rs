// ==========================================
// 金矿物流溯源系统 - 告警聚合器
// ==========================================
// 职责: 同一 (规则, 主体记录) 的告警合并为一条（保留首次出现的消息）,
//       赋予稳定标识, 按级别分组排序（critical 在前）
// 稳定标识: SHA-256(规则名 \0 主体标识 \0 运行时间戳)
// ==========================================

use crate::domain::alert::{Alert, AlertSummary, StampedAlert};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

pub struct AlertAggregator {
    run_timestamp: DateTime<Utc>,
}

impl AlertAggregator {
    pub fn new(run_timestamp: DateTime<Utc>) -> Self {
        Self { run_timestamp }
    }

    /// 去重 + 标识 + 排序
    ///
    /// 同级别内保持首次出现的相对顺序（稳定排序）
    pub fn aggregate(&self, alerts: Vec<Alert>) -> Vec<StampedAlert> {
        let total = alerts.len();
        let mut seen = HashSet::new();
        let mut stamped: Vec<StampedAlert> = Vec::with_capacity(total);

        for alert in alerts {
            let (rule, subject) = alert.identity();
            if !seen.insert((rule.to_string(), subject.clone())) {
                continue;
            }
            stamped.push(StampedAlert {
                alert_id: self.alert_id(&alert),
                alert,
            });
        }

        stamped.sort_by_key(|s| s.alert.severity);

        tracing::info!(
            received = total,
            kept = stamped.len(),
            collapsed = total - stamped.len(),
            "告警聚合完成"
        );
        stamped
    }

    pub fn alert_id(&self, alert: &Alert) -> String {
        stable_alert_id(&alert.rule, alert.subject.as_str(), self.run_timestamp)
    }

    pub fn summarize(&self, alerts: &[StampedAlert]) -> AlertSummary {
        AlertSummary::from_alerts(alerts)
    }
}

/// 告警稳定标识（十六进制 SHA-256）
pub fn stable_alert_id(rule: &str, subject: &str, run_timestamp: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule.as_bytes());
    hasher.update([0u8]);
    hasher.update(subject.as_bytes());
    hasher.update([0u8]);
    hasher.update(
        run_timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .as_bytes(),
    );
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::RecordId;
    use crate::domain::types::Severity;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 4, 8, 0, 0).unwrap()
    }

    fn alert(rule: &str, subject: &str, severity: Severity, message: &str) -> Alert {
        Alert {
            rule: rule.to_string(),
            severity,
            subject: RecordId::from(subject),
            value: None,
            message: message.to_string(),
            timestamp: ts(),
        }
    }

    #[test]
    fn test_duplicates_collapse_keeping_first_message() {
        let aggregator = AlertAggregator::new(ts());
        let out = aggregator.aggregate(vec![
            alert("r1", "assay:S:1", Severity::Warning, "first"),
            alert("r1", "assay:S:1", Severity::Warning, "second"),
            alert("r1", "assay:S:2", Severity::Warning, "other subject"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].alert.message, "first");
    }

    #[test]
    fn test_critical_first_stable_within_level() {
        let aggregator = AlertAggregator::new(ts());
        let out = aggregator.aggregate(vec![
            alert("w1", "a", Severity::Warning, ""),
            alert("c1", "a", Severity::Critical, ""),
            alert("w2", "a", Severity::Warning, ""),
            alert("c2", "a", Severity::Critical, ""),
        ]);
        let rules: Vec<&str> = out.iter().map(|s| s.alert.rule.as_str()).collect();
        assert_eq!(rules, vec!["c1", "c2", "w1", "w2"]);
    }

    #[test]
    fn test_alert_id_is_stable_and_run_scoped() {
        let a = stable_alert_id("tailings_loss", "assay:S:1", ts());
        let b = stable_alert_id("tailings_loss", "assay:S:1", ts());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let later = stable_alert_id("tailings_loss", "assay:S:1", ts() + chrono::Duration::seconds(1));
        assert_ne!(a, later);
        assert_ne!(a, stable_alert_id("tailings_loss", "assay:S:2", ts()));
    }
}
