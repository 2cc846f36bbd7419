// ==========================================
// 金矿物流溯源系统 - 告警实体
// ==========================================
// 告警身份 = (规则名, 主体记录标识), 用于单次运行内去重
// 对外交付前由聚合器补充稳定标识 (alert_id)
// ==========================================

use crate::domain::records::RecordId;
use crate::domain::types::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// 内置数据质量规则名
pub const RULE_INVALID_LABEL: &str = "invalid_label";
pub const RULE_RECORD_REJECTED: &str = "record_rejected";
pub const RULE_NO_TRACEABLE_SOURCE: &str = "no_traceable_source";
pub const RULE_INCOMPLETE_TRACE: &str = "incomplete_trace";

/// 内置规则名保留, 配置规则不得重名
pub const BUILTIN_RULES: [&str; 4] = [
    RULE_INVALID_LABEL,
    RULE_RECORD_REJECTED,
    RULE_NO_TRACEABLE_SOURCE,
    RULE_INCOMPLETE_TRACE,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub rule: String,
    pub severity: Severity,
    pub subject: RecordId,
    pub value: Option<f64>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// 去重键
    pub fn identity(&self) -> (&str, &RecordId) {
        (self.rule.as_str(), &self.subject)
    }
}

/// 带稳定标识的告警（交付给通知/存储协作方）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedAlert {
    pub alert_id: String,
    #[serde(flatten)]
    pub alert: Alert,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_rule: BTreeMap<String, usize>,
}

impl AlertSummary {
    pub fn from_alerts(alerts: &[StampedAlert]) -> Self {
        let mut summary = AlertSummary {
            total_alerts: alerts.len(),
            ..Default::default()
        };
        for stamped in alerts {
            *summary
                .by_level
                .entry(stamped.alert.severity.as_str().to_string())
                .or_insert(0) += 1;
            *summary
                .by_rule
                .entry(stamped.alert.rule.clone())
                .or_insert(0) += 1;
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_level.get(severity.as_str()).copied().unwrap_or(0)
    }
}
