// ==========================================
// 金矿物流溯源系统 - 规则校验引擎
// ==========================================
// 职责: 将外部配置的规则集应用到规范化记录, 产出告警
// 红线: 不硬编码阈值; 所有规则由同一个通用求值函数解释
//       低于检出限的含量不参与 gt/outside, 仅在显式声明时参与 lt
// ==========================================

use crate::config::rule_set::RuleSet;
use crate::domain::alert::Alert;
use crate::domain::calendar::JalaliDate;
use crate::domain::records::{
    AssayRecord, CanonicalName, Concentration, RecordId, RecordSnapshot, ShipmentRecord,
    TransferRecord,
};
use crate::domain::rule::{Comparator, RuleField, ValidationRule};
use crate::domain::types::{FacilityCode, RecordType, SampleCategory};
use chrono::{DateTime, Utc};

/// 字段取值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'r> {
    Missing,
    Number(f64),
    Text(&'r str),
    Identity(&'r CanonicalName),
    Concentration(Concentration),
}

/// 规则求值对象
#[derive(Debug, Clone, Copy)]
pub enum Subject<'r> {
    Shipment(&'r ShipmentRecord),
    Transfer(&'r TransferRecord),
    Assay(&'r AssayRecord),
}

impl<'r> Subject<'r> {
    pub fn record_id(&self) -> &'r RecordId {
        match *self {
            Subject::Shipment(s) => &s.record_id,
            Subject::Transfer(t) => &t.record_id,
            Subject::Assay(a) => &a.record_id,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match *self {
            Subject::Shipment(_) => RecordType::Shipment,
            Subject::Transfer(_) => RecordType::Transfer,
            Subject::Assay(_) => RecordType::Assay,
        }
    }

    pub fn category(&self) -> Option<SampleCategory> {
        match *self {
            Subject::Assay(a) => a.category(),
            _ => None,
        }
    }

    /// 运输 → 目的地工厂; 转运 → 来源工厂; 化验 → 编码中的工厂
    pub fn facility(&self) -> Option<FacilityCode> {
        match *self {
            Subject::Shipment(s) => Some(s.destination),
            Subject::Transfer(t) => Some(t.origin),
            Subject::Assay(a) => a.descriptor().map(|d| d.facility()),
        }
    }

    pub fn date(&self) -> Option<JalaliDate> {
        match *self {
            Subject::Shipment(s) => Some(s.date),
            Subject::Transfer(t) => Some(t.date),
            Subject::Assay(a) => a.descriptor().map(|d| d.date()),
        }
    }

    pub fn sample_code(&self) -> Option<&'r str> {
        match *self {
            Subject::Assay(a) => Some(a.sample_code.as_str()),
            _ => None,
        }
    }

    pub fn field(&self, field: &RuleField) -> FieldValue<'r> {
        let number = |v: Option<f64>| v.map_or(FieldValue::Missing, FieldValue::Number);
        let text = |v: Option<&'r String>| v.map_or(FieldValue::Missing, |s| FieldValue::Text(s.as_str()));
        let identity =
            |v: Option<&'r CanonicalName>| v.map_or(FieldValue::Missing, FieldValue::Identity);

        match (*self, field) {
            (Subject::Shipment(s), RuleField::WeightKg) => FieldValue::Number(s.net_weight_kg),
            (Subject::Shipment(s), RuleField::GrossWeightKg) => number(s.gross_weight_kg),
            (Subject::Shipment(s), RuleField::CostPerTon) => number(s.cost_per_ton_rial),
            (Subject::Shipment(s), RuleField::TransportCost) => number(s.transport_cost_rial),
            (Subject::Shipment(s), RuleField::ReceiptNumber) => text(s.receipt_number.as_ref()),
            (Subject::Shipment(s), RuleField::TruckNumber) => text(s.truck_number.as_ref()),
            (Subject::Shipment(s), RuleField::Driver) => identity(s.driver.as_ref()),
            (Subject::Transfer(t), RuleField::WeightKg) => FieldValue::Number(t.weight_kg),
            (Subject::Transfer(t), RuleField::CumulativeWeightKg) => number(t.cumulative_weight_kg),
            (Subject::Transfer(t), RuleField::TransportCost) => {
                FieldValue::Number(t.transport_cost_rial)
            }
            (Subject::Transfer(t), RuleField::Driver) => identity(t.driver.as_ref()),
            (Subject::Assay(a), RuleField::Concentration(analyte)) => a
                .concentration(analyte)
                .map_or(FieldValue::Missing, |c| FieldValue::Concentration(*c)),
            _ => FieldValue::Missing,
        }
    }
}

/// 比较结果: 是否触发 + 用于展示的数值
#[derive(Debug, Clone, Copy, PartialEq)]
struct Outcome {
    value: Option<f64>,
    below_detection_limit: bool,
}

// ==========================================
// Validator - 规则校验引擎
// ==========================================
pub struct Validator<'a> {
    rules: &'a RuleSet,
    run_timestamp: DateTime<Utc>,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a RuleSet, run_timestamp: DateTime<Utc>) -> Self {
        Self {
            rules,
            run_timestamp,
        }
    }

    /// 校验整个快照
    ///
    /// 输出顺序: 运输 → 转运 → 化验; 同一记录内按规则名
    pub fn validate(&self, snapshot: &RecordSnapshot) -> Vec<Alert> {
        let subjects = snapshot
            .shipments
            .iter()
            .map(Subject::Shipment)
            .chain(snapshot.transfers.iter().map(Subject::Transfer))
            .chain(snapshot.assays.iter().map(Subject::Assay));

        let mut alerts = Vec::new();
        for subject in subjects {
            alerts.extend(self.validate_subject(subject));
        }

        tracing::info!(
            rules = self.rules.len(),
            alerts = alerts.len(),
            "规则校验完成"
        );
        alerts
    }

    pub fn validate_subject(&self, subject: Subject<'_>) -> Vec<Alert> {
        self.rules
            .for_record_type(subject.record_type())
            .filter_map(|rule| self.evaluate(rule, subject))
            .collect()
    }

    /// 通用求值: 适用范围 → 取值 → 比较 → 告警
    pub fn evaluate(&self, rule: &ValidationRule, subject: Subject<'_>) -> Option<Alert> {
        let applicability = &rule.applicability;
        if applicability.record_type != subject.record_type()
            || !applicability.accepts_category(subject.category())
            || !applicability.accepts_facility(subject.facility())
        {
            return None;
        }

        let outcome = compare(rule, subject.field(&rule.field))?;
        let message = render_message(rule, &subject, &outcome);

        Some(Alert {
            rule: rule.name.clone(),
            severity: rule.severity,
            subject: subject.record_id().clone(),
            value: outcome.value,
            message,
            timestamp: self.run_timestamp,
        })
    }
}

fn compare(rule: &ValidationRule, value: FieldValue<'_>) -> Option<Outcome> {
    let fired = |v: f64| Outcome {
        value: Some(v),
        below_detection_limit: false,
    };

    match (rule.comparator, value) {
        (Comparator::IsNull, FieldValue::Missing) => Some(Outcome {
            value: None,
            below_detection_limit: false,
        }),
        (Comparator::IsUnknown, FieldValue::Identity(CanonicalName::Unknown { .. })) => {
            Some(Outcome {
                value: None,
                below_detection_limit: false,
            })
        }
        (cmp, FieldValue::Number(v)) if cmp.holds(v) => Some(fired(v)),
        (cmp, FieldValue::Concentration(Concentration::Measured { ppm })) if cmp.holds(ppm) => {
            Some(fired(ppm))
        }
        (
            Comparator::LessThan { threshold, .. },
            FieldValue::Concentration(Concentration::BelowDetectionLimit { limit_ppm }),
        ) if rule.include_below_detection_limit => {
            // 真实值 < 检出限; 检出限未知或不高于阈值时必然低于阈值
            match limit_ppm {
                None => Some(Outcome {
                    value: None,
                    below_detection_limit: true,
                }),
                Some(limit) if limit <= threshold => Some(Outcome {
                    value: Some(limit),
                    below_detection_limit: true,
                }),
                Some(_) => None,
            }
        }
        _ => None,
    }
}

/// 消息模板插值
///
/// 占位符: {rule} {record_id} {field} {value} {threshold} {low} {high}
///         {sample_code} {date} {facility} {driver}
fn render_message(rule: &ValidationRule, subject: &Subject<'_>, outcome: &Outcome) -> String {
    let (threshold, low, high) = match rule.comparator {
        Comparator::GreaterThan { threshold, .. } | Comparator::LessThan { threshold, .. } => {
            (format_number(threshold), String::new(), String::new())
        }
        Comparator::Outside { low, high } | Comparator::Between { low, high } => {
            (String::new(), format_number(low), format_number(high))
        }
        Comparator::IsNull | Comparator::IsUnknown => (String::new(), String::new(), String::new()),
    };

    let driver = match subject.field(&RuleField::Driver) {
        FieldValue::Identity(name) => name.display_name().to_string(),
        _ => String::new(),
    };

    let replacements = [
        ("{rule}", rule.name.clone()),
        ("{record_id}", subject.record_id().to_string()),
        ("{field}", rule.field_name.clone()),
        ("{value}", outcome.display()),
        ("{threshold}", threshold),
        ("{low}", low),
        ("{high}", high),
        ("{sample_code}", subject.sample_code().unwrap_or_default().to_string()),
        ("{date}", subject.date().map(|d| d.to_string()).unwrap_or_default()),
        ("{facility}", subject.facility().map(|f| f.to_string()).unwrap_or_default()),
        ("{driver}", driver),
    ];

    replacements
        .iter()
        .fold(rule.message_template.clone(), |message, (key, value)| {
            message.replace(key, value)
        })
}

impl Outcome {
    /// 告警数值的展示形式
    fn display(&self) -> String {
        match (self.value, self.below_detection_limit) {
            (Some(v), true) => format!("<{}", format_number(v)),
            (None, true) => "<DL".to_string(),
            (Some(v), false) => format_number(v),
            (None, false) => "-".to_string(),
        }
    }
}

/// 数值展示: 整数不带小数, 其余保留原始精度
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::RuleApplicability;
    use crate::domain::types::Severity;

    fn rule(name: &str, applicability: RuleApplicability, field: RuleField, comparator: Comparator) -> ValidationRule {
        ValidationRule {
            name: name.to_string(),
            applicability,
            field_name: "au_ppm".to_string(),
            field,
            comparator,
            severity: Severity::Warning,
            message_template: "{rule}: {value} vs {threshold}".to_string(),
            include_below_detection_limit: false,
        }
    }

    #[test]
    fn test_compare_below_detection_limit_excluded_from_gt() {
        let gt = rule(
            "r",
            RuleApplicability::for_type(RecordType::Assay),
            RuleField::Concentration("au".to_string()),
            Comparator::GreaterThan {
                threshold: 0.01,
                inclusive: false,
            },
        );
        let bdl = FieldValue::Concentration(Concentration::BelowDetectionLimit {
            limit_ppm: Some(0.05),
        });
        assert_eq!(compare(&gt, bdl), None);
    }

    #[test]
    fn test_compare_below_detection_limit_lt_opt_in() {
        let mut lt = rule(
            "r",
            RuleApplicability::for_type(RecordType::Assay),
            RuleField::Concentration("au".to_string()),
            Comparator::LessThan {
                threshold: 200.0,
                inclusive: false,
            },
        );
        let bdl = FieldValue::Concentration(Concentration::BelowDetectionLimit {
            limit_ppm: Some(0.05),
        });
        assert_eq!(compare(&lt, bdl), None);

        lt.include_below_detection_limit = true;
        let outcome = compare(&lt, bdl).unwrap();
        assert_eq!(outcome.value, Some(0.05));
        assert_eq!(outcome.display(), "<0.05");

        // 检出限高于阈值时无法判断, 不触发
        let high_limit = FieldValue::Concentration(Concentration::BelowDetectionLimit {
            limit_ppm: Some(500.0),
        });
        assert_eq!(compare(&lt, high_limit), None);
    }

    #[test]
    fn test_is_unknown_ignores_missing() {
        let r = rule(
            "unknown_driver",
            RuleApplicability::for_type(RecordType::Shipment),
            RuleField::Driver,
            Comparator::IsUnknown,
        );
        assert_eq!(compare(&r, FieldValue::Missing), None);

        let unknown = CanonicalName::Unknown {
            raw: "x".to_string(),
        };
        assert!(compare(&r, FieldValue::Identity(&unknown)).is_some());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(6.2), "6.2");
        assert_eq!(format_number(40000.0), "40000");
    }
}
