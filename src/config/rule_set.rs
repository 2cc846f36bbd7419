// ==========================================
// 金矿物流溯源系统 - 校验规则集加载
// ==========================================
// 来源: validation_rules.json, 以规则名为键
// 红线: 未知字段 / 未知记录类型 / 非数值阈值 → ConfigurationError,
//       绝不静默跳过规则
// ==========================================

use crate::config::error::{ConfigResult, ConfigurationError};
use crate::config::registries::{CategoryAlphabet, FacilityRegistry};
use crate::domain::alert::BUILTIN_RULES;
use crate::domain::rule::{Comparator, FieldKind, RuleApplicability, RuleField, ValidationRule};
use crate::domain::types::{FacilityCode, RecordType, SampleCategory, Severity};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// 规则的原始配置写法
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub record_type: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub facilities: Vec<String>,
    pub field: String,
    pub comparator: String,
    #[serde(default)]
    pub threshold: Option<Value>,
    #[serde(default)]
    pub low: Option<Value>,
    #[serde(default)]
    pub high: Option<Value>,
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub include_below_detection_limit: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// 规则编译时可引用的登记表
#[derive(Debug, Clone, Copy)]
pub struct RuleScope<'a> {
    pub analytes: &'a [String],
    pub facilities: &'a FacilityRegistry,
    pub categories: &'a CategoryAlphabet,
}

/// 编译后的规则集（按规则名排序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<ValidationRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        Self { rules }
    }

    /// 从配置文件加载
    pub fn load(path: &Path, scope: &RuleScope<'_>) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigurationError::MissingFile(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text, scope, &path.display().to_string())
    }

    pub fn from_json_str(json: &str, scope: &RuleScope<'_>, source: &str) -> ConfigResult<Self> {
        let definitions: BTreeMap<String, RuleDefinition> =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Json {
                path: source.to_string(),
                message: e.to_string(),
            })?;
        Self::from_definitions(definitions, scope)
    }

    pub fn from_definitions(
        definitions: BTreeMap<String, RuleDefinition>,
        scope: &RuleScope<'_>,
    ) -> ConfigResult<Self> {
        if let Some(name) = definitions.keys().find(|n| BUILTIN_RULES.contains(&n.as_str())) {
            return Err(ConfigurationError::ReservedRuleName(name.clone()));
        }

        let rules = definitions
            .into_iter()
            .map(|(name, def)| compile_rule(&name, &def, scope))
            .collect::<ConfigResult<Vec<_>>>()?;

        tracing::info!(rule_count = rules.len(), "校验规则集已加载");
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn for_record_type(&self, record_type: RecordType) -> impl Iterator<Item = &ValidationRule> {
        self.rules
            .iter()
            .filter(move |r| r.applicability.record_type == record_type)
    }

    pub fn get(&self, name: &str) -> Option<&ValidationRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ==========================================
// 单条规则编译
// ==========================================

fn compile_rule(name: &str, def: &RuleDefinition, scope: &RuleScope<'_>) -> ConfigResult<ValidationRule> {
    let record_type = RecordType::parse(&def.record_type.trim().to_lowercase()).ok_or_else(|| {
        ConfigurationError::UnknownRecordType {
            rule: name.to_string(),
            record_type: def.record_type.clone(),
        }
    })?;

    let field = RuleField::resolve(record_type, &def.field, scope.analytes).ok_or_else(|| {
        ConfigurationError::UnknownField {
            rule: name.to_string(),
            record_type: record_type.to_string(),
            field: def.field.clone(),
        }
    })?;

    if !def.categories.is_empty() && record_type != RecordType::Assay {
        return Err(ConfigurationError::CategoryFilterNotApplicable {
            rule: name.to_string(),
        });
    }

    let categories = def
        .categories
        .iter()
        .map(|code| {
            let category = SampleCategory::from_code(code.trim())
                .ok_or_else(|| ConfigurationError::UnknownCategory(code.clone()))?;
            if !scope.categories.contains(category) {
                return Err(ConfigurationError::UnregisteredCategory {
                    rule: name.to_string(),
                    code: code.clone(),
                });
            }
            Ok(category)
        })
        .collect::<ConfigResult<BTreeSet<_>>>()?;

    let facilities = def
        .facilities
        .iter()
        .map(|code| {
            let facility = FacilityCode::parse(code)
                .ok_or_else(|| ConfigurationError::UnknownFacility(code.clone()))?;
            if !scope.facilities.contains(facility) {
                return Err(ConfigurationError::UnregisteredFacility {
                    rule: name.to_string(),
                    code: code.clone(),
                });
            }
            Ok(facility)
        })
        .collect::<ConfigResult<BTreeSet<_>>>()?;

    let comparator = compile_comparator(name, def)?;

    let compatible = match comparator {
        Comparator::IsNull => true,
        Comparator::IsUnknown => field.kind() == FieldKind::Identity,
        _ => field.kind() == FieldKind::Numeric,
    };
    if !compatible {
        return Err(ConfigurationError::IncompatibleComparator {
            rule: name.to_string(),
            comparator: comparator.as_str().to_string(),
            field: def.field.clone(),
        });
    }

    let severity = Severity::parse(&def.severity.trim().to_lowercase()).ok_or_else(|| {
        ConfigurationError::InvalidSeverity {
            rule: name.to_string(),
            severity: def.severity.clone(),
        }
    })?;

    Ok(ValidationRule {
        name: name.to_string(),
        applicability: RuleApplicability {
            record_type,
            categories,
            facilities,
        },
        field_name: def.field.trim().to_string(),
        field,
        comparator,
        severity,
        message_template: def.message.clone(),
        include_below_detection_limit: def.include_below_detection_limit,
    })
}

fn compile_comparator(name: &str, def: &RuleDefinition) -> ConfigResult<Comparator> {
    let op = def.comparator.trim().to_lowercase();
    let comparator = match op.as_str() {
        "gt" | ">" => Comparator::GreaterThan {
            threshold: numeric(name, "threshold", def.threshold.as_ref())?,
            inclusive: false,
        },
        "gte" | ">=" => Comparator::GreaterThan {
            threshold: numeric(name, "threshold", def.threshold.as_ref())?,
            inclusive: true,
        },
        "lt" | "<" => Comparator::LessThan {
            threshold: numeric(name, "threshold", def.threshold.as_ref())?,
            inclusive: false,
        },
        "lte" | "<=" => Comparator::LessThan {
            threshold: numeric(name, "threshold", def.threshold.as_ref())?,
            inclusive: true,
        },
        "outside" | "between" => {
            let low = numeric(name, "low", def.low.as_ref())?;
            let high = numeric(name, "high", def.high.as_ref())?;
            if low > high {
                return Err(ConfigurationError::InvalidRange {
                    rule: name.to_string(),
                    low,
                    high,
                });
            }
            if op == "outside" {
                Comparator::Outside { low, high }
            } else {
                Comparator::Between { low, high }
            }
        }
        "is_null" => Comparator::IsNull,
        "is_unknown" => Comparator::IsUnknown,
        _ => {
            return Err(ConfigurationError::UnknownComparator {
                rule: name.to_string(),
                comparator: def.comparator.clone(),
            })
        }
    };
    Ok(comparator)
}

/// 阈值必须是 JSON 数值（字符串形式的数字同样视为配置错误）
fn numeric(rule: &str, key: &str, value: Option<&Value>) -> ConfigResult<f64> {
    let value = value.ok_or_else(|| ConfigurationError::MissingThreshold {
        rule: rule.to_string(),
        key: key.to_string(),
    })?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigurationError::NonNumericThreshold {
            rule: rule.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
}
