// ==========================================
// 金矿物流溯源系统 - 校验规则模型
// ==========================================
// 规则是外部配置数据, 加载时编译为带标签的变体,
// 由校验器中唯一的通用求值函数解释
// ==========================================

use crate::domain::types::{FacilityCode, RecordType, SampleCategory, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Text,
    Identity,
}

/// 规则可引用的记录字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "analyte", rename_all = "snake_case")]
pub enum RuleField {
    /// 运输净重 / 转运重量
    WeightKg,
    GrossWeightKg,
    CumulativeWeightKg,
    CostPerTon,
    TransportCost,
    ReceiptNumber,
    TruckNumber,
    Driver,
    /// 化验元素含量（小写元素符号）
    Concentration(String),
}

impl RuleField {
    /// 按记录类型解析字段名
    ///
    /// 化验字段写作 `<元素>_ppm`（如 `au_ppm`）, 元素必须已登记
    pub fn resolve(record_type: RecordType, name: &str, analytes: &[String]) -> Option<Self> {
        let name = name.trim().to_lowercase();
        match record_type {
            RecordType::Shipment => match name.as_str() {
                "net_weight_kg" | "tonnage_kg" => Some(RuleField::WeightKg),
                "gross_weight_kg" => Some(RuleField::GrossWeightKg),
                "cost_per_ton_rial" => Some(RuleField::CostPerTon),
                "transport_cost_rial" => Some(RuleField::TransportCost),
                "receipt_number" => Some(RuleField::ReceiptNumber),
                "truck_number" => Some(RuleField::TruckNumber),
                "driver" => Some(RuleField::Driver),
                _ => None,
            },
            RecordType::Transfer => match name.as_str() {
                "weight_kg" | "tonnage_kg" => Some(RuleField::WeightKg),
                "cumulative_weight_kg" => Some(RuleField::CumulativeWeightKg),
                "transport_cost_rial" => Some(RuleField::TransportCost),
                "driver" => Some(RuleField::Driver),
                _ => None,
            },
            RecordType::Assay => {
                let analyte = name.strip_suffix("_ppm").unwrap_or(&name);
                analytes
                    .iter()
                    .find(|a| a.eq_ignore_ascii_case(analyte))
                    .map(|a| RuleField::Concentration(a.to_lowercase()))
            }
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            RuleField::ReceiptNumber | RuleField::TruckNumber => FieldKind::Text,
            RuleField::Driver => FieldKind::Identity,
            _ => FieldKind::Numeric,
        }
    }
}

/// 比较方式
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Comparator {
    /// value > threshold（inclusive 时为 >=）
    GreaterThan { threshold: f64, inclusive: bool },
    /// value < threshold（inclusive 时为 <=）
    LessThan { threshold: f64, inclusive: bool },
    /// value 不在 [low, high] 内
    Outside { low: f64, high: f64 },
    /// low < value <= high（分级阈值的中间档）
    Between { low: f64, high: f64 },
    /// 字段缺失
    IsNull,
    /// 身份未登记（字段存在但未命中登记表）
    IsUnknown,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::GreaterThan { inclusive: false, .. } => "gt",
            Comparator::GreaterThan { inclusive: true, .. } => "gte",
            Comparator::LessThan { inclusive: false, .. } => "lt",
            Comparator::LessThan { inclusive: true, .. } => "lte",
            Comparator::Outside { .. } => "outside",
            Comparator::Between { .. } => "between",
            Comparator::IsNull => "is_null",
            Comparator::IsUnknown => "is_unknown",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Comparator::GreaterThan { .. }
                | Comparator::LessThan { .. }
                | Comparator::Outside { .. }
                | Comparator::Between { .. }
        )
    }

    /// 对已测得数值求值
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Comparator::GreaterThan { threshold, inclusive } => {
                if inclusive {
                    value >= threshold
                } else {
                    value > threshold
                }
            }
            Comparator::LessThan { threshold, inclusive } => {
                if inclusive {
                    value <= threshold
                } else {
                    value < threshold
                }
            }
            Comparator::Outside { low, high } => value < low || value > high,
            Comparator::Between { low, high } => value > low && value <= high,
            Comparator::IsNull | Comparator::IsUnknown => false,
        }
    }
}

/// 适用范围: 记录类型 + 可选的类别/工厂过滤（空集合表示不过滤）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApplicability {
    pub record_type: RecordType,
    #[serde(default)]
    pub categories: BTreeSet<SampleCategory>,
    #[serde(default)]
    pub facilities: BTreeSet<FacilityCode>,
}

impl RuleApplicability {
    pub fn for_type(record_type: RecordType) -> Self {
        Self {
            record_type,
            categories: BTreeSet::new(),
            facilities: BTreeSet::new(),
        }
    }

    pub fn with_categories(mut self, categories: &[SampleCategory]) -> Self {
        self.categories = categories.iter().copied().collect();
        self
    }

    pub fn accepts_category(&self, category: Option<SampleCategory>) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        category.map_or(false, |c| self.categories.contains(&c))
    }

    pub fn accepts_facility(&self, facility: Option<FacilityCode>) -> bool {
        if self.facilities.is_empty() {
            return true;
        }
        facility.map_or(false, |f| self.facilities.contains(&f))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub name: String,
    pub applicability: RuleApplicability,
    /// 配置中的字段写法（用于消息插值）
    pub field_name: String,
    pub field: RuleField,
    pub comparator: Comparator,
    pub severity: Severity,
    pub message_template: String,
    /// 低于检出限的样品是否参与 lt/lte 规则
    pub include_below_detection_limit: bool,
}
