// ==========================================
// 金矿物流溯源系统 - 规范化记录实体
// ==========================================
// 三条数据流: 卡车运输 (Shipment) / 料仓转运 (Transfer) / 化验 (Assay)
// 红线: 构造后不可变; 记录之间只通过 RecordId 关联, 不互相嵌套
// ==========================================

use crate::domain::calendar::JalaliDate;
use crate::domain::sample_code::SampleCodeDescriptor;
use crate::domain::types::{FacilityCode, RecordType, SampleCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// RecordId - 记录标识
// ==========================================
// 由数据流类型 + 来源位置组成, 同一输入多次运行结果一致
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn shipment(sheet_name: &str, row_number: usize) -> Self {
        Self(format!("shipment:{}:{}", sheet_name, row_number))
    }

    pub fn transfer(sheet_name: &str, row_number: usize) -> Self {
        Self(format!("transfer:{}:{}", sheet_name, row_number))
    }

    pub fn assay(sheet_name: &str, row_number: usize) -> Self {
        Self(format!("assay:{}:{}", sheet_name, row_number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 标识所属的数据流类型
    pub fn record_type(&self) -> Option<RecordType> {
        self.0.split(':').next().and_then(RecordType::parse)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ==========================================
// CanonicalName - 人员身份规范化结果
// ==========================================
// Unknown 是显式状态, 与字段缺失 (Option::None) 区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CanonicalName {
    Known {
        canonical: String,
        raw: String,
        status: String,
    },
    Unknown {
        raw: String,
    },
}

impl CanonicalName {
    pub fn is_known(&self) -> bool {
        matches!(self, CanonicalName::Known { .. })
    }

    /// 展示名（已知 → 规范名, 未知 → 原始写法）
    pub fn display_name(&self) -> &str {
        match self {
            CanonicalName::Known { canonical, .. } => canonical,
            CanonicalName::Unknown { raw } => raw,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            CanonicalName::Known { raw, .. } => raw,
            CanonicalName::Unknown { raw } => raw,
        }
    }
}

// ==========================================
// Concentration - 元素含量 (ppm)
// ==========================================
// 低于检出限是独立哨兵值, 绝不折算为 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Concentration {
    Measured { ppm: f64 },
    BelowDetectionLimit { limit_ppm: Option<f64> },
}

impl Concentration {
    pub fn measured(&self) -> Option<f64> {
        match self {
            Concentration::Measured { ppm } => Some(*ppm),
            Concentration::BelowDetectionLimit { .. } => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Concentration::Measured { .. })
    }
}

// ==========================================
// ShipmentRecord - 矿山 → 加工厂 卡车运输
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub record_id: RecordId,
    pub sheet_name: String,
    pub row_number: usize,
    /// 源表中的 "ردیف" 序号列（如有）
    pub source_row: Option<String>,
    pub date: JalaliDate,
    pub destination: FacilityCode,
    pub destination_text: String,
    pub net_weight_kg: f64,
    pub gross_weight_kg: Option<f64>,
    pub cost_per_ton_rial: Option<f64>,
    pub transport_cost_rial: Option<f64>,
    pub truck_number: Option<String>,
    pub receipt_number: Option<String>,
    pub driver: Option<CanonicalName>,
    pub notes: Option<String>,
}

// ==========================================
// TransferRecord - 加工厂料仓 → 下游处理点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub record_id: RecordId,
    pub sheet_name: String,
    pub row_number: usize,
    pub origin: FacilityCode,
    pub date: JalaliDate,
    pub weight_kg: f64,
    pub cumulative_weight_kg: Option<f64>,
    pub destination: String,
    pub driver: Option<CanonicalName>,
    pub transport_cost_rial: f64,
}

// ==========================================
// AssayRecord - 化验样品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleCodeStatus {
    Parsed { descriptor: SampleCodeDescriptor },
    Invalid { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayRecord {
    pub record_id: RecordId,
    pub sheet_name: String,
    pub row_number: usize,
    pub sample_code: String,
    pub code: SampleCodeStatus,
    /// 元素 → 含量（键为小写元素符号, 如 "au"）; 缺失即未报告
    pub analytes: BTreeMap<String, Concentration>,
}

impl AssayRecord {
    pub fn descriptor(&self) -> Option<&SampleCodeDescriptor> {
        match &self.code {
            SampleCodeStatus::Parsed { descriptor } => Some(descriptor),
            SampleCodeStatus::Invalid { .. } => None,
        }
    }

    pub fn category(&self) -> Option<SampleCategory> {
        self.descriptor().map(|d| d.category())
    }

    pub fn concentration(&self, analyte: &str) -> Option<&Concentration> {
        self.analytes.get(analyte)
    }
}

// ==========================================
// RecordSnapshot - 单次运行的完整规范化快照
// ==========================================
// 前置条件: 三条数据流必须同时完整到达后才能进入链路追溯
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub shipments: Vec<ShipmentRecord>,
    pub transfers: Vec<TransferRecord>,
    pub assays: Vec<AssayRecord>,
}

impl RecordSnapshot {
    pub fn shipment(&self, id: &RecordId) -> Option<&ShipmentRecord> {
        self.shipments.iter().find(|s| &s.record_id == id)
    }

    pub fn transfer(&self, id: &RecordId) -> Option<&TransferRecord> {
        self.transfers.iter().find(|t| &t.record_id == id)
    }

    pub fn assay(&self, id: &RecordId) -> Option<&AssayRecord> {
        self.assays.iter().find(|a| &a.record_id == id)
    }
}
