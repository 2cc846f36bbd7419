// ==========================================
// 金矿物流溯源系统 - 链路追溯结果
// ==========================================
// 化验样品 → 料仓转运 → 卡车运输
// 红线: 链路缺失是一等结果状态 (partial / unresolved), 不是错误
// ==========================================

use crate::domain::records::RecordId;
use crate::domain::types::RecordType;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REASON_NO_TRANSFER: &str = "no transfer in window";
pub const REASON_AMBIGUOUS_TRANSFER: &str = "ambiguous transfer match";
pub const REASON_NO_SHIPMENT: &str = "no shipment in window";
pub const REASON_AMBIGUOUS_SHIPMENT: &str = "ambiguous shipment match";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Resolved,
    Partial,
    Unresolved,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Resolved => "resolved",
            LinkStatus::Partial => "partial",
            LinkStatus::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 链路中的一环（仅保存标识, 不嵌入记录）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub record_type: RecordType,
    pub record_id: RecordId,
    /// 该环节日期相对下游环节日期的偏移天数
    pub day_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResult {
    pub assay_id: RecordId,
    pub sample_code: String,
    pub status: LinkStatus,
    /// 有序链路: [转运, 运输]
    pub chain: Vec<ChainLink>,
    /// 未能唯一匹配时, 同等最优的候选记录（已排序）
    pub candidates: Vec<RecordId>,
    pub reason: Option<String>,
}

impl LinkResult {
    pub fn transfer_id(&self) -> Option<&RecordId> {
        self.chain
            .iter()
            .find(|l| l.record_type == RecordType::Transfer)
            .map(|l| &l.record_id)
    }

    pub fn shipment_id(&self) -> Option<&RecordId> {
        self.chain
            .iter()
            .find(|l| l.record_type == RecordType::Shipment)
            .map(|l| &l.record_id)
    }
}

/// 全量运行的追溯统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    pub total_samples: usize,
    pub resolved: usize,
    pub partial: usize,
    pub unresolved: usize,
    pub link_rate: f64,
}
