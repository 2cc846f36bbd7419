// ==========================================
// 金矿物流溯源系统 - 链路追溯引擎
// ==========================================
// 职责: 化验样品 → 料仓转运 → 卡车运输 的确定性匹配
// 输入: 完整的规范化快照（三条数据流同时到达）
// 输出: LinkSet（按化验记录标识排序的 LinkResult）
// 红线: 不抛错; 缺链 / 歧义是结果状态; 输出与记录插入顺序无关
// ==========================================

use crate::config::settings::LinkerSettings;
use crate::domain::calendar::JalaliDate;
use crate::domain::link::{
    ChainLink, LinkResult, LinkStatus, TraceReport, REASON_AMBIGUOUS_SHIPMENT,
    REASON_AMBIGUOUS_TRANSFER, REASON_NO_SHIPMENT, REASON_NO_TRANSFER,
};
use crate::domain::records::{RecordId, RecordSnapshot, ShipmentRecord, TransferRecord};
use crate::domain::types::{FacilityCode, RecordType};
use std::collections::BTreeMap;

// ==========================================
// DatedIndex - (工厂, 日序) 分组索引
// ==========================================
// 分组内按记录标识排序, 与输入顺序无关
struct DatedIndex<'a, T> {
    groups: BTreeMap<(FacilityCode, i64), Vec<(&'a RecordId, &'a T)>>,
}

impl<'a, T> DatedIndex<'a, T> {
    fn build<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (FacilityCode, JalaliDate, &'a RecordId, &'a T)>,
    {
        let mut groups: BTreeMap<(FacilityCode, i64), Vec<(&'a RecordId, &'a T)>> = BTreeMap::new();
        for (facility, date, id, item) in items {
            groups.entry((facility, date.ordinal())).or_default().push((id, item));
        }
        for members in groups.values_mut() {
            members.sort_by(|a, b| a.0.cmp(b.0));
        }
        Self { groups }
    }

    /// 时间窗内日期差最小的全部候选
    ///
    /// 同日优先, 其次日期差最小; 同等最优的多个候选全部返回（已按标识排序）
    fn closest(&self, facility: FacilityCode, ordinal: i64, window_days: u32) -> Vec<(&'a RecordId, &'a T)> {
        let window = i64::from(window_days);
        let mut best: Option<i64> = None;
        let mut found: Vec<(&'a RecordId, &'a T)> = Vec::new();

        for ((_, day), members) in self
            .groups
            .range((facility, ordinal - window)..=(facility, ordinal + window))
        {
            let distance = (day - ordinal).abs();
            match best {
                Some(b) if distance > b => continue,
                Some(b) if distance == b => found.extend(members.iter().copied()),
                _ => {
                    best = Some(distance);
                    found = members.clone();
                }
            }
        }

        found.sort_by(|a, b| a.0.cmp(b.0));
        found
    }
}

// ==========================================
// LinkSet - 单次运行的追溯结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet {
    results: BTreeMap<RecordId, LinkResult>,
}

impl LinkSet {
    pub fn get(&self, assay_id: &RecordId) -> Option<&LinkResult> {
        self.results.get(assay_id)
    }

    /// 全部结果（按化验记录标识排序）
    pub fn results(&self) -> impl Iterator<Item = &LinkResult> {
        self.results.values()
    }

    /// 该样品的已确认来源运输记录
    pub fn shipments_for(&self, assay_id: &RecordId) -> Vec<&RecordId> {
        self.get(assay_id)
            .and_then(|r| r.shipment_id())
            .into_iter()
            .collect()
    }

    /// 该样品的已确认转运记录
    pub fn transfers_for(&self, assay_id: &RecordId) -> Vec<&RecordId> {
        self.get(assay_id)
            .and_then(|r| r.transfer_id())
            .into_iter()
            .collect()
    }

    pub fn with_status(&self, status: LinkStatus) -> impl Iterator<Item = &LinkResult> {
        self.results.values().filter(move |r| r.status == status)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 全量追溯统计
    pub fn report(&self) -> TraceReport {
        let total_samples = self.results.len();
        let count = |status| self.results.values().filter(|r| r.status == status).count();
        let resolved = count(LinkStatus::Resolved);
        let link_rate = if total_samples == 0 {
            0.0
        } else {
            resolved as f64 / total_samples as f64
        };

        TraceReport {
            total_samples,
            resolved,
            partial: count(LinkStatus::Partial),
            unresolved: count(LinkStatus::Unresolved),
            link_rate,
        }
    }
}

// ==========================================
// TraceLinker - 链路追溯引擎
// ==========================================
pub struct TraceLinker {
    settings: LinkerSettings,
}

impl TraceLinker {
    pub fn new(settings: LinkerSettings) -> Self {
        Self { settings }
    }

    /// 构建全部化验样品的追溯链
    ///
    /// 样品编码无效的化验记录不参与追溯（由编排器单独告警）
    pub fn link(&self, snapshot: &RecordSnapshot) -> LinkSet {
        let transfers: DatedIndex<'_, TransferRecord> = DatedIndex::build(
            snapshot
                .transfers
                .iter()
                .map(|t| (t.origin, t.date, &t.record_id, t)),
        );
        let shipments: DatedIndex<'_, ShipmentRecord> = DatedIndex::build(
            snapshot
                .shipments
                .iter()
                .map(|s| (s.destination, s.date, &s.record_id, s)),
        );

        let mut results = BTreeMap::new();
        for assay in &snapshot.assays {
            let Some(descriptor) = assay.descriptor() else {
                continue;
            };

            let result = self.link_one(
                assay.record_id.clone(),
                assay.sample_code.clone(),
                descriptor.facility(),
                descriptor.date(),
                &transfers,
                &shipments,
            );

            tracing::debug!(
                assay_id = %result.assay_id,
                status = %result.status,
                reason = ?result.reason,
                "样品追溯完成"
            );
            results.insert(result.assay_id.clone(), result);
        }

        let set = LinkSet { results };
        let report = set.report();
        tracing::info!(
            total = report.total_samples,
            resolved = report.resolved,
            partial = report.partial,
            unresolved = report.unresolved,
            "链路追溯完成"
        );
        set
    }

    fn link_one(
        &self,
        assay_id: RecordId,
        sample_code: String,
        facility: FacilityCode,
        date: JalaliDate,
        transfers: &DatedIndex<'_, TransferRecord>,
        shipments: &DatedIndex<'_, ShipmentRecord>,
    ) -> LinkResult {
        let mut result = LinkResult {
            assay_id,
            sample_code,
            status: LinkStatus::Unresolved,
            chain: Vec::new(),
            candidates: Vec::new(),
            reason: None,
        };

        // ===== 第一层: 样品 → 转运 =====
        let transfer_candidates =
            transfers.closest(facility, date.ordinal(), self.settings.transfer_window_days);
        let transfer = match transfer_candidates.as_slice() {
            [] => {
                result.reason = Some(REASON_NO_TRANSFER.to_string());
                return result;
            }
            [(_, only)] => *only,
            many => {
                result.status = LinkStatus::Partial;
                result.candidates = many.iter().map(|(id, _)| (*id).clone()).collect();
                result.reason = Some(REASON_AMBIGUOUS_TRANSFER.to_string());
                return result;
            }
        };

        result.chain.push(ChainLink {
            record_type: RecordType::Transfer,
            record_id: transfer.record_id.clone(),
            day_offset: date.days_until(&transfer.date),
        });

        // ===== 第二层: 转运 → 运输（运输目的地 = 转运来源工厂） =====
        let shipment_candidates = shipments.closest(
            transfer.origin,
            transfer.date.ordinal(),
            self.settings.shipment_window_days,
        );
        match shipment_candidates.as_slice() {
            [] => {
                result.status = LinkStatus::Partial;
                result.reason = Some(REASON_NO_SHIPMENT.to_string());
            }
            [(_, shipment)] => {
                result.status = LinkStatus::Resolved;
                result.chain.push(ChainLink {
                    record_type: RecordType::Shipment,
                    record_id: shipment.record_id.clone(),
                    day_offset: transfer.date.days_until(&shipment.date),
                });
            }
            many => {
                result.status = LinkStatus::Partial;
                result.candidates = many.iter().map(|(id, _)| (*id).clone()).collect();
                result.reason = Some(REASON_AMBIGUOUS_SHIPMENT.to_string());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> JalaliDate {
        JalaliDate::new(y, m, d).unwrap()
    }

    fn transfer(sheet: &str, row: usize, origin: FacilityCode, on: JalaliDate) -> TransferRecord {
        TransferRecord {
            record_id: RecordId::transfer(sheet, row),
            sheet_name: sheet.to_string(),
            row_number: row,
            origin,
            date: on,
            weight_kg: 10_000.0,
            cumulative_weight_kg: None,
            destination: "factory".to_string(),
            driver: None,
            transport_cost_rial: 32_000_000.0,
        }
    }

    #[test]
    fn test_closest_prefers_same_day_then_smallest_gap() {
        let t_same = transfer("A", 1, FacilityCode::A, date(1404, 10, 14));
        let t_prev = transfer("A", 2, FacilityCode::A, date(1404, 10, 13));
        let t_next = transfer("A", 3, FacilityCode::A, date(1404, 10, 16));
        let all = vec![t_next.clone(), t_prev.clone(), t_same.clone()];
        let index = DatedIndex::build(all.iter().map(|t| (t.origin, t.date, &t.record_id, t)));

        let target = date(1404, 10, 14).ordinal();
        let hits = index.closest(FacilityCode::A, target, 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, &t_same.record_id);

        let hits = index.closest(FacilityCode::A, date(1404, 10, 15).ordinal(), 3);
        // 10/14 与 10/16 距离相同 → 歧义
        assert_eq!(hits.len(), 2);

        assert!(index.closest(FacilityCode::B, target, 3).is_empty());
        assert!(index.closest(FacilityCode::A, date(1404, 10, 20).ordinal(), 2).is_empty());
    }

    #[test]
    fn test_window_crosses_month_boundary() {
        let t = transfer("A", 1, FacilityCode::A, date(1404, 6, 31));
        let all = vec![t];
        let index = DatedIndex::build(all.iter().map(|t| (t.origin, t.date, &t.record_id, t)));
        let hits = index.closest(FacilityCode::A, date(1404, 7, 1).ordinal(), 1);
        assert_eq!(hits.len(), 1);
    }
}
