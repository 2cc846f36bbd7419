// ==========================================
// 金矿物流溯源系统 - 运行统计
// ==========================================
// 化验: 按类别统计检出率与 Au 均值/极值
// 运输: 按目的地工厂统计车次、吨位、运费
// ==========================================

use crate::domain::alert::AlertSummary;
use crate::domain::link::TraceReport;
use crate::domain::records::{AssayRecord, ShipmentRecord, TransferRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStatistics {
    pub count: usize,
    pub detected: usize,
    pub detection_rate: f64,
    pub avg_ppm: Option<f64>,
    pub min_ppm: Option<f64>,
    pub max_ppm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationStatistics {
    pub shipment_count: usize,
    pub total_weight_kg: f64,
    pub total_cost_rial: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub shipments: usize,
    pub transfers: usize,
    pub assays: usize,
    pub invalid_sample_codes: usize,
    pub rejected_rows: usize,
    pub skipped_summary_rows: usize,
    /// 类别代码 → 统计（编码无效的样品归入 "invalid"）
    pub assays_by_category: BTreeMap<String, CategoryStatistics>,
    /// 工厂代码 → 统计
    pub shipments_by_destination: BTreeMap<String, DestinationStatistics>,
    pub transfer_weight_kg: f64,
    pub trace: TraceReport,
    pub alerts: AlertSummary,
}

/// 化验统计（指定元素）
pub fn assay_statistics(assays: &[AssayRecord], analyte: &str) -> BTreeMap<String, CategoryStatistics> {
    let mut grouped: BTreeMap<String, Vec<&AssayRecord>> = BTreeMap::new();
    for assay in assays {
        let key = assay
            .category()
            .map(|c| c.code().to_string())
            .unwrap_or_else(|| "invalid".to_string());
        grouped.entry(key).or_default().push(assay);
    }

    grouped
        .into_iter()
        .map(|(category, samples)| {
            let measured: Vec<f64> = samples
                .iter()
                .filter_map(|a| a.concentration(analyte).and_then(|c| c.measured()))
                .collect();
            let count = samples.len();
            let detected = measured.len();

            let stats = CategoryStatistics {
                count,
                detected,
                detection_rate: if count == 0 {
                    0.0
                } else {
                    detected as f64 / count as f64
                },
                avg_ppm: if detected == 0 {
                    None
                } else {
                    Some(measured.iter().sum::<f64>() / detected as f64)
                },
                min_ppm: measured.iter().copied().reduce(f64::min),
                max_ppm: measured.iter().copied().reduce(f64::max),
            };
            (category, stats)
        })
        .collect()
}

/// 运输统计（按目的地工厂）
pub fn shipment_statistics(shipments: &[ShipmentRecord]) -> BTreeMap<String, DestinationStatistics> {
    let mut by_destination: BTreeMap<String, DestinationStatistics> = BTreeMap::new();
    for shipment in shipments {
        let entry = by_destination
            .entry(shipment.destination.to_string())
            .or_default();
        entry.shipment_count += 1;
        entry.total_weight_kg += shipment.net_weight_kg;
        entry.total_cost_rial += shipment.transport_cost_rial.unwrap_or(0.0);
    }
    by_destination
}

pub fn transfer_weight(transfers: &[TransferRecord]) -> f64 {
    transfers.iter().map(|t| t.weight_kg).sum()
}
