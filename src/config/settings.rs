// ==========================================
// 金矿物流溯源系统 - 运行参数
// ==========================================
// 来源: settings.json（可选）+ 环境变量覆写
// ==========================================

use serde::{Deserialize, Serialize};

/// 料仓转运单价默认值（里亚尔/吨）
pub const DEFAULT_BUNKER_COST_PER_TON_RIAL: f64 = 3_200_000.0;

/// 链路匹配时间窗（天, 对称 ±N）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerSettings {
    /// 样品 → 转运
    pub transfer_window_days: u32,
    /// 转运 → 运输
    pub shipment_window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// 转运目的地（加工厂名称）
    pub plant_name: String,
    pub bunker_cost_per_ton_rial: f64,
    /// 登记的化验元素（小写符号）
    pub analytes: Vec<String>,
    pub linker: LinkerSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            plant_name: "factory".to_string(),
            bunker_cost_per_ton_rial: DEFAULT_BUNKER_COST_PER_TON_RIAL,
            analytes: vec!["au".to_string()],
            linker: LinkerSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn has_analyte(&self, analyte: &str) -> bool {
        self.analytes.iter().any(|a| a.eq_ignore_ascii_case(analyte))
    }
}
