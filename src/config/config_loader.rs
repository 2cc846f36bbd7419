// ==========================================
// 金矿物流溯源系统 - 配置加载器
// ==========================================
// 职责: 从配置目录一次性加载全部外部配置, 支持环境变量覆写
// 文件: facilities.json / drivers.json / sample_types.json /
//       validation_rules.json（必需）/ settings.json（可选）
// ==========================================

use crate::config::error::{ConfigResult, ConfigurationError};
use crate::config::registries::{
    CategoryAlphabet, DriversFile, FacilityInfo, FacilityRegistry, IdentityRegistry,
};
use crate::config::rule_set::{RuleScope, RuleSet};
use crate::config::settings::EngineSettings;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ==========================================
// 配置文件名与环境变量
// ==========================================
pub mod config_files {
    pub const FACILITIES: &str = "facilities.json";
    pub const DRIVERS: &str = "drivers.json";
    pub const SAMPLE_TYPES: &str = "sample_types.json";
    pub const VALIDATION_RULES: &str = "validation_rules.json";
    pub const SETTINGS: &str = "settings.json";
}

pub mod env_keys {
    pub const CONFIG_DIR: &str = "ORE_TRACE_CONFIG_DIR";
    pub const DB_PATH: &str = "ORE_TRACE_DB_PATH";
    pub const TRANSFER_WINDOW_DAYS: &str = "ORE_TRACE_TRANSFER_WINDOW_DAYS";
    pub const SHIPMENT_WINDOW_DAYS: &str = "ORE_TRACE_SHIPMENT_WINDOW_DAYS";
}

/// 单次运行所需的全部只读配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub facilities: FacilityRegistry,
    pub categories: CategoryAlphabet,
    pub identities: IdentityRegistry,
    pub rules: RuleSet,
    pub settings: EngineSettings,
}

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// 加载全部配置（任何错误都是致命的）
    pub fn load(&self) -> ConfigResult<EngineConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// 加载全部配置, 环境变量通过 lookup 读取
    pub fn load_with_env<F>(&self, lookup: F) -> ConfigResult<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        tracing::info!(config_dir = %self.config_dir.display(), "加载配置目录");

        let mut settings: EngineSettings = self
            .read_optional(config_files::SETTINGS)?
            .unwrap_or_default();
        apply_env_overrides(&mut settings, lookup)?;

        let facilities_raw: BTreeMap<String, FacilityInfo> =
            self.read_required(config_files::FACILITIES)?;
        let facilities = FacilityRegistry::from_map(facilities_raw)?;

        let categories = match self.read_optional::<BTreeMap<String, String>>(config_files::SAMPLE_TYPES)? {
            Some(raw) => CategoryAlphabet::from_map(raw)?,
            None => CategoryAlphabet::all(),
        };

        let drivers: DriversFile = self
            .read_optional(config_files::DRIVERS)?
            .unwrap_or_default();
        let identities = IdentityRegistry::from_file(drivers)?;

        let rules = RuleSet::load(
            &self.config_dir.join(config_files::VALIDATION_RULES),
            &RuleScope {
                analytes: &settings.analytes,
                facilities: &facilities,
                categories: &categories,
            },
        )?;

        tracing::info!(
            facilities = facilities.codes().count(),
            drivers = identities.len(),
            rules = rules.len(),
            transfer_window_days = settings.linker.transfer_window_days,
            shipment_window_days = settings.linker.shipment_window_days,
            "配置加载完成"
        );

        Ok(EngineConfig {
            facilities,
            categories,
            identities,
            rules,
            settings,
        })
    }

    fn read_required<T: DeserializeOwned>(&self, file_name: &str) -> ConfigResult<T> {
        let path = self.config_dir.join(file_name);
        self.read_optional(file_name)?
            .ok_or_else(|| ConfigurationError::MissingFile(path.display().to_string()))
    }

    fn read_optional<T: DeserializeOwned>(&self, file_name: &str) -> ConfigResult<Option<T>> {
        let path = self.config_dir.join(file_name);
        if !path.exists() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(&path).map_err(|e| ConfigurationError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ConfigurationError::Json {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

/// 环境变量覆写链路时间窗
fn apply_env_overrides<F>(settings: &mut EngineSettings, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(days) = parse_env_days(&lookup, env_keys::TRANSFER_WINDOW_DAYS)? {
        settings.linker.transfer_window_days = days;
    }
    if let Some(days) = parse_env_days(&lookup, env_keys::SHIPMENT_WINDOW_DAYS)? {
        settings.linker.shipment_window_days = days;
    }
    Ok(())
}

fn parse_env_days<F>(lookup: &F, key: &str) -> ConfigResult<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidEnv {
                key: key.to_string(),
                value: raw,
            }),
    }
}

// ==========================================
// 默认数据库路径
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 ORE_TRACE_DB_PATH（非空时）
/// - 否则: 用户数据目录/ore-trace/ore_trace.db
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(env_keys::DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("ore-trace").join("ore_trace.db"),
        None => PathBuf::from("./ore_trace.db"),
    }
}
