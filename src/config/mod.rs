// ==========================================
// 金矿物流溯源系统 - 配置层
// ==========================================
// 职责: 外部配置加载（登记表、校验规则、运行参数）
// 红线: 配置错误在处理任何记录之前中止运行
// ==========================================

pub mod config_loader;
pub mod error;
pub mod registries;
pub mod rule_set;
pub mod settings;

pub use config_loader::{config_files, default_db_path, env_keys, ConfigLoader, EngineConfig};
pub use error::{ConfigResult, ConfigurationError};
pub use registries::{CategoryAlphabet, FacilityInfo, FacilityRegistry, IdentityRegistry};
pub use rule_set::{RuleDefinition, RuleScope, RuleSet};
pub use settings::{EngineSettings, LinkerSettings};
