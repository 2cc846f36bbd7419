// ==========================================
// 金矿物流溯源系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化, 防止 SQL 注入
// ==========================================

pub mod error;
pub mod run_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use run_repo::{RecordCounts, RunLogEntry, RunRepository, StoredAlert, StoredLink};
