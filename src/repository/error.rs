// ==========================================
// 金矿物流溯源系统 - 仓储层错误类型
// ==========================================

use thiserror::Error;

/// 运行结果持久化错误
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("无法打开溯源数据库 {path}: {message}")]
    Open { path: String, message: String },

    #[error("数据库连接锁已失效: {0}")]
    LockError(String),

    #[error("运行结果写入失败 (run_id={run_id}): {message}")]
    SaveFailed { run_id: String, message: String },

    #[error("SQLite 错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON 列编解码失败: {0}")]
    JsonColumn(#[from] serde_json::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
