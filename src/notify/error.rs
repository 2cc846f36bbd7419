// ==========================================
// 金矿物流溯源系统 - 通知层错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("告警日志写入失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("告警序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("通知渠道不可用 ({channel}): {message}")]
    ChannelUnavailable { channel: String, message: String },
}

pub type NotifyResult<T> = Result<T, NotifyError>;
