// ==========================================
// 金矿物流溯源系统 - JSON Lines 告警日志
// ==========================================
// 每条告警一行: { timestamp, level, rule, message, data }
// 只追加, 不改写历史
// ==========================================

use crate::domain::alert::StampedAlert;
use crate::notify::error::{NotifyError, NotifyResult};
use crate::notify::notifier_trait::AlertNotifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// 告警日志行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLogEntry {
    pub timestamp: String,
    pub level: String,
    pub rule: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl From<&StampedAlert> for AlertLogEntry {
    fn from(stamped: &StampedAlert) -> Self {
        let alert = &stamped.alert;
        Self {
            timestamp: alert.timestamp.to_rfc3339(),
            level: alert.severity.as_str().to_string(),
            rule: alert.rule.clone(),
            message: alert.message.clone(),
            data: serde_json::json!({
                "alert_id": stamped.alert_id,
                "subject": alert.subject.as_str(),
                "value": alert.value,
            }),
        }
    }
}

pub struct JsonLinesNotifier {
    path: PathBuf,
}

impl JsonLinesNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> NotifyError {
        NotifyError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// 读取最近的告警日志（按写入顺序, 最多 limit 条）
    ///
    /// 文件不存在时返回空列表; 无法解析的行跳过
    pub async fn read_alerts(&self, limit: usize) -> NotifyResult<Vec<AlertLogEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let entries: Vec<AlertLogEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "跳过无法解析的告警日志行");
                    None
                }
            })
            .collect();

        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

#[async_trait]
impl AlertNotifier for JsonLinesNotifier {
    fn name(&self) -> &str {
        "json_lines"
    }

    async fn notify(&self, alerts: &[StampedAlert]) -> NotifyResult<usize> {
        if alerts.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut buffer = String::new();
        for stamped in alerts {
            buffer.push_str(&serde_json::to_string(&AlertLogEntry::from(stamped))?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        tracing::info!(path = %self.path.display(), count = alerts.len(), "告警已写入日志");
        Ok(alerts.len())
    }
}
