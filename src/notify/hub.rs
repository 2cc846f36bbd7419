// ==========================================
// 金矿物流溯源系统 - 通知分发中心
// ==========================================
// 并发投递到所有渠道; 单个渠道失败只记录日志, 不影响其他渠道
// ==========================================

use crate::domain::alert::StampedAlert;
use crate::notify::notifier_trait::AlertNotifier;
use futures::future::join_all;
use tracing::{error, info};

/// 单个渠道的投递结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub channel: String,
    pub delivered: usize,
    pub error: Option<String>,
}

impl DeliveryReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Default)]
pub struct NotifierHub {
    notifiers: Vec<Box<dyn AlertNotifier>>,
}

impl NotifierHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: impl AlertNotifier + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }

    pub fn register(&mut self, notifier: Box<dyn AlertNotifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub async fn dispatch(&self, alerts: &[StampedAlert]) -> Vec<DeliveryReport> {
        let tasks = self.notifiers.iter().map(|notifier| async move {
            let channel = notifier.name().to_string();
            match notifier.notify(alerts).await {
                Ok(delivered) => DeliveryReport {
                    channel,
                    delivered,
                    error: None,
                },
                Err(e) => {
                    error!(channel = %channel, error = %e, "告警投递失败");
                    DeliveryReport {
                        channel,
                        delivered: 0,
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        let reports = join_all(tasks).await;

        info!(
            channels = reports.len(),
            failed = reports.iter().filter(|r| !r.is_ok()).count(),
            alerts = alerts.len(),
            "告警分发完成"
        );
        reports
    }
}
