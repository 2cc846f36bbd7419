// ==========================================
// 金矿物流溯源系统 - 通知渠道 Trait
// ==========================================
// 每个渠道收到相同的告警序列, 自行决定格式与投递方式
// ==========================================

use crate::domain::alert::StampedAlert;
use crate::notify::error::NotifyResult;
use async_trait::async_trait;

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// 渠道名（用于日志）
    fn name(&self) -> &str;

    /// 投递一批告警（已排序, critical 在前）
    ///
    /// # 返回
    /// 实际投递条数
    async fn notify(&self, alerts: &[StampedAlert]) -> NotifyResult<usize>;
}
