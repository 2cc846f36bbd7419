// ==========================================
// 金矿物流溯源系统 - 运行结果仓储
// ==========================================
// 持久化策略: 全量重载（每次运行在一个事务内替换上次的记录/链路/告警）
// run_log 按运行追加, 保留历史
// 红线: Repository 不含业务规则, 只做数据映射
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::{RecordCounts, RunLogEntry, RunRepository, StoredAlert, StoredLink};
