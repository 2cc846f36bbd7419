// ==========================================
// 金矿物流溯源系统 - 单次运行编排器
// ==========================================
// 流程: 配置（已加载, 失败即中止）→ 行映射/规范化 → 样品编码解析
//       → 链路追溯 → 数据质量告警 → 规则校验 → 告警聚合 → 统计
// 红线: 单线程批处理; 每次运行是完整快照的全量重算
// ==========================================

use crate::config::config_loader::EngineConfig;
use crate::config::error::ConfigResult;
use crate::domain::alert::{
    Alert, StampedAlert, RULE_INCOMPLETE_TRACE, RULE_INVALID_LABEL, RULE_NO_TRACEABLE_SOURCE,
    RULE_RECORD_REJECTED,
};
use crate::domain::link::LinkStatus;
use crate::domain::records::{RecordSnapshot, SampleCodeStatus};
use crate::domain::types::Severity;
use crate::engine::alert_aggregator::AlertAggregator;
use crate::engine::linker::{LinkSet, TraceLinker};
use crate::engine::statistics::{self, RunSummary};
use crate::engine::validator::Validator;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::{FieldMapper, RejectedRow};
use crate::importer::file_parser::{RawSheet, UniversalFileParser};
use crate::importer::sample_code_parser::SampleCodeParser;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

/// 三条数据流的原始输入
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub shipments: Vec<RawSheet>,
    pub transfers: Vec<RawSheet>,
    pub assays: Vec<RawSheet>,
}

impl RunInputs {
    /// 从文件读取（未提供的数据流视为空）
    pub fn from_files(
        shipments: Option<&Path>,
        transfers: Option<&Path>,
        assays: Option<&Path>,
    ) -> ImportResult<Self> {
        let parser = UniversalFileParser;
        let read = |path: Option<&Path>| -> ImportResult<Vec<RawSheet>> {
            match path {
                Some(p) => {
                    let sheets = parser.parse(p)?;
                    tracing::info!(
                        file = %p.display(),
                        sheets = sheets.len(),
                        rows = sheets.iter().map(|s| s.rows.len()).sum::<usize>(),
                        "输入文件已读取"
                    );
                    Ok(sheets)
                }
                None => Ok(Vec::new()),
            }
        };

        Ok(Self {
            shipments: read(shipments)?,
            transfers: read(transfers)?,
            assays: read(assays)?,
        })
    }
}

/// 单次运行的完整输出
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub snapshot: RecordSnapshot,
    pub rejected: Vec<RejectedRow>,
    pub links: LinkSet,
    /// 已去重, critical 在前
    pub alerts: Vec<StampedAlert>,
    pub summary: RunSummary,
}

impl RunOutput {
    pub fn alerts_for_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a StampedAlert> {
        self.alerts.iter().filter(move |a| a.alert.rule == rule)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.alert.severity == severity)
            .count()
    }
}

pub struct TraceRun {
    config: EngineConfig,
    parser: SampleCodeParser,
}

impl TraceRun {
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        let parser = SampleCodeParser::new(&config.facilities, &config.categories)?;
        Ok(Self { config, parser })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn execute(&self, inputs: &RunInputs) -> RunOutput {
        self.execute_at(inputs, Uuid::new_v4().to_string(), Utc::now())
    }

    /// 以指定运行标识与时间戳执行（时间戳参与告警稳定标识）
    pub fn execute_at(
        &self,
        inputs: &RunInputs,
        run_id: String,
        started_at: DateTime<Utc>,
    ) -> RunOutput {
        tracing::info!(run_id = %run_id, "溯源运行开始");

        // ===== 1. 行映射 / 规范化 / 编码解析 =====
        let mapper = FieldMapper::new(&self.config, &self.parser);
        let shipments = mapper.map_shipments(&inputs.shipments);
        let transfers = mapper.map_transfers(&inputs.transfers);
        let assays = mapper.map_assays(&inputs.assays);

        let skipped_summary_rows = shipments.skipped_summary_rows
            + transfers.skipped_summary_rows
            + assays.skipped_summary_rows;
        let rejected: Vec<RejectedRow> = shipments
            .rejected
            .into_iter()
            .chain(transfers.rejected)
            .chain(assays.rejected)
            .collect();

        let snapshot = RecordSnapshot {
            shipments: shipments.records,
            transfers: transfers.records,
            assays: assays.records,
        };
        tracing::info!(
            shipments = snapshot.shipments.len(),
            transfers = snapshot.transfers.len(),
            assays = snapshot.assays.len(),
            rejected = rejected.len(),
            "规范化完成"
        );

        // ===== 2. 链路追溯 =====
        let links = TraceLinker::new(self.config.settings.linker).link(&snapshot);

        // ===== 3. 数据质量告警 + 规则告警 =====
        let mut raw_alerts = quality_alerts(&snapshot, &rejected, &links, started_at);
        raw_alerts.extend(Validator::new(&self.config.rules, started_at).validate(&snapshot));

        // ===== 4. 聚合 =====
        let aggregator = AlertAggregator::new(started_at);
        let alerts = aggregator.aggregate(raw_alerts);

        // ===== 5. 统计 =====
        let analyte = self
            .config
            .settings
            .analytes
            .first()
            .map(|a| a.to_lowercase())
            .unwrap_or_else(|| "au".to_string());

        let summary = RunSummary {
            shipments: snapshot.shipments.len(),
            transfers: snapshot.transfers.len(),
            assays: snapshot.assays.len(),
            invalid_sample_codes: snapshot
                .assays
                .iter()
                .filter(|a| a.descriptor().is_none())
                .count(),
            rejected_rows: rejected.len(),
            skipped_summary_rows,
            assays_by_category: statistics::assay_statistics(&snapshot.assays, &analyte),
            shipments_by_destination: statistics::shipment_statistics(&snapshot.shipments),
            transfer_weight_kg: statistics::transfer_weight(&snapshot.transfers),
            trace: links.report(),
            alerts: aggregator.summarize(&alerts),
        };

        tracing::info!(
            run_id = %run_id,
            alerts = alerts.len(),
            critical = summary.alerts.count(Severity::Critical),
            warning = summary.alerts.count(Severity::Warning),
            link_rate = summary.trace.link_rate,
            "溯源运行结束"
        );

        RunOutput {
            run_id,
            started_at,
            snapshot,
            rejected,
            links,
            alerts,
            summary,
        }
    }
}

/// 内置数据质量告警（不依赖规则配置）
fn quality_alerts(
    snapshot: &RecordSnapshot,
    rejected: &[RejectedRow],
    links: &LinkSet,
    timestamp: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for row in rejected {
        alerts.push(Alert {
            rule: RULE_RECORD_REJECTED.to_string(),
            severity: Severity::Warning,
            subject: row.record_id.clone(),
            value: None,
            message: format!("{} row rejected: {}", row.record_type, row.error),
            timestamp,
        });
    }

    for assay in &snapshot.assays {
        if let SampleCodeStatus::Invalid { reason } = &assay.code {
            alerts.push(Alert {
                rule: RULE_INVALID_LABEL.to_string(),
                severity: Severity::Critical,
                subject: assay.record_id.clone(),
                value: None,
                message: format!("Invalid sample label '{}': {}", assay.sample_code, reason),
                timestamp,
            });
        }
    }

    for result in links.results() {
        let reason = result.reason.clone().unwrap_or_default();
        let (rule, message) = match result.status {
            LinkStatus::Resolved => continue,
            LinkStatus::Unresolved => (
                RULE_NO_TRACEABLE_SOURCE,
                format!("Sample {} has no traceable source: {}", result.sample_code, reason),
            ),
            LinkStatus::Partial => (
                RULE_INCOMPLETE_TRACE,
                format!("Sample {} trace incomplete: {}", result.sample_code, reason),
            ),
        };
        alerts.push(Alert {
            rule: rule.to_string(),
            severity: Severity::Warning,
            subject: result.assay_id.clone(),
            value: None,
            message,
            timestamp,
        });
    }

    alerts
}
