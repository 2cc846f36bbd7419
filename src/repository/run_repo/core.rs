use crate::db;
use crate::domain::records::{
    AssayRecord, CanonicalName, SampleCodeStatus, ShipmentRecord, TransferRecord,
};
use crate::domain::types::Severity;
use crate::engine::pipeline::RunOutput;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ==========================================
// 查询结果实体
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub shipments: i64,
    pub transfers: i64,
    pub assays: i64,
    pub rejected_rows: i64,
    pub alerts: i64,
    pub critical_alerts: i64,
    pub warning_alerts: i64,
    pub link_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub alert_id: String,
    pub run_id: String,
    pub rule: String,
    pub severity: String,
    pub subject: String,
    pub value: Option<f64>,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLink {
    pub assay_id: String,
    pub run_id: String,
    pub sample_code: String,
    pub status: String,
    pub transfer_id: Option<String>,
    pub shipment_id: Option<String>,
    pub candidates: Vec<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub shipments: i64,
    pub transfers: i64,
    pub assays: i64,
    pub links: i64,
    pub alerts: i64,
}

// ==========================================
// RunRepository - 运行结果仓储
// ==========================================
pub struct RunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并建表
    pub fn open(db_path: &Path) -> RepositoryResult<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RepositoryError::Open {
                path: db_path.display().to_string(),
                message: e.to_string(),
            })?;
        }
        let conn = db::open_sqlite_connection(db_path).map_err(|e| RepositoryError::Open {
            path: db_path.display().to_string(),
            message: e.to_string(),
        })?;
        db::init_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 保存一次运行的全部输出（全量重载）
    ///
    /// 上次运行的记录、链路、告警在同一事务内被替换; run_log 追加一行
    pub fn save_run(&self, output: &RunOutput) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction().map_err(|e| RepositoryError::SaveFailed {
            run_id: output.run_id.clone(),
            message: e.to_string(),
        })?;

        tx.execute_batch(
            r#"
            DELETE FROM alert;
            DELETE FROM link_result;
            DELETE FROM assay_record;
            DELETE FROM transfer_record;
            DELETE FROM shipment_record;
            "#,
        )?;

        let run_id = output.run_id.as_str();
        let shipments = Self::insert_shipments_tx(&tx, run_id, &output.snapshot.shipments)?;
        let transfers = Self::insert_transfers_tx(&tx, run_id, &output.snapshot.transfers)?;
        let assays = Self::insert_assays_tx(&tx, run_id, &output.snapshot.assays)?;
        let links = Self::insert_links_tx(&tx, output)?;
        let alerts = Self::insert_alerts_tx(&tx, output)?;
        Self::insert_run_log_tx(&tx, output)?;

        tx.commit().map_err(|e| RepositoryError::SaveFailed {
            run_id: output.run_id.clone(),
            message: e.to_string(),
        })?;

        tracing::info!(
            run_id = %run_id,
            shipments,
            transfers,
            assays,
            links,
            alerts,
            "运行结果已持久化"
        );
        Ok(())
    }

    fn insert_shipments_tx(
        tx: &Transaction,
        run_id: &str,
        shipments: &[ShipmentRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO shipment_record (
                record_id, run_id, sheet_name, row_number, source_row, shipment_date,
                destination, destination_text, net_weight_kg, gross_weight_kg,
                cost_per_ton_rial, transport_cost_rial, truck_number, receipt_number,
                driver_raw, driver_canonical, driver_known, notes
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )?;

        for s in shipments {
            let (driver_raw, driver_canonical, driver_known) = driver_columns(s.driver.as_ref());
            stmt.execute(params![
                s.record_id.as_str(),
                run_id,
                s.sheet_name,
                s.row_number as i64,
                s.source_row,
                s.date.to_string(),
                s.destination.to_string(),
                s.destination_text,
                s.net_weight_kg,
                s.gross_weight_kg,
                s.cost_per_ton_rial,
                s.transport_cost_rial,
                s.truck_number,
                s.receipt_number,
                driver_raw,
                driver_canonical,
                driver_known,
                s.notes,
            ])?;
        }
        Ok(shipments.len())
    }

    fn insert_transfers_tx(
        tx: &Transaction,
        run_id: &str,
        transfers: &[TransferRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO transfer_record (
                record_id, run_id, sheet_name, row_number, origin, transfer_date,
                weight_kg, cumulative_weight_kg, destination,
                driver_raw, driver_canonical, driver_known, transport_cost_rial
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )?;

        for t in transfers {
            let (driver_raw, driver_canonical, driver_known) = driver_columns(t.driver.as_ref());
            stmt.execute(params![
                t.record_id.as_str(),
                run_id,
                t.sheet_name,
                t.row_number as i64,
                t.origin.to_string(),
                t.date.to_string(),
                t.weight_kg,
                t.cumulative_weight_kg,
                t.destination,
                driver_raw,
                driver_canonical,
                driver_known,
                t.transport_cost_rial,
            ])?;
        }
        Ok(transfers.len())
    }

    fn insert_assays_tx(
        tx: &Transaction,
        run_id: &str,
        assays: &[AssayRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO assay_record (
                record_id, run_id, sheet_name, row_number, sample_code,
                facility, sample_date, category, sequence, invalid_reason, analytes_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )?;

        for a in assays {
            let (facility, date, category, sequence, invalid_reason) = match &a.code {
                SampleCodeStatus::Parsed { descriptor } => (
                    Some(descriptor.facility().to_string()),
                    Some(descriptor.date().to_string()),
                    Some(descriptor.category().code().to_string()),
                    Some(descriptor.sequence() as i64),
                    None,
                ),
                SampleCodeStatus::Invalid { reason } => {
                    (None, None, None, None, Some(reason.clone()))
                }
            };
            stmt.execute(params![
                a.record_id.as_str(),
                run_id,
                a.sheet_name,
                a.row_number as i64,
                a.sample_code,
                facility,
                date,
                category,
                sequence,
                invalid_reason,
                serde_json::to_string(&a.analytes)?,
            ])?;
        }
        Ok(assays.len())
    }

    fn insert_links_tx(tx: &Transaction, output: &RunOutput) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO link_result (
                assay_id, run_id, sample_code, status, transfer_id, shipment_id,
                chain_json, candidates_json, reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;

        for link in output.links.results() {
            stmt.execute(params![
                link.assay_id.as_str(),
                output.run_id,
                link.sample_code,
                link.status.as_str(),
                link.transfer_id().map(|id| id.as_str()),
                link.shipment_id().map(|id| id.as_str()),
                serde_json::to_string(&link.chain)?,
                serde_json::to_string(&link.candidates)?,
                link.reason,
            ])?;
        }
        Ok(output.links.len())
    }

    fn insert_alerts_tx(tx: &Transaction, output: &RunOutput) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO alert (
                alert_id, run_id, rule, severity, subject, value, message, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )?;

        for stamped in &output.alerts {
            let alert = &stamped.alert;
            stmt.execute(params![
                stamped.alert_id,
                output.run_id,
                alert.rule,
                alert.severity.as_str(),
                alert.subject.as_str(),
                alert.value,
                alert.message,
                alert.timestamp.to_rfc3339(),
            ])?;
        }
        Ok(output.alerts.len())
    }

    fn insert_run_log_tx(tx: &Transaction, output: &RunOutput) -> RepositoryResult<()> {
        let summary = &output.summary;
        tx.execute(
            r#"
            INSERT INTO run_log (
                run_id, started_at, finished_at, shipments, transfers, assays,
                rejected_rows, alerts, critical_alerts, warning_alerts, link_rate, summary_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                output.run_id,
                output.started_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                summary.shipments as i64,
                summary.transfers as i64,
                summary.assays as i64,
                summary.rejected_rows as i64,
                summary.alerts.total_alerts as i64,
                summary.alerts.count(Severity::Critical) as i64,
                summary.alerts.count(Severity::Warning) as i64,
                summary.trace.link_rate,
                serde_json::to_string(summary)?,
            ],
        )?;
        Ok(())
    }
}

/// 驾驶员列: (原始写法, 规范名, 是否已登记)
fn driver_columns(driver: Option<&CanonicalName>) -> (Option<String>, Option<String>, Option<bool>) {
    match driver {
        Some(name) => (
            Some(name.raw().to_string()),
            name.is_known().then(|| name.display_name().to_string()),
            Some(name.is_known()),
        ),
        None => (None, None, None),
    }
}
