use super::core::{RecordCounts, RunLogEntry, RunRepository, StoredAlert, StoredLink};
use crate::domain::types::Severity;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, OptionalExtension, Row};

impl RunRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 运行历史（最新在前）
    pub fn list_runs(&self) -> RepositoryResult<Vec<RunLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, started_at, finished_at, shipments, transfers, assays,
                   rejected_rows, alerts, critical_alerts, warning_alerts, link_rate
            FROM run_log
            ORDER BY started_at DESC, run_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RunLogEntry {
                run_id: row.get(0)?,
                started_at: row.get(1)?,
                finished_at: row.get(2)?,
                shipments: row.get(3)?,
                transfers: row.get(4)?,
                assays: row.get(5)?,
                rejected_rows: row.get(6)?,
                alerts: row.get(7)?,
                critical_alerts: row.get(8)?,
                warning_alerts: row.get(9)?,
                link_rate: row.get(10)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 当前告警（可按级别过滤）, critical 在前
    pub fn list_alerts(&self, severity: Option<Severity>) -> RepositoryResult<Vec<StoredAlert>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT alert_id, run_id, rule, severity, subject, value, message, created_at
            FROM alert
            WHERE ?1 IS NULL OR severity = ?1
            ORDER BY CASE severity WHEN 'critical' THEN 0 ELSE 1 END, rule, subject
            "#,
        )?;

        let rows = stmt.query_map(params![severity.map(|s| s.as_str())], map_alert_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 按化验记录标识查询链路
    pub fn find_link(&self, assay_id: &str) -> RepositoryResult<Option<StoredLink>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT assay_id, run_id, sample_code, status, transfer_id, shipment_id,
                       candidates_json, reason
                FROM link_result
                WHERE assay_id = ?1
                "#,
                params![assay_id],
                |row| {
                    Ok((
                        StoredLink {
                            assay_id: row.get(0)?,
                            run_id: row.get(1)?,
                            sample_code: row.get(2)?,
                            status: row.get(3)?,
                            transfer_id: row.get(4)?,
                            shipment_id: row.get(5)?,
                            candidates: Vec::new(),
                            reason: row.get(7)?,
                        },
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        match raw {
            Some((mut link, candidates_json)) => {
                link.candidates = serde_json::from_str(&candidates_json)?;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }

    /// 当前各表行数
    pub fn count_records(&self) -> RepositoryResult<RecordCounts> {
        let conn = self.get_conn()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        };

        Ok(RecordCounts {
            shipments: count("shipment_record")?,
            transfers: count("transfer_record")?,
            assays: count("assay_record")?,
            links: count("link_result")?,
            alerts: count("alert")?,
        })
    }
}

fn map_alert_row(row: &Row<'_>) -> rusqlite::Result<StoredAlert> {
    Ok(StoredAlert {
        alert_id: row.get(0)?,
        run_id: row.get(1)?,
        rule: row.get(2)?,
        severity: row.get(3)?,
        subject: row.get(4)?,
        value: row.get(5)?,
        message: row.get(6)?,
        created_at: row.get(7)?,
    })
}
