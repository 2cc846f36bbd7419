// ==========================================
// 金矿物流溯源系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout, 减少并发写入时的偶发 busy 错误
// - 幂等建表 (CREATE TABLE IF NOT EXISTS)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS run_log (
    run_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    shipments INTEGER NOT NULL,
    transfers INTEGER NOT NULL,
    assays INTEGER NOT NULL,
    rejected_rows INTEGER NOT NULL,
    alerts INTEGER NOT NULL,
    critical_alerts INTEGER NOT NULL,
    warning_alerts INTEGER NOT NULL,
    link_rate REAL NOT NULL,
    summary_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shipment_record (
    record_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    row_number INTEGER NOT NULL,
    source_row TEXT,
    shipment_date TEXT NOT NULL,
    destination TEXT NOT NULL,
    destination_text TEXT NOT NULL,
    net_weight_kg REAL NOT NULL,
    gross_weight_kg REAL,
    cost_per_ton_rial REAL,
    transport_cost_rial REAL,
    truck_number TEXT,
    receipt_number TEXT,
    driver_raw TEXT,
    driver_canonical TEXT,
    driver_known INTEGER,
    notes TEXT
);

CREATE TABLE IF NOT EXISTS transfer_record (
    record_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    row_number INTEGER NOT NULL,
    origin TEXT NOT NULL,
    transfer_date TEXT NOT NULL,
    weight_kg REAL NOT NULL,
    cumulative_weight_kg REAL,
    destination TEXT NOT NULL,
    driver_raw TEXT,
    driver_canonical TEXT,
    driver_known INTEGER,
    transport_cost_rial REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS assay_record (
    record_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    row_number INTEGER NOT NULL,
    sample_code TEXT NOT NULL,
    facility TEXT,
    sample_date TEXT,
    category TEXT,
    sequence INTEGER,
    invalid_reason TEXT,
    analytes_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS link_result (
    assay_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    sample_code TEXT NOT NULL,
    status TEXT NOT NULL,
    transfer_id TEXT,
    shipment_id TEXT,
    chain_json TEXT NOT NULL,
    candidates_json TEXT NOT NULL,
    reason TEXT
);

CREATE TABLE IF NOT EXISTS alert (
    alert_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    rule TEXT NOT NULL,
    severity TEXT NOT NULL,
    subject TEXT NOT NULL,
    value REAL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alert_severity ON alert(severity);
CREATE INDEX IF NOT EXISTS idx_link_status ON link_result(status);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys / busy_timeout 都需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
