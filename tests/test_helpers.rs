// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的配置目录、原始行构造、固定运行时间戳
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ore_trace::config::{ConfigLoader, EngineConfig};
use ore_trace::engine::{RunInputs, RunOutput, TraceRun};
use ore_trace::importer::{RawRow, RawSheet};
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 仓库自带的示例配置目录
pub fn repo_config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// 复制示例配置到临时目录（测试可随意改写）
///
/// # 返回
/// - TempDir: 临时目录（需要保持存活）
pub fn create_test_config_dir() -> Result<TempDir, Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    for entry in std::fs::read_dir(repo_config_dir())? {
        let entry = entry?;
        std::fs::copy(entry.path(), temp_dir.path().join(entry.file_name()))?;
    }
    Ok(temp_dir)
}

/// 加载示例配置
pub fn load_test_config() -> EngineConfig {
    ConfigLoader::new(repo_config_dir())
        .load_with_env(|_| None)
        .expect("示例配置应可加载")
}

/// 固定运行时间戳
pub fn fixed_run_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 4, 8, 0, 0).unwrap()
}

pub fn row(row_number: usize, pairs: &[(&str, &str)]) -> RawRow {
    let fields: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RawRow::new(row_number, fields)
}

pub fn sheet(name: &str, rows: Vec<RawRow>) -> RawSheet {
    RawSheet::new(name, rows)
}

/// 一条无告警的卡车运输（日期, 目的地文本, 吨位 kg）
pub fn clean_shipment(row_number: usize, date: &str, destination: &str, tonnage: &str) -> RawRow {
    row(
        row_number,
        &[
            ("تاریخ", date),
            ("مقصد", destination),
            ("تناژ", tonnage),
            ("شماره رسید", "R-100"),
            ("نام راننده", "کریمی"),
        ],
    )
}

pub fn transfer(row_number: usize, date: &str, tonnage: &str) -> RawRow {
    row(row_number, &[("تاریخ", date), ("تناژ", tonnage)])
}

pub fn assay(row_number: usize, code: &str, au: &str) -> RawRow {
    row(row_number, &[("Sample", code), ("Au (ppm)", au)])
}

/// 以示例配置 + 固定时间戳执行一次运行
pub fn run_with_default_config(inputs: &RunInputs) -> RunOutput {
    ore_trace::logging::init_test();
    TraceRun::new(load_test_config())
        .expect("示例配置应可编译")
        .execute_at(inputs, "test-run".to_string(), fixed_run_ts())
}
