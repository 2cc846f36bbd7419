use super::RunRepository;
use crate::config::config_loader::EngineConfig;
use crate::config::registries::{
    CategoryAlphabet, FacilityInfo, FacilityRegistry, IdentityRegistry,
};
use crate::config::rule_set::{RuleScope, RuleSet};
use crate::config::settings::EngineSettings;
use crate::domain::types::Severity;
use crate::engine::pipeline::{RunInputs, RunOutput, TraceRun};
use crate::importer::file_parser::{RawRow, RawSheet};
use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn row(n: usize, pairs: &[(&str, &str)]) -> RawRow {
    RawRow::new(
        n,
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

fn run(run_id: &str, assay_codes: &[&str]) -> RunOutput {
    let mut facilities = BTreeMap::new();
    for code in ["A", "B", "C"] {
        facilities.insert(code.to_string(), FacilityInfo::default());
    }
    let facilities = FacilityRegistry::from_map(facilities).unwrap();
    let categories = CategoryAlphabet::all();
    let analytes = vec!["au".to_string()];
    let rules = RuleSet::from_json_str(
        r#"{ "ore_input_warning": {
              "record_type": "assay", "categories": ["K"], "field": "au_ppm",
              "comparator": "gt", "threshold": 5, "severity": "warning",
              "message": "{sample_code} high grade {value}" } }"#,
        &RuleScope {
            analytes: &analytes,
            facilities: &facilities,
            categories: &categories,
        },
        "inline",
    )
    .unwrap();
    let config = EngineConfig {
        facilities,
        categories,
        identities: IdentityRegistry::default(),
        rules,
        settings: EngineSettings::default(),
    };

    let inputs = RunInputs {
        shipments: vec![RawSheet::new(
            "trucking",
            vec![row(1, &[("date", "1404/10/14"), ("tonnage_kg", "25000"), ("destination", "A")])],
        )],
        transfers: vec![RawSheet::new(
            "A",
            vec![row(1, &[("date", "1404/10/14"), ("tonnage_kg", "12000")])],
        )],
        assays: vec![RawSheet::new(
            "lab",
            assay_codes
                .iter()
                .enumerate()
                .map(|(i, code)| row(i + 1, &[("sample_code", code), ("au_ppm", "6.2")]))
                .collect(),
        )],
    };

    TraceRun::new(config)
        .unwrap()
        .execute_at(&inputs, run_id.to_string(), Utc.with_ymd_and_hms(2026, 1, 4, 8, 0, 0).unwrap())
}

#[test]
fn test_save_run_and_query() {
    let repo = RunRepository::new(setup_test_db());
    let output = run("run-1", &["A14041014K2", "XX99"]);
    repo.save_run(&output).unwrap();

    let counts = repo.count_records().unwrap();
    assert_eq!(counts.shipments, 1);
    assert_eq!(counts.transfers, 1);
    assert_eq!(counts.assays, 2);
    assert_eq!(counts.links, 1);
    assert_eq!(counts.alerts as usize, output.alerts.len());

    let critical = repo.list_alerts(Some(Severity::Critical)).unwrap();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].rule, "invalid_label");

    let link = repo.find_link("assay:lab:1").unwrap().unwrap();
    assert_eq!(link.status, "resolved");
    assert_eq!(link.transfer_id.as_deref(), Some("transfer:A:1"));
    assert_eq!(link.shipment_id.as_deref(), Some("shipment:trucking:1"));
    assert!(link.candidates.is_empty());

    assert!(repo.find_link("assay:lab:2").unwrap().is_none());
}

#[test]
fn test_full_reload_replaces_previous_run() {
    let repo = RunRepository::new(setup_test_db());
    repo.save_run(&run("run-1", &["A14041014K2", "A14041014K3", "XX99"]))
        .unwrap();
    repo.save_run(&run("run-2", &["A14041014K2"])).unwrap();

    let counts = repo.count_records().unwrap();
    assert_eq!(counts.assays, 1);
    assert_eq!(counts.links, 1);
    assert!(repo
        .list_alerts(None)
        .unwrap()
        .iter()
        .all(|a| a.run_id == "run-2"));

    // 运行日志保留历史
    let runs = repo.list_runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().any(|r| r.run_id == "run-1" && r.assays == 3));
}
