// ==========================================
// 配置加载集成测试
// ==========================================
// 测试目标: 示例配置可加载; 配置错误在处理任何记录前中止
// ==========================================

mod test_helpers;

use ore_trace::config::{ConfigLoader, ConfigurationError};
use ore_trace::domain::FacilityCode;
use std::fs;
use test_helpers::create_test_config_dir;

#[test]
fn test_repo_config_loads() {
    let dir = create_test_config_dir().expect("Failed to create config dir");
    let config = ConfigLoader::new(dir.path())
        .load_with_env(|_| None)
        .expect("config should load");

    assert!(config.facilities.contains(FacilityCode::C));
    assert_eq!(config.rules.len(), 9);
    assert!(config.rules.get("tailings_loss").is_some());
    assert!(!config.identities.is_empty());
    assert_eq!(config.settings.linker.transfer_window_days, 0);
}

#[test]
fn test_unknown_rule_field_is_fatal() {
    let dir = create_test_config_dir().expect("Failed to create config dir");
    fs::write(
        dir.path().join("validation_rules.json"),
        r#"{ "bad": { "record_type": "assay", "field": "ag_ppm", "comparator": "gt",
              "threshold": 1, "severity": "warning", "message": "x" } }"#,
    )
    .unwrap();

    let result = ConfigLoader::new(dir.path()).load_with_env(|_| None);
    assert!(matches!(result, Err(ConfigurationError::UnknownField { .. })));
}

#[test]
fn test_non_numeric_threshold_is_fatal() {
    let dir = create_test_config_dir().expect("Failed to create config dir");
    fs::write(
        dir.path().join("validation_rules.json"),
        r#"{ "bad": { "record_type": "shipment", "field": "net_weight_kg", "comparator": "gt",
              "threshold": "heavy", "severity": "warning", "message": "x" } }"#,
    )
    .unwrap();

    let result = ConfigLoader::new(dir.path()).load_with_env(|_| None);
    assert!(matches!(
        result,
        Err(ConfigurationError::NonNumericThreshold { .. })
    ));
}

#[test]
fn test_unknown_record_type_is_fatal() {
    let dir = create_test_config_dir().expect("Failed to create config dir");
    fs::write(
        dir.path().join("validation_rules.json"),
        r#"{ "bad": { "record_type": "invoice", "field": "amount", "comparator": "gt",
              "threshold": 1, "severity": "warning", "message": "x" } }"#,
    )
    .unwrap();

    let result = ConfigLoader::new(dir.path()).load_with_env(|_| None);
    assert!(matches!(
        result,
        Err(ConfigurationError::UnknownRecordType { .. })
    ));
}

#[test]
fn test_missing_rules_file_is_fatal() {
    let dir = create_test_config_dir().expect("Failed to create config dir");
    fs::remove_file(dir.path().join("validation_rules.json")).unwrap();

    let result = ConfigLoader::new(dir.path()).load_with_env(|_| None);
    assert!(matches!(result, Err(ConfigurationError::MissingFile(_))));
}

#[test]
fn test_env_window_override() {
    let dir = create_test_config_dir().expect("Failed to create config dir");
    let config = ConfigLoader::new(dir.path())
        .load_with_env(|key| match key {
            "ORE_TRACE_TRANSFER_WINDOW_DAYS" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.settings.linker.transfer_window_days, 2);

    let bad = ConfigLoader::new(dir.path()).load_with_env(|key| match key {
        "ORE_TRACE_SHIPMENT_WINDOW_DAYS" => Some("two".to_string()),
        _ => None,
    });
    assert!(matches!(bad, Err(ConfigurationError::InvalidEnv { .. })));
}
