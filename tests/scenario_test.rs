// ==========================================
// 端到端场景测试
// ==========================================
// 测试目标: 原始行 → 规范化 → 追溯 → 校验 → 聚合 的完整运行
// ==========================================

mod test_helpers;

use ore_trace::domain::{LinkStatus, RecordId, Severity};
use ore_trace::engine::{RunInputs, RunOutput, TraceRun};
use test_helpers::{
    assay, clean_shipment, fixed_run_ts, load_test_config, row, run_with_default_config, sheet,
    transfer,
};

#[test]
fn test_ore_input_high_grade_single_warning() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![clean_shipment(1, "1404/10/14", "رباط سفید", "25000")],
        )],
        transfers: vec![sheet("رباط سفید", vec![transfer(1, "1404/10/14", "12000")])],
        assays: vec![sheet("lab", vec![assay(1, "A14041014K2", "6.2")])],
    };

    let output = run_with_default_config(&inputs);

    assert_eq!(output.count(Severity::Critical), 0);
    assert_eq!(output.count(Severity::Warning), 1);
    let alert = &output.alerts[0].alert;
    assert_eq!(alert.rule, "ore_input_warning");
    assert_eq!(alert.value, Some(6.2));
    assert!(alert.message.contains("6.2"));
    assert!(alert.message.contains("A14041014K2"));

    let link = output.links.get(&RecordId::assay("lab", 1)).unwrap();
    assert_eq!(link.status, LinkStatus::Resolved);
    assert_eq!(output.summary.trace.link_rate, 1.0);
}

#[test]
fn test_tailings_gold_loss_links_to_facility_b() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![clean_shipment(1, "1404/10/15", "شن بتن مشهد", "24000")],
        )],
        transfers: vec![
            sheet("شن بتن", vec![transfer(1, "1404/10/15", "11000")]),
            sheet("کاویان", vec![transfer(1, "1404/10/15", "9000")]),
        ],
        assays: vec![sheet("lab", vec![assay(1, "B14041015T1", "0.35")])],
    };

    let output = run_with_default_config(&inputs);

    let critical: Vec<_> = output
        .alerts
        .iter()
        .filter(|a| a.alert.severity == Severity::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].alert.rule, "tailings_loss");

    let link = output.links.get(&RecordId::assay("lab", 1)).unwrap();
    assert_eq!(link.transfer_id(), Some(&RecordId::transfer("شن بتن", 1)));
    assert_eq!(link.shipment_id(), Some(&RecordId::shipment("trucking", 1)));

    // 点查询: 哪些运输/转运记录供给了该样品
    let sample = RecordId::assay("lab", 1);
    assert_eq!(
        output.links.shipments_for(&sample),
        vec![&RecordId::shipment("trucking", 1)]
    );
    assert_eq!(
        output.links.transfers_for(&sample),
        vec![&RecordId::transfer("شن بتن", 1)]
    );
    assert_eq!(output.links.with_status(LinkStatus::Resolved).count(), 1);
    assert!(output.links.shipments_for(&RecordId::assay("lab", 9)).is_empty());
}

#[test]
fn test_malformed_code_is_critical_invalid_label_without_link() {
    let inputs = RunInputs {
        assays: vec![sheet("lab", vec![assay(1, "XX99", "1.0")])],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    let invalid: Vec<_> = output.alerts_for_rule("invalid_label").collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].alert.severity, Severity::Critical);
    assert!(invalid[0].alert.message.contains("XX99"));

    assert!(output.links.get(&RecordId::assay("lab", 1)).is_none());
    assert!(output.links.is_empty());
    assert_eq!(output.summary.invalid_sample_codes, 1);
}

#[test]
fn test_unusual_tonnage_only_for_out_of_range_load() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![
                clean_shipment(1, "1404/10/14", "شهرک کاویان", "40000"),
                clean_shipment(2, "1404/10/14", "شهرک کاویان", "20000"),
            ],
        )],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    let tonnage: Vec<_> = output.alerts_for_rule("unusual_tonnage").collect();
    assert_eq!(tonnage.len(), 1);
    assert_eq!(tonnage[0].alert.subject, RecordId::shipment("trucking", 1));
    assert_eq!(tonnage[0].alert.severity, Severity::Warning);
    assert_eq!(output.alerts.len(), 1);
}

#[test]
fn test_assay_without_transfer_is_unresolved_with_alert() {
    let inputs = RunInputs {
        transfers: vec![sheet("کاویان", vec![transfer(1, "1404/10/13", "9000")])],
        assays: vec![sheet("lab", vec![assay(1, "C14041014K2", "1.1")])],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    let link = output.links.get(&RecordId::assay("lab", 1)).unwrap();
    assert_eq!(link.status, LinkStatus::Unresolved);
    assert_eq!(link.reason.as_deref(), Some("no transfer in window"));
    assert!(link.chain.is_empty());

    let no_source: Vec<_> = output.alerts_for_rule("no_traceable_source").collect();
    assert_eq!(no_source.len(), 1);
    assert_eq!(no_source[0].alert.subject, RecordId::assay("lab", 1));
    assert_eq!(output.summary.trace.unresolved, 1);
}

#[test]
fn test_rejected_rows_surface_as_alerts() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![
                clean_shipment(1, "not a date", "شهرک کاویان", "20000"),
                clean_shipment(2, "1404/10/14", "شهرک کاویان", "0"),
                clean_shipment(3, "1404/10/14", "تهران", "20000"),
                clean_shipment(4, "1404/10/14", "شهرک کاویان", "20000"),
            ],
        )],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    assert_eq!(output.snapshot.shipments.len(), 1);
    assert_eq!(output.rejected.len(), 3);
    let rejected: Vec<_> = output.alerts_for_rule("record_rejected").collect();
    assert_eq!(rejected.len(), 3);
    assert!(rejected.iter().all(|a| a.alert.severity == Severity::Warning));
}

#[test]
fn test_alerts_are_critical_first() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![clean_shipment(1, "1404/10/14", "شهرک کاویان", "40000")],
        )],
        assays: vec![sheet(
            "lab",
            vec![assay(1, "C14041014K2", "6.0"), assay(2, "XX99", "")],
        )],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    let severities: Vec<Severity> = output.alerts.iter().map(|a| a.alert.severity).collect();
    let first_warning = severities
        .iter()
        .position(|s| *s == Severity::Warning)
        .unwrap();
    assert!(severities[..first_warning]
        .iter()
        .all(|s| *s == Severity::Critical));
    assert!(severities[first_warning..]
        .iter()
        .all(|s| *s == Severity::Warning));
    assert_eq!(output.summary.alerts.total_alerts, output.alerts.len());
}

#[test]
fn test_shipment_without_driver_raises_missing_driver() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![row(
                1,
                &[
                    ("تاریخ", "1404/10/14"),
                    ("مقصد", "C"),
                    ("تناژ", "20000"),
                    ("شماره رسید", "R1"),
                ],
            )],
        )],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    let rules: Vec<&str> = output.alerts.iter().map(|a| a.alert.rule.as_str()).collect();
    assert_eq!(rules, vec!["missing_driver"]);
    assert_eq!(output.alerts[0].alert.severity, Severity::Warning);
    assert_eq!(output.alerts[0].alert.subject, RecordId::shipment("trucking", 1));
}

// ==========================================
// 部分追溯 (partial) 场景
// ==========================================

fn run_with_windows(inputs: &RunInputs, transfer_days: u32, shipment_days: u32) -> RunOutput {
    let mut config = load_test_config();
    config.settings.linker.transfer_window_days = transfer_days;
    config.settings.linker.shipment_window_days = shipment_days;
    TraceRun::new(config)
        .unwrap()
        .execute_at(inputs, "window-run".to_string(), fixed_run_ts())
}

fn incomplete_trace_subjects(output: &RunOutput) -> Vec<RecordId> {
    output
        .alerts_for_rule("incomplete_trace")
        .map(|a| a.alert.subject.clone())
        .collect()
}

#[test]
fn test_two_same_day_transfers_are_ambiguous() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![clean_shipment(1, "1404/10/14", "شهرک کاویان", "25000")],
        )],
        transfers: vec![sheet(
            "کاویان",
            vec![
                transfer(1, "1404/10/14", "9000"),
                transfer(2, "1404/10/14", "8000"),
            ],
        )],
        assays: vec![sheet("lab", vec![assay(1, "C14041014K2", "1.1")])],
    };

    let output = run_with_default_config(&inputs);

    let sample = RecordId::assay("lab", 1);
    let link = output.links.get(&sample).unwrap();
    assert_eq!(link.status, LinkStatus::Partial);
    assert_eq!(link.reason.as_deref(), Some("ambiguous transfer match"));
    assert_eq!(link.candidates.len(), 2);
    assert!(link.candidates.contains(&RecordId::transfer("کاویان", 1)));
    assert!(link.candidates.contains(&RecordId::transfer("کاویان", 2)));
    assert!(link.chain.is_empty());

    assert_eq!(incomplete_trace_subjects(&output), vec![sample]);
    assert_eq!(output.summary.trace.partial, 1);
}

#[test]
fn test_transfer_without_shipment_is_partial() {
    let inputs = RunInputs {
        transfers: vec![sheet("کاویان", vec![transfer(1, "1404/10/14", "9000")])],
        assays: vec![sheet("lab", vec![assay(1, "C14041014K2", "1.1")])],
        ..Default::default()
    };

    let output = run_with_default_config(&inputs);

    let sample = RecordId::assay("lab", 1);
    let link = output.links.get(&sample).unwrap();
    assert_eq!(link.status, LinkStatus::Partial);
    assert_eq!(link.reason.as_deref(), Some("no shipment in window"));
    assert_eq!(link.transfer_id(), Some(&RecordId::transfer("کاویان", 1)));
    assert!(link.shipment_id().is_none());
    assert!(link.candidates.is_empty());

    let incomplete: Vec<_> = output.alerts_for_rule("incomplete_trace").collect();
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].alert.subject, sample);
    assert!(incomplete[0].alert.message.contains("no shipment in window"));
}

#[test]
fn test_equidistant_shipments_are_ambiguous() {
    let inputs = RunInputs {
        shipments: vec![sheet(
            "trucking",
            vec![
                clean_shipment(1, "1404/10/13", "شهرک کاویان", "25000"),
                clean_shipment(2, "1404/10/15", "شهرک کاویان", "24000"),
            ],
        )],
        transfers: vec![sheet("کاویان", vec![transfer(1, "1404/10/14", "9000")])],
        assays: vec![sheet("lab", vec![assay(1, "C14041014K2", "1.1")])],
    };

    // 同日窗口内没有运输记录
    let same_day = run_with_default_config(&inputs);
    let link = same_day.links.get(&RecordId::assay("lab", 1)).unwrap();
    assert_eq!(link.reason.as_deref(), Some("no shipment in window"));

    let output = run_with_windows(&inputs, 0, 1);
    let sample = RecordId::assay("lab", 1);
    let link = output.links.get(&sample).unwrap();
    assert_eq!(link.status, LinkStatus::Partial);
    assert_eq!(link.reason.as_deref(), Some("ambiguous shipment match"));
    assert_eq!(link.transfer_id(), Some(&RecordId::transfer("کاویان", 1)));
    assert_eq!(link.candidates.len(), 2);
    assert!(link.candidates.contains(&RecordId::shipment("trucking", 1)));
    assert!(link.candidates.contains(&RecordId::shipment("trucking", 2)));

    assert_eq!(incomplete_trace_subjects(&output), vec![sample]);
}

#[test]
fn test_transfer_window_tie_break() {
    let shipments = vec![sheet(
        "trucking",
        vec![
            clean_shipment(1, "1404/10/13", "شهرک کاویان", "25000"),
            clean_shipment(2, "1404/10/14", "شهرک کاویان", "24000"),
            clean_shipment(3, "1404/10/15", "شهرک کاویان", "23000"),
        ],
    )];
    let sample = RecordId::assay("lab", 1);

    // 前后各差一天 → 同等最优, 报告歧义
    let tied = RunInputs {
        shipments: shipments.clone(),
        transfers: vec![sheet(
            "کاویان",
            vec![
                transfer(1, "1404/10/13", "9000"),
                transfer(2, "1404/10/15", "8000"),
            ],
        )],
        assays: vec![sheet("lab", vec![assay(1, "C14041014K2", "1.1")])],
    };
    let output = run_with_windows(&tied, 1, 0);
    let link = output.links.get(&sample).unwrap();
    assert_eq!(link.status, LinkStatus::Partial);
    assert_eq!(link.reason.as_deref(), Some("ambiguous transfer match"));
    assert_eq!(link.candidates.len(), 2);
    assert_eq!(incomplete_trace_subjects(&output), vec![sample.clone()]);

    // 同日候选优先于相差一天的候选
    let same_day_wins = RunInputs {
        shipments,
        transfers: vec![sheet(
            "کاویان",
            vec![
                transfer(1, "1404/10/14", "9000"),
                transfer(2, "1404/10/15", "8000"),
            ],
        )],
        assays: vec![sheet("lab", vec![assay(1, "C14041014K2", "1.1")])],
    };
    let output = run_with_windows(&same_day_wins, 1, 0);
    let link = output.links.get(&sample).unwrap();
    assert_eq!(link.status, LinkStatus::Resolved);
    assert_eq!(link.transfer_id(), Some(&RecordId::transfer("کاویان", 1)));
    assert_eq!(link.shipment_id(), Some(&RecordId::shipment("trucking", 2)));
    assert_eq!(link.chain[0].day_offset, 0);
    assert!(link.candidates.is_empty());
    assert!(incomplete_trace_subjects(&output).is_empty());
}
