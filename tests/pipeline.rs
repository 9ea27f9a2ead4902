use branch_report::error::Condition;
use branch_report::explore::{ChartKind, ExploreRequest};
use branch_report::loader::{load, LoaderOptions};
use branch_report::output::{write_json, write_table_csv};
use branch_report::table::Value;
use branch_report::types::{Outcome, ViewKey};
use branch_report::views::{self, ViewOptions};
use std::path::Path;

const TRANSACTIONS: &str = "\
date,customer,gender,category,channel,amount,is_mine_employee
2024-01-01,c1,F,salary,ATM,1000,True
2024-01-01,c2,M,groceries,POS,50.5,False
2024-01-02,c3,F,salary,Branch,1200,False
2024-01-02,c1,F,fuel,ATM,80,True
not a date,c4,M,salary,ATM,900,True
2024-01-03,c2,M,salary,ATM,1100,False
";

const SME: &str = "\
sme_id,loan_amount,credit_score,industry,repayment_status
S1,50000,710,Mining,Current
S2,12000,640,Retail,Late
S3,30000,580,Retail,Default
S4,45000,690,Mining,Current
";

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn full_report_over_both_datasets() {
    let dir = tempfile::tempdir().unwrap();
    let opts = LoaderOptions::default();
    let (tx, tx_report) = load(&write(dir.path(), "tx.csv", TRANSACTIONS), &opts);
    let (sme, sme_report) = load(&write(dir.path(), "sme.csv", SME), &opts);

    assert!(tx_report.condition.is_none());
    assert_eq!(tx_report.total_rows, 6);
    assert_eq!(tx_report.invalid_dates, 1);
    assert_eq!(sme_report.total_rows, 4);

    let view_opts = ViewOptions::default();
    let tx_views = views::transaction_views(&tx, &view_opts);
    assert_eq!(tx_views.len(), 6);
    assert!(tx_views.iter().all(|(_, r)| r.is_ok()));

    let channels = tx_views
        .iter()
        .find(|(k, _)| *k == ViewKey::ChannelDistribution)
        .and_then(|(_, r)| r.as_ref().ok())
        .unwrap();
    assert_eq!(channels.table.value_at(0, "channel"), Value::text("ATM"));
    assert_eq!(channels.table.value_at(0, "count"), Value::Number(4.0));

    // The loan log has no date column: only the trend is unavailable.
    let sme_views = views::sme_views(&sme, &view_opts);
    for (key, result) in &sme_views {
        match key {
            ViewKey::SmeLoanTrend => assert!(matches!(
                result,
                Err(Condition::FeatureUnavailable { .. })
            )),
            _ => assert!(result.is_ok(), "{:?}", key),
        }
    }

    let report = views::summary_report(&tx, &sme);
    match &report.payroll_amounts {
        Outcome::Value(s) => assert_eq!(s.count, 4),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(report.mine_employee_t_test, Outcome::Value(_)));

    let json_path = dir.path().join("summary.json");
    write_json(&json_path, &report).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert!(json["payroll_amounts"]["value"]["mean"].is_number());
    assert!(json["mine_employee_t_test"]["value"]["p_value"].is_number());
}

#[test]
fn explorer_and_export_write_csv() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _) = load(
        &write(dir.path(), "tx.csv", TRANSACTIONS),
        &LoaderOptions::default(),
    );

    let request = ExploreRequest::new(
        "channel".to_string(),
        Some("amount".to_string()),
        ChartKind::Bar.semantics(false),
    )
    .unwrap();
    let view = views::explore_view(&tx, &request).unwrap();
    assert_eq!(view.table.column_names(), vec!["channel", "amount"]);

    let out = dir.path().join("view_explore.csv");
    write_table_csv(&out, &view.table).unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("channel,amount\n"));

    let export = dir.path().join("transactions_export.csv");
    write_table_csv(&export, &tx).unwrap();
    let lines: Vec<String> = std::fs::read_to_string(&export)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "date,customer,gender,category,channel,amount,is_mine_employee");
    assert!(lines[5].starts_with(",c4,M,salary,ATM,900,True"));
}

#[test]
fn missing_and_empty_sources_degrade() {
    let dir = tempfile::tempdir().unwrap();
    let opts = LoaderOptions::default();

    let missing = dir.path().join("nope.csv");
    let (table, report) = load(&missing.to_string_lossy(), &opts);
    assert!(table.is_empty());
    assert!(matches!(
        report.condition,
        Some(Condition::SourceUnavailable { .. })
    ));

    let (empty, report) = load(&write(dir.path(), "empty.csv", "sme_id,loan_amount\n"), &opts);
    assert!(empty.is_empty());
    assert!(matches!(report.condition, Some(Condition::SourceEmpty { .. })));

    // Every view still renders, just without rows.
    let view_opts = ViewOptions::default();
    for (key, result) in views::transaction_views(&table, &view_opts)
        .into_iter()
        .chain(views::sme_views(&empty, &view_opts))
    {
        let view = result.unwrap_or_else(|c| panic!("{:?}: {}", key, c));
        assert!(view.table.is_empty());
    }
}
