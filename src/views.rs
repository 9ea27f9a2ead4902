//! The catalog of named views over the transaction and SME tables.
//!
//! Each view takes the table it reads as an explicit argument and either
//! returns a [`View`] or the [`Condition`] that kept it from being computed.
use crate::aggregate::{
    cross_tab, empty_output, frequency, histogram, rolling_sum, Measure, Ranking, COUNT,
    ROLLING_WINDOW,
};
use crate::error::Condition;
use crate::explore::{explore, ExploreRequest, Semantics};
use crate::hypothesis::{compare_means, TestResult};
use crate::schema::*;
use crate::summary::{describe, describe_by, describe_column, GroupSummary, NumericSummary};
use crate::table::{Table, Value};
use crate::types::{AxisMapping, SummaryReport, View, ViewKey};
use std::num::NonZeroUsize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub histogram_bins: NonZeroUsize,
    pub rolling_window: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            histogram_bins: NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN),
            rolling_window: ROLLING_WINDOW,
        }
    }
}

fn view(key: ViewKey, table: Table, axes: AxisMapping) -> View {
    debug!("{}: {} rows", key.as_str(), table.len());
    View {
        key,
        title: key.title().to_string(),
        table,
        axes,
    }
}

fn salary() -> Value {
    Value::text(SALARY)
}

pub fn transactions_over_time(table: &Table, opts: &ViewOptions) -> Result<View, Condition> {
    let key = ViewKey::TransactionsOverTime;
    let t = rolling_sum(table, key.as_str(), DATE, AMOUNT, None, opts.rolling_window)?;
    Ok(view(key, t, AxisMapping::new(DATE, Some(AMOUNT), None)))
}

pub fn payroll_trend(table: &Table, opts: &ViewOptions) -> Result<View, Condition> {
    let key = ViewKey::PayrollTrend;
    let salary = salary();
    let t = rolling_sum(
        table,
        key.as_str(),
        DATE,
        AMOUNT,
        Some((CATEGORY, &salary)),
        opts.rolling_window,
    )?;
    Ok(view(key, t, AxisMapping::new(DATE, Some(AMOUNT), None)))
}

/// Ranked, most used channel first.
pub fn channel_distribution(table: &Table) -> Result<View, Condition> {
    let key = ViewKey::ChannelDistribution;
    let t = frequency(table, key.as_str(), CHANNEL, Ranking::Descending)?;
    Ok(view(key, t, AxisMapping::new(CHANNEL, Some(COUNT), None)))
}

/// Ranked, most used channel first.
pub fn payroll_channel_distribution(table: &Table) -> Result<View, Condition> {
    let key = ViewKey::PayrollChannelDistribution;
    let payroll = if table.is_empty() {
        Table::empty()
    } else {
        table.require(key.as_str(), CATEGORY)?;
        table.require(key.as_str(), CHANNEL)?;
        table.filter_eq(CATEGORY, &salary())
    };
    let t = frequency(&payroll, key.as_str(), CHANNEL, Ranking::Descending)?;
    Ok(view(key, t, AxisMapping::new(CHANNEL, Some(COUNT), None)))
}

pub fn amount_histogram(table: &Table, opts: &ViewOptions) -> Result<View, Condition> {
    let key = ViewKey::AmountHistogram;
    let t = histogram(table, key.as_str(), AMOUNT, opts.histogram_bins)?;
    Ok(view(key, t, AxisMapping::new("bin_start", Some(COUNT), None)))
}

pub fn gender_channel_amounts(table: &Table) -> Result<View, Condition> {
    let key = ViewKey::GenderChannelAmounts;
    let t = cross_tab(table, key.as_str(), CHANNEL, GENDER, Measure::Sum(AMOUNT))?;
    Ok(view(key, t, AxisMapping::new(CHANNEL, Some(AMOUNT), Some(GENDER))))
}

/// Amounts of mine employees against everyone else.
pub fn mine_employee_amounts(table: &Table) -> Result<TestResult, Condition> {
    compare_means(
        table,
        "mine_employee_amounts",
        IS_MINE_EMPLOYEE,
        &Value::Bool(true),
        AMOUNT,
    )
}

/// Loan tables do not always carry a `date` column; without one this view
/// is unavailable.
pub fn sme_loan_trend(table: &Table, opts: &ViewOptions) -> Result<View, Condition> {
    let key = ViewKey::SmeLoanTrend;
    if !table.is_empty() && !table.has_column(DATE) {
        return Err(Condition::feature_unavailable(key.as_str(), DATE));
    }
    let t = rolling_sum(table, key.as_str(), DATE, LOAN_AMOUNT, None, opts.rolling_window)?;
    Ok(view(key, t, AxisMapping::new(DATE, Some(LOAN_AMOUNT), None)))
}

pub fn sme_credit_score_histogram(table: &Table, opts: &ViewOptions) -> Result<View, Condition> {
    let key = ViewKey::SmeCreditScoreHistogram;
    let t = histogram(table, key.as_str(), CREDIT_SCORE, opts.histogram_bins)?;
    Ok(view(key, t, AxisMapping::new("bin_start", Some(COUNT), None)))
}

/// Ranked, most common status first.
pub fn sme_repayment_status(table: &Table) -> Result<View, Condition> {
    let key = ViewKey::SmeRepaymentStatus;
    let t = frequency(table, key.as_str(), REPAYMENT_STATUS, Ranking::Descending)?;
    Ok(view(key, t, AxisMapping::new(REPAYMENT_STATUS, Some(COUNT), None)))
}

pub fn sme_industry_repayment(table: &Table) -> Result<View, Condition> {
    let key = ViewKey::SmeIndustryRepayment;
    let t = cross_tab(table, key.as_str(), INDUSTRY, REPAYMENT_STATUS, Measure::Count)?;
    Ok(view(
        key,
        t,
        AxisMapping::new(INDUSTRY, Some(COUNT), Some(REPAYMENT_STATUS)),
    ))
}

/// Scatter points coloured by repayment status, with industry and SME id
/// carried along for hover labels.
pub fn sme_credit_vs_loan(table: &Table) -> Result<View, Condition> {
    let key = ViewKey::SmeCreditVsLoan;
    let names = [CREDIT_SCORE, LOAN_AMOUNT, REPAYMENT_STATUS, INDUSTRY, SME_ID];
    let t = if table.is_empty() {
        empty_output(&names)
    } else {
        let columns = names
            .iter()
            .map(|n| table.require(key.as_str(), n).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Table::from_parts(columns)
    };
    Ok(view(
        key,
        t,
        AxisMapping::new(CREDIT_SCORE, Some(LOAN_AMOUNT), Some(REPAYMENT_STATUS)),
    ))
}

/// Run a user request from the data explorer.
///
/// Raw rows keep `channel` as the series they are coloured by and
/// `customer` as hover data, when the table has them.
pub fn explore_view(table: &Table, request: &ExploreRequest) -> Result<View, Condition> {
    let t = explore(table, request)?;
    let (series, extra): (Option<&str>, &[&str]) = match request.semantics() {
        Semantics::PointPairs => (
            table.has_column(CHANNEL).then_some(CHANNEL),
            &[CHANNEL, CUSTOMER][..],
        ),
        Semantics::GroupedSum | Semantics::CumulativeSum => (None, &[][..]),
    };
    let carried: Vec<_> = extra
        .iter()
        .copied()
        .filter(|name| !t.has_column(name))
        .filter_map(|name| table.column(name))
        .cloned()
        .collect();
    let t = if carried.is_empty() {
        t
    } else {
        let mut columns = t.columns().to_vec();
        columns.extend(carried);
        Table::from_parts(columns)
    };
    Ok(view(
        ViewKey::Explore,
        t,
        AxisMapping::new(request.x(), request.y(), series),
    ))
}

pub fn payroll_amounts(table: &Table) -> Result<NumericSummary, Condition> {
    let name = "payroll_amounts";
    if table.is_empty() {
        return Ok(NumericSummary::default());
    }
    table.require(name, CATEGORY)?;
    describe_column(&table.filter_eq(CATEGORY, &salary()), name, AMOUNT)
}

pub fn loan_amounts(table: &Table) -> Result<NumericSummary, Condition> {
    describe_column(table, "loan_amounts", LOAN_AMOUNT)
}

pub fn amount_by_channel(table: &Table) -> Result<Vec<GroupSummary>, Condition> {
    describe_by(table, "amount_by_channel", CHANNEL, AMOUNT)
}

/// Everything that goes into `summary.json`.
pub fn summary_report(transactions: &Table, sme: &Table) -> SummaryReport {
    SummaryReport {
        transactions: describe(transactions),
        sme: describe(sme),
        payroll_amounts: payroll_amounts(transactions).into(),
        loan_amounts: loan_amounts(sme).into(),
        amount_by_channel: amount_by_channel(transactions).into(),
        mine_employee_t_test: mine_employee_amounts(transactions).into(),
    }
}

pub type CatalogEntry = (ViewKey, Result<View, Condition>);

pub fn transaction_views(table: &Table, opts: &ViewOptions) -> Vec<CatalogEntry> {
    let entries = vec![
        (ViewKey::TransactionsOverTime, transactions_over_time(table, opts)),
        (ViewKey::PayrollTrend, payroll_trend(table, opts)),
        (ViewKey::ChannelDistribution, channel_distribution(table)),
        (
            ViewKey::PayrollChannelDistribution,
            payroll_channel_distribution(table),
        ),
        (ViewKey::AmountHistogram, amount_histogram(table, opts)),
        (ViewKey::GenderChannelAmounts, gender_channel_amounts(table)),
    ];
    log_skipped(&entries);
    entries
}

pub fn sme_views(table: &Table, opts: &ViewOptions) -> Vec<CatalogEntry> {
    let entries = vec![
        (ViewKey::SmeLoanTrend, sme_loan_trend(table, opts)),
        (
            ViewKey::SmeCreditScoreHistogram,
            sme_credit_score_histogram(table, opts),
        ),
        (ViewKey::SmeRepaymentStatus, sme_repayment_status(table)),
        (ViewKey::SmeIndustryRepayment, sme_industry_repayment(table)),
        (ViewKey::SmeCreditVsLoan, sme_credit_vs_loan(table)),
    ];
    log_skipped(&entries);
    entries
}

fn log_skipped(entries: &[CatalogEntry]) {
    for (key, result) in entries {
        if let Err(condition) = result {
            warn!("Skipping {}: {}", key.as_str(), condition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ROLLING_AVG;
    use crate::table::{Column, ColumnData};

    fn loans(with_date: bool) -> Table {
        let text = |v: &[&str]| v.iter().map(|s| Some(s.to_string())).collect();
        let mut columns = vec![
            Column::text("sme_id", text(&["S1", "S2", "S3"])),
            Column::number("loan_amount", vec![Some(1000.0), Some(2500.0), Some(400.0)]),
            Column::number("credit_score", vec![Some(610.0), Some(720.0), Some(680.0)]),
            Column::text("industry", text(&["Retail", "Mining", "Retail"])),
            Column::text("repayment_status", text(&["on-time", "late", "on-time"])),
        ];
        if with_date {
            let d = |day| {
                chrono::NaiveDate::from_ymd_opt(2024, 2, day).and_then(|d| d.and_hms_opt(0, 0, 0))
            };
            columns.push(Column::new(
                "date",
                ColumnData::Timestamp(vec![d(1), d(2), d(2)]),
            ));
        }
        Table::new(columns).unwrap()
    }

    #[test]
    fn loan_views_without_date_degrade_only_the_trend() {
        let t = loans(false);
        let entries = sme_views(&t, &ViewOptions::default());
        for (key, result) in &entries {
            match key {
                ViewKey::SmeLoanTrend => assert_eq!(
                    result.as_ref().unwrap_err(),
                    &Condition::feature_unavailable("sme_loan_trend", "date")
                ),
                _ => assert!(result.is_ok(), "{} failed", key.as_str()),
            }
        }
    }

    #[test]
    fn loan_trend_with_date() {
        let v = sme_loan_trend(&loans(true), &ViewOptions::default()).unwrap();
        assert_eq!(v.table.len(), 2);
        assert_eq!(v.table.value_at(1, "loan_amount"), Value::Number(2900.0));
    }

    #[test]
    fn repayment_status_is_ranked() {
        let v = sme_repayment_status(&loans(false)).unwrap();
        assert_eq!(v.table.row(0), vec![Value::text("on-time"), Value::Number(2.0)]);
        assert_eq!(v.axes.x, "repayment_status");
    }

    #[test]
    fn every_view_is_empty_for_an_empty_table() {
        let empty = Table::empty();
        let opts = ViewOptions::default();
        for (key, result) in transaction_views(&empty, &opts)
            .into_iter()
            .chain(sme_views(&empty, &opts))
        {
            let view = result.unwrap_or_else(|e| panic!("{}: {}", key.as_str(), e));
            assert!(view.table.is_empty());
        }
    }

    #[test]
    fn explorer_adds_channel_series_to_point_pairs() {
        let t = Table::new(vec![
            Column::number("amount", vec![Some(1.0), Some(2.0)]),
            Column::number("balance", vec![Some(10.0), Some(20.0)]),
            Column::text("channel", vec![Some("ATM".into()), Some("USSD".into())]),
        ])
        .unwrap();
        let req =
            ExploreRequest::new("amount", Some("balance".into()), Semantics::PointPairs).unwrap();
        let v = explore_view(&t, &req).unwrap();
        assert_eq!(v.table.column_names(), vec!["amount", "balance", "channel"]);
        assert_eq!(v.axes.series.as_deref(), Some("channel"));
    }

    #[test]
    fn explorer_carries_customer_for_hover() {
        let t = Table::new(vec![
            Column::text("customer", vec![Some("c1".into()), Some("c2".into())]),
            Column::number("amount", vec![Some(1.0), Some(2.0)]),
            Column::text("channel", vec![Some("ATM".into()), Some("USSD".into())]),
        ])
        .unwrap();
        let req = ExploreRequest::new("amount", None, Semantics::PointPairs).unwrap();
        let v = explore_view(&t, &req).unwrap();
        assert_eq!(v.table.column_names(), vec!["amount", "channel", "customer"]);
        assert_eq!(v.table.value_at(1, "customer"), Value::text("c2"));

        // Sums collapse rows, so there is no per-row hover data.
        let req =
            ExploreRequest::new("channel", Some("amount".into()), Semantics::GroupedSum).unwrap();
        let v = explore_view(&t, &req).unwrap();
        assert_eq!(v.table.column_names(), vec!["channel", "amount"]);
    }

    fn daily(amounts: &[f64], category: &str) -> Table {
        let days: Vec<_> = (1..=amounts.len() as u32)
            .map(|d| chrono::NaiveDate::from_ymd_opt(2024, 3, d).and_then(|d| d.and_hms_opt(0, 0, 0)))
            .collect();
        Table::new(vec![
            Column::new("date", ColumnData::Timestamp(days)),
            Column::number("amount", amounts.iter().copied().map(Some).collect()),
            Column::text("category", vec![Some(category.to_string()); amounts.len()]),
        ])
        .unwrap()
    }

    #[test]
    fn trend_rolling_average_starts_at_the_seventh_day() {
        let amounts: Vec<f64> = (1..=8).map(f64::from).collect();
        let opts = ViewOptions::default();
        for v in [
            transactions_over_time(&daily(&amounts, "salary"), &opts).unwrap(),
            payroll_trend(&daily(&amounts, "salary"), &opts).unwrap(),
        ] {
            let avg = v.table.column(ROLLING_AVG).unwrap().numbers().unwrap();
            assert_eq!(avg.len(), 8, "{}", v.key.as_str());
            assert!(avg[..6].iter().all(Option::is_none));
            assert_eq!(avg[6], Some(4.0));
            assert_eq!(avg[7], Some(5.0));
        }
        // Non-salary rows never reach the payroll trend.
        let v = payroll_trend(&daily(&amounts, "fuel"), &opts).unwrap();
        assert!(v.table.is_empty());
    }

    #[test]
    fn summary_report_degrades_per_entry() {
        let tx = Table::new(vec![
            Column::number("amount", vec![Some(100.0), Some(50.0), Some(25.0)]),
            Column::text(
                "category",
                vec![Some("salary".into()), Some("salary".into()), Some("other".into())],
            ),
        ])
        .unwrap();
        let report = summary_report(&tx, &loans(false));
        match &report.payroll_amounts {
            crate::types::Outcome::Value(s) => {
                assert_eq!(s.count, 2);
                assert_eq!(s.mean, Some(75.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        // No channel and no employee flag in this table.
        assert!(matches!(
            report.amount_by_channel,
            crate::types::Outcome::Unavailable(_)
        ));
        assert!(matches!(
            report.mine_employee_t_test,
            crate::types::Outcome::Unavailable(_)
        ));
        assert!(serde_json::to_string(&report).is_ok());
    }
}
