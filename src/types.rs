use crate::hypothesis::TestResult;
use crate::summary::{ColumnSummary, GroupSummary, NumericSummary, Summary};
use crate::table::Table;
use crate::util::{format_number, format_opt};
use serde::Serialize;
use tabled::Tabled;

/// Every view the catalog can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKey {
    TransactionsOverTime,
    PayrollTrend,
    ChannelDistribution,
    PayrollChannelDistribution,
    AmountHistogram,
    GenderChannelAmounts,
    SmeLoanTrend,
    SmeCreditScoreHistogram,
    SmeRepaymentStatus,
    SmeIndustryRepayment,
    SmeCreditVsLoan,
    Explore,
}

impl ViewKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKey::TransactionsOverTime => "transactions_over_time",
            ViewKey::PayrollTrend => "payroll_trend",
            ViewKey::ChannelDistribution => "channel_distribution",
            ViewKey::PayrollChannelDistribution => "payroll_channel_distribution",
            ViewKey::AmountHistogram => "amount_histogram",
            ViewKey::GenderChannelAmounts => "gender_channel_amounts",
            ViewKey::SmeLoanTrend => "sme_loan_trend",
            ViewKey::SmeCreditScoreHistogram => "sme_credit_score_histogram",
            ViewKey::SmeRepaymentStatus => "sme_repayment_status",
            ViewKey::SmeIndustryRepayment => "sme_industry_repayment",
            ViewKey::SmeCreditVsLoan => "sme_credit_vs_loan",
            ViewKey::Explore => "explore",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ViewKey::TransactionsOverTime => "Total Transactions Over Time",
            ViewKey::PayrollTrend => "Payroll Transaction Amounts Over Time",
            ViewKey::ChannelDistribution => "Transactions by Channel",
            ViewKey::PayrollChannelDistribution => "Payroll Transactions by Channel",
            ViewKey::AmountHistogram => "Transaction Amount Distribution",
            ViewKey::GenderChannelAmounts => "Transaction Amounts by Gender and Channel",
            ViewKey::SmeLoanTrend => "SME Loan Amounts Over Time",
            ViewKey::SmeCreditScoreHistogram => "SME Credit Score Distribution",
            ViewKey::SmeRepaymentStatus => "SME Loan Repayment Status",
            ViewKey::SmeIndustryRepayment => "SME Repayment Status by Industry",
            ViewKey::SmeCreditVsLoan => "SME Credit Score vs Loan Amount",
            ViewKey::Explore => "Data Explorer",
        }
    }
}

/// Which columns of a view feed which visual channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisMapping {
    pub x: String,
    pub y: Option<String>,
    pub series: Option<String>,
}

impl AxisMapping {
    pub fn new(x: &str, y: Option<&str>, series: Option<&str>) -> Self {
        Self {
            x: x.to_string(),
            y: y.map(str::to_string),
            series: series.map(str::to_string),
        }
    }
}

/// A computed view, ready for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub key: ViewKey,
    pub title: String,
    pub table: Table,
    pub axes: AxisMapping,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DescribeRow {
    #[tabled(rename = "Column")]
    pub column: String,
    #[tabled(rename = "Count")]
    pub count: String,
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[tabled(rename = "Std")]
    pub std: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "25%")]
    pub p25: String,
    #[tabled(rename = "50%")]
    pub p50: String,
    #[tabled(rename = "75%")]
    pub p75: String,
    #[tabled(rename = "Max")]
    pub max: String,
}

impl DescribeRow {
    pub fn new(label: String, s: &NumericSummary) -> Self {
        Self {
            column: label,
            count: s.count.to_string(),
            mean: format_opt(s.mean, 2),
            std: format_opt(s.std, 2),
            min: format_opt(s.min, 2),
            p25: format_opt(s.p25, 2),
            p50: format_opt(s.p50, 2),
            p75: format_opt(s.p75, 2),
            max: format_opt(s.max, 2),
        }
    }
}

impl From<&ColumnSummary> for DescribeRow {
    fn from(s: &ColumnSummary) -> Self {
        DescribeRow::new(s.column.clone(), &s.stats)
    }
}

impl From<&GroupSummary> for DescribeRow {
    fn from(s: &GroupSummary) -> Self {
        DescribeRow::new(s.group.to_string(), &s.stats)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TestResultRow {
    #[tabled(rename = "Statistic")]
    pub statistic: String,
    #[tabled(rename = "PValue")]
    pub p_value: String,
    #[tabled(rename = "DF")]
    pub degrees_of_freedom: String,
    #[tabled(rename = "MeanMine")]
    pub mean_left: String,
    #[tabled(rename = "MeanOther")]
    pub mean_right: String,
    #[tabled(rename = "Significant")]
    pub significant: String,
}

impl From<&TestResult> for TestResultRow {
    fn from(r: &TestResult) -> Self {
        Self {
            statistic: format_number(r.statistic, 4),
            p_value: format!("{:.4}", r.p_value),
            degrees_of_freedom: format_number(r.degrees_of_freedom, 2),
            mean_left: format_number(r.left.mean, 2),
            mean_right: format_number(r.right.mean, 2),
            significant: if r.significant { "Yes" } else { "No" }.to_string(),
        }
    }
}

/// Either a computed value or the reason it is missing, as written to
/// `summary.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Value(T),
    Unavailable(String),
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Unavailable(e.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub transactions: Summary,
    pub sme: Summary,
    pub payroll_amounts: Outcome<NumericSummary>,
    pub loan_amounts: Outcome<NumericSummary>,
    pub amount_by_channel: Outcome<Vec<GroupSummary>>,
    pub mine_employee_t_test: Outcome<TestResult>,
}
