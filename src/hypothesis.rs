//! Welch's two-sample t-test.
use crate::aggregate::numeric_column;
use crate::error::Condition;
use crate::table::{Table, Value};
use crate::util::{average, sample_variance};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided significance level.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    pub n: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    pub significant: bool,
    pub left: SampleStats,
    pub right: SampleStats,
}

/// Welch's unequal-variance t-test, two-sided.
///
/// Both samples need at least 2 observations. When both variances are zero
/// the statistic is 0 (p = 1) for equal means and infinite (p = 0) otherwise.
pub fn welch_t_test(left: &[f64], right: &[f64]) -> Result<TestResult, Condition> {
    let (Some(v1), Some(v2)) = (sample_variance(left), sample_variance(right)) else {
        return Err(Condition::InsufficientSample {
            left: left.len(),
            right: right.len(),
        });
    };
    let (n1, n2) = (left.len() as f64, right.len() as f64);
    let (m1, m2) = (average(left), average(right));
    let (a, b) = (v1 / n1, v2 / n2);
    let se = (a + b).sqrt();

    let (statistic, p_value, df) = if se == 0.0 {
        let df = n1 + n2 - 2.0;
        if m1 == m2 {
            (0.0, 1.0, df)
        } else {
            let t = if m1 > m2 { f64::INFINITY } else { f64::NEG_INFINITY };
            (t, 0.0, df)
        }
    } else {
        let t = (m1 - m2) / se;
        let df = (a + b).powi(2) / (a * a / (n1 - 1.0) + b * b / (n2 - 1.0));
        (t, two_sided_p(t, df), df)
    };

    Ok(TestResult {
        statistic,
        p_value,
        degrees_of_freedom: df,
        significant: p_value < SIGNIFICANCE_LEVEL,
        left: SampleStats { n: left.len(), mean: m1 },
        right: SampleStats { n: right.len(), mean: m2 },
    })
}

// df is strictly positive whenever the standard error is.
fn two_sided_p(t: f64, df: f64) -> f64 {
    StudentsT::new(0.0, 1.0, df)
        .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())))
        .unwrap_or(f64::NAN)
}

/// Compare `measure` between rows where `group == value` (left) and rows
/// where `group` is some other non-null value (right).
pub fn compare_means(
    table: &Table,
    view: &str,
    group: &str,
    value: &Value,
    measure: &str,
) -> Result<TestResult, Condition> {
    if table.is_empty() {
        return Err(Condition::InsufficientSample { left: 0, right: 0 });
    }
    let group_col = table.require(view, group)?;
    let values = numeric_column(table, view, measure)?;

    let mut left = Vec::new();
    let mut right = Vec::new();
    for (row, v) in values.iter().enumerate() {
        let Some(v) = v else {
            continue;
        };
        let g = group_col.value(row);
        if g.is_null() {
            continue;
        }
        if g == *value {
            left.push(*v);
        } else {
            right.push(*v);
        }
    }
    welch_t_test(&left, &right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};

    #[test]
    fn matches_reference_statistic() {
        let r = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
        assert!((r.statistic - (-1.8973665961010275)).abs() < 1e-12);
        assert!((r.degrees_of_freedom - 5.882352941176471).abs() < 1e-9);
        assert!(r.p_value > 0.09 && r.p_value < 0.12, "p = {}", r.p_value);
        assert!(!r.significant);
    }

    #[test]
    fn clear_difference_is_significant() {
        let r = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[11.0, 12.0, 13.0, 14.0, 15.0]).unwrap();
        assert_eq!(r.statistic, -10.0);
        assert_eq!(r.degrees_of_freedom, 8.0);
        assert!(r.p_value < 1e-4);
        assert!(r.significant);
    }

    #[test]
    fn same_mean_samples_are_not_significant() {
        let a: Vec<f64> = (1..=20).map(f64::from).collect();
        let b: Vec<f64> = a.iter().rev().copied().collect();
        let r = welch_t_test(&a, &b).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert!(!r.significant);
    }

    #[test]
    fn tiny_samples_are_insufficient() {
        assert_eq!(
            welch_t_test(&[1.0], &[2.0]).unwrap_err(),
            Condition::InsufficientSample { left: 1, right: 1 }
        );
        assert!(welch_t_test(&[], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn zero_variance_samples() {
        let same = welch_t_test(&[2.0, 2.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_eq!((same.statistic, same.p_value), (0.0, 1.0));
        let apart = welch_t_test(&[1.0, 1.0], &[3.0, 3.0]).unwrap();
        assert_eq!(apart.statistic, f64::NEG_INFINITY);
        assert!(apart.significant);
    }

    #[test]
    fn partitions_by_group_value() {
        let t = Table::new(vec![
            Column::new(
                "is_mine_employee",
                ColumnData::Bool(vec![Some(true), Some(true), Some(false), Some(false), None]),
            ),
            Column::number(
                "amount",
                vec![Some(10.0), Some(12.0), Some(3.0), Some(5.0), Some(99.0)],
            ),
        ])
        .unwrap();
        let r = compare_means(&t, "v", "is_mine_employee", &Value::Bool(true), "amount").unwrap();
        assert_eq!(r.left, SampleStats { n: 2, mean: 11.0 });
        assert_eq!(r.right, SampleStats { n: 2, mean: 4.0 });
    }
}
