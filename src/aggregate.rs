//! Aggregation operators.
//!
//! Every operator is a pure function of an input table. A table with zero
//! rows short-circuits to an empty output before any column is looked up, so
//! a missing source degrades to empty views instead of `FeatureUnavailable`.
//! Group orders are deterministic: grouped outputs are sorted by key, and
//! frequency tables state their order through [`Ranking`].
use crate::error::Condition;
use crate::table::{Column, ColumnData, ColumnKind, Table, Value};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;

/// Trailing window, in date buckets, of the rolling average.
pub const ROLLING_WINDOW: usize = 7;

pub const COUNT: &str = "count";
pub const ROLLING_AVG: &str = "rolling_avg";

/// Order of a frequency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Highest count first; ties keep discovery order.
    Descending,
    /// Order in which values first appear in the input.
    Discovery,
}

/// What a cross tabulation aggregates per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure<'a> {
    Sum(&'a str),
    Count,
}

impl Measure<'_> {
    pub fn label(&self) -> &str {
        match self {
            Measure::Sum(column) => *column,
            Measure::Count => COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Zero-row table with the given column names.
pub(crate) fn empty_output(names: &[&str]) -> Table {
    Table::from_parts(
        names
            .iter()
            .map(|n| Column::new(*n, ColumnData::Number(Vec::new())))
            .collect(),
    )
}

pub(crate) fn numeric_column<'t>(
    table: &'t Table,
    view: &str,
    name: &str,
) -> Result<&'t [Option<f64>], Condition> {
    table
        .require(view, name)?
        .numbers()
        .ok_or_else(|| Condition::NotNumeric {
            column: name.to_string(),
        })
}

fn key_column(name: &str, kind: ColumnKind, keys: Vec<Value>) -> Column {
    Column::new(name, ColumnData::from_values(kind, keys))
}

/// Name of the summed column in a [`group_sum`] output. Grouping a column
/// by itself sums into `sum_<measure>` so the two names stay distinct.
pub fn sum_label(key: &str, measure: &str) -> String {
    if key == measure {
        format!("sum_{}", measure)
    } else {
        measure.to_string()
    }
}

/// Group by `key` and sum `measure` per group, ascending by key.
/// Output columns: `key`, [`sum_label`].
///
/// Rows with a null key are dropped; null measures add nothing, so a group
/// whose measures are all null still appears with a sum of zero.
pub fn group_sum(table: &Table, view: &str, key: &str, measure: &str) -> Result<Table, Condition> {
    let label = sum_label(key, measure);
    if table.is_empty() {
        return Ok(empty_output(&[key, &label]));
    }
    let key_col = table.require(view, key)?;
    let values = numeric_column(table, view, measure)?;

    let mut sums: BTreeMap<Value, f64> = BTreeMap::new();
    for (row, v) in values.iter().enumerate() {
        let k = key_col.value(row);
        if k.is_null() {
            continue;
        }
        *sums.entry(k).or_insert(0.0) += v.unwrap_or(0.0);
    }

    let (keys, totals): (Vec<Value>, Vec<Option<f64>>) =
        sums.into_iter().map(|(k, s)| (k, Some(s))).unzip();
    Ok(Table::from_parts(vec![
        key_column(key, key_col.kind(), keys),
        Column::number(label, totals),
    ]))
}

/// Trailing mean over `window` consecutive values. The first `window - 1`
/// positions have no average.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Per-date sums of `measure` with a trailing rolling average.
///
/// `filter` keeps only rows where the given column equals the given value
/// (payroll is `category == "salary"`). Dates without rows produce no point.
/// Output columns: `key`, `measure`, `rolling_avg`.
pub fn rolling_sum(
    table: &Table,
    view: &str,
    key: &str,
    measure: &str,
    filter: Option<(&str, &Value)>,
    window: usize,
) -> Result<Table, Condition> {
    if table.is_empty() {
        return Ok(empty_output(&[key, measure, ROLLING_AVG]));
    }
    let filtered;
    let base = match filter {
        Some((column, value)) => {
            table.require(view, column)?;
            filtered = table.filter_eq(column, value);
            &filtered
        }
        None => table,
    };
    if base.is_empty() {
        // Still check the columns so a dataset without them is reported.
        table.require(view, key)?;
        numeric_column(table, view, measure)?;
        return Ok(empty_output(&[key, measure, ROLLING_AVG]));
    }

    let grouped = group_sum(base, view, key, measure)?;
    let sums: Vec<f64> = grouped
        .columns()
        .last()
        .and_then(Column::present_numbers)
        .unwrap_or_default();
    let rolling = rolling_mean(&sums, window);

    let mut columns = grouped.columns().to_vec();
    columns.push(Column::number(ROLLING_AVG, rolling));
    Ok(Table::from_parts(columns))
}

/// Count rows per distinct non-null value of `column`.
/// Output columns: `column`, `count`.
pub fn frequency(
    table: &Table,
    view: &str,
    column: &str,
    ranking: Ranking,
) -> Result<Table, Condition> {
    if table.is_empty() {
        return Ok(empty_output(&[column, COUNT]));
    }
    let col = table.require(view, column)?;
    let mut counts = count_values(col);
    if ranking == Ranking::Descending {
        counts.sort_by(|a, b| b.1.cmp(&a.1));
    }
    let (keys, n): (Vec<Value>, Vec<Option<f64>>) = counts
        .into_iter()
        .map(|(k, c)| (k, Some(c as f64)))
        .unzip();
    Ok(Table::from_parts(vec![
        key_column(column, col.kind(), keys),
        Column::number(COUNT, n),
    ]))
}

/// Distinct non-null values with their counts, in discovery order.
pub(crate) fn count_values(column: &Column) -> Vec<(Value, usize)> {
    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for row in 0..column.len() {
        let v = column.value(row);
        if v.is_null() {
            continue;
        }
        match index.get(&v) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(v.clone(), counts.len());
                counts.push((v, 1));
            }
        }
    }
    counts
}

/// Equal-width bins over `[min, max]`.
///
/// Bins are closed-open `[lower, upper)` except the last, which also holds
/// the maximum. A value sitting on a shared edge goes to the bin that edge
/// opens. When every value is the same the range widens by 0.5 each side.
pub fn histogram_bins(values: &[f64], bins: NonZeroUsize) -> Vec<HistogramBin> {
    let n = bins.get();
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }
    let (mut lo, mut hi) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    // Scaled before subtracting: `hi - lo` overflows on extreme finite ranges.
    let width = hi / n as f64 - lo / n as f64;
    let edges: Vec<f64> = (0..=n)
        .map(|k| if k == n { hi } else { lo + width * k as f64 })
        .collect();

    let mut counts = vec![0usize; n];
    for v in finite {
        if v >= hi {
            counts[n - 1] += 1;
            continue;
        }
        let mut idx = (((v - lo) / width).floor() as usize).min(n - 1);
        if idx > 0 && v < edges[idx] {
            idx -= 1;
        } else if idx + 1 < n && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: edges[i],
            upper: edges[i + 1],
            count,
        })
        .collect()
}

/// Histogram of a numeric column. Output columns: `bin_start`, `bin_end`,
/// `count`.
pub fn histogram(
    table: &Table,
    view: &str,
    column: &str,
    bins: NonZeroUsize,
) -> Result<Table, Condition> {
    if table.is_empty() {
        return Ok(empty_output(&["bin_start", "bin_end", COUNT]));
    }
    let values = numeric_column(table, view, column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let result = histogram_bins(&present, bins);
    Ok(Table::from_parts(vec![
        Column::number("bin_start", result.iter().map(|b| Some(b.lower)).collect()),
        Column::number("bin_end", result.iter().map(|b| Some(b.upper)).collect()),
        Column::number(COUNT, result.iter().map(|b| Some(b.count as f64)).collect()),
    ]))
}

/// Long-format cross tabulation of two categorical columns.
///
/// Only combinations present in the data appear, ordered by `(dim1, dim2)`.
/// Rows with a null in either dimension are dropped.
pub fn cross_tab(
    table: &Table,
    view: &str,
    dim1: &str,
    dim2: &str,
    measure: Measure<'_>,
) -> Result<Table, Condition> {
    if table.is_empty() {
        return Ok(empty_output(&[dim1, dim2, measure.label()]));
    }
    let c1 = table.require(view, dim1)?;
    let c2 = table.require(view, dim2)?;
    let values = match measure {
        Measure::Sum(column) => Some(numeric_column(table, view, column)?),
        Measure::Count => None,
    };

    let mut cells: BTreeMap<(Value, Value), f64> = BTreeMap::new();
    for row in 0..table.len() {
        let (a, b) = (c1.value(row), c2.value(row));
        if a.is_null() || b.is_null() {
            continue;
        }
        let add = match values {
            Some(v) => v[row].unwrap_or(0.0),
            None => 1.0,
        };
        *cells.entry((a, b)).or_insert(0.0) += add;
    }

    let mut k1 = Vec::with_capacity(cells.len());
    let mut k2 = Vec::with_capacity(cells.len());
    let mut m = Vec::with_capacity(cells.len());
    for ((a, b), v) in cells {
        k1.push(a);
        k2.push(b);
        m.push(Some(v));
    }
    Ok(Table::from_parts(vec![
        key_column(dim1, c1.kind(), k1),
        key_column(dim2, c2.kind(), k2),
        Column::number(measure.label(), m),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 1, d).and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    fn text(v: &[Option<&str>]) -> Vec<Option<String>> {
        v.iter().map(|s| s.map(str::to_string)).collect()
    }

    fn transactions() -> Table {
        Table::new(vec![
            Column::new(
                "date",
                ColumnData::Timestamp(vec![day(2), day(1), day(2), None, day(3)]),
            ),
            Column::number(
                "amount",
                vec![Some(10.0), Some(5.0), Some(2.5), Some(100.0), None],
            ),
            Column::text(
                "channel",
                text(&[Some("ATM"), Some("Mobile"), Some("ATM"), Some("USSD"), None]),
            ),
            Column::text(
                "gender",
                text(&[Some("F"), Some("M"), Some("M"), Some("F"), Some("F")]),
            ),
        ])
        .unwrap()
    }

    fn numbers(table: &Table, name: &str) -> Vec<Option<f64>> {
        table.column(name).unwrap().numbers().unwrap().to_vec()
    }

    #[test]
    fn group_sum_conserves_mass_over_non_null_keys() {
        let t = transactions();
        let g = group_sum(&t, "test", "date", "amount").unwrap();
        let grouped: f64 = numbers(&g, "amount").iter().flatten().sum();
        // The null-date row (100.0) is excluded, the null amount adds nothing.
        assert_eq!(grouped, 17.5);
        assert_eq!(g.len(), 3);
        assert_eq!(g.value_at(0, "date"), Value::Timestamp(day(1).unwrap()));
        assert_eq!(numbers(&g, "amount"), vec![Some(5.0), Some(12.5), Some(0.0)]);
    }

    #[test]
    fn group_sum_rejects_text_measure() {
        let err = group_sum(&transactions(), "test", "date", "channel").unwrap_err();
        assert_eq!(
            err,
            Condition::NotNumeric {
                column: "channel".into()
            }
        );
    }

    #[test]
    fn rolling_mean_leaves_first_points_undefined() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let r = rolling_mean(&values, ROLLING_WINDOW);
        assert!(r[..6].iter().all(Option::is_none));
        assert_eq!(r[6], Some(4.0));
        assert_eq!(r[8], Some(6.0));
    }

    #[test]
    fn rolling_sum_filters_before_grouping() {
        let t = transactions();
        let atm = Value::text("ATM");
        let r = rolling_sum(&t, "test", "date", "amount", Some(("channel", &atm)), 2).unwrap();
        assert_eq!(r.column_names(), vec!["date", "amount", ROLLING_AVG]);
        assert_eq!(r.len(), 1);
        assert_eq!(numbers(&r, "amount"), vec![Some(12.5)]);
        assert_eq!(numbers(&r, ROLLING_AVG), vec![None]);
    }

    #[test]
    fn rolling_sum_without_date_is_unavailable() {
        let t = Table::new(vec![Column::number("amount", vec![Some(1.0)])]).unwrap();
        let err = rolling_sum(&t, "trend", "date", "amount", None, ROLLING_WINDOW).unwrap_err();
        assert_eq!(err, Condition::feature_unavailable("trend", "date"));
    }

    #[test]
    fn frequency_orders_per_ranking() {
        let t = transactions();
        let discovery = frequency(&t, "test", "gender", Ranking::Discovery).unwrap();
        assert_eq!(discovery.value_at(0, "gender"), Value::text("F"));
        let ranked = frequency(&t, "test", "channel", Ranking::Descending).unwrap();
        assert_eq!(ranked.value_at(0, "channel"), Value::text("ATM"));
        assert_eq!(numbers(&ranked, COUNT), vec![Some(2.0), Some(1.0), Some(1.0)]);
        // Ties keep discovery order: Mobile appears before USSD.
        assert_eq!(ranked.value_at(1, "channel"), Value::text("Mobile"));
    }

    #[test]
    fn histogram_counts_every_value_and_puts_max_last() {
        let values = [0.0, 1.0, 2.0, 2.5, 5.0, 7.5, 10.0];
        let bins = histogram_bins(&values, NonZeroUsize::new(4).unwrap());
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        // 2.5 and 5.0 and 7.5 sit on edges and open the next bin.
        assert_eq!(
            bins.iter().map(|b| b.count).collect::<Vec<_>>(),
            vec![3, 1, 1, 2]
        );
        assert_eq!(bins[3].upper, 10.0);
    }

    #[test]
    fn histogram_survives_ranges_wider_than_f64_max() {
        let bins = histogram_bins(&[-1e308, 0.0, 1e308], NonZeroUsize::new(4).unwrap());
        assert!(bins.iter().all(|b| b.lower.is_finite() && b.upper.is_finite()));
        assert_eq!(bins[0].lower, -1e308);
        assert_eq!(bins[3].upper, 1e308);
        assert_eq!(
            bins.iter().map(|b| b.count).collect::<Vec<_>>(),
            vec![1, 0, 1, 1]
        );
    }

    #[test]
    fn group_sum_of_a_column_by_itself_keeps_names_distinct() {
        let t = Table::new(vec![Column::number(
            "amount",
            vec![Some(5.0), Some(5.0), Some(3.0)],
        )])
        .unwrap();
        let g = group_sum(&t, "test", "amount", "amount").unwrap();
        assert_eq!(g.column_names(), vec!["amount", "sum_amount"]);
        assert_eq!(numbers(&g, "sum_amount"), vec![Some(3.0), Some(10.0)]);
    }

    #[test]
    fn histogram_of_constant_values_widens_range() {
        let bins = histogram_bins(&[3.0, 3.0], NonZeroUsize::new(2).unwrap());
        assert_eq!(bins[0].lower, 2.5);
        assert_eq!(bins[1].upper, 3.5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn cross_tab_only_emits_observed_pairs() {
        let t = transactions();
        let ct = cross_tab(&t, "test", "gender", "channel", Measure::Sum("amount")).unwrap();
        assert_eq!(ct.len(), 4);
        assert_eq!(ct.row(0), vec![Value::text("F"), Value::text("ATM"), Value::Number(10.0)]);
        assert_eq!(ct.row(1), vec![Value::text("F"), Value::text("USSD"), Value::Number(100.0)]);
        let counts = cross_tab(&t, "test", "gender", "channel", Measure::Count).unwrap();
        assert_eq!(counts.column_names(), vec!["gender", "channel", COUNT]);
    }

    #[test]
    fn empty_table_yields_empty_outputs() {
        let t = Table::empty();
        let n = NonZeroUsize::new(10).unwrap();
        assert!(group_sum(&t, "v", "date", "amount").unwrap().is_empty());
        assert!(rolling_sum(&t, "v", "date", "amount", None, 7).unwrap().is_empty());
        assert!(frequency(&t, "v", "channel", Ranking::Descending).unwrap().is_empty());
        assert!(histogram(&t, "v", "amount", n).unwrap().is_empty());
        assert!(cross_tab(&t, "v", "a", "b", Measure::Count).unwrap().is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let t = transactions();
        let a = cross_tab(&t, "v", "gender", "channel", Measure::Sum("amount")).unwrap();
        let b = cross_tab(&t, "v", "gender", "channel", Measure::Sum("amount")).unwrap();
        assert_eq!(a, b);
        let a = frequency(&t, "v", "channel", Ranking::Descending).unwrap();
        let b = frequency(&t, "v", "channel", Ranking::Descending).unwrap();
        assert_eq!(a, b);
    }
}
