//! Descriptive statistics.
use crate::aggregate::{count_values, numeric_column};
use crate::error::Condition;
use crate::schema::SUMMARIZED_CATEGORICALS;
use crate::table::{ColumnKind, Table, Value};
use crate::util::{average, quantile_sorted, sample_std, sort_f64};
use serde::Serialize;
use std::collections::BTreeMap;

/// count, mean, std, min, quartiles and max of one numeric sample.
/// Everything except `count` is `None` when undefined (no values, or a
/// single value for `std`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl NumericSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sorted = sort_f64(values.to_vec());
        Self {
            count: values.len(),
            mean: Some(average(values)),
            std: sample_std(values),
            min: sorted.first().copied(),
            p25: quantile_sorted(&sorted, 0.25),
            p50: quantile_sorted(&sorted, 0.5),
            p75: quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    #[serde(flatten)]
    pub stats: NumericSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: Value,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencySummary {
    pub column: String,
    pub counts: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: Value,
    #[serde(flatten)]
    pub stats: NumericSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub numeric: Vec<ColumnSummary>,
    pub categorical: Vec<FrequencySummary>,
}

impl Summary {
    pub fn numeric(&self, column: &str) -> Option<&NumericSummary> {
        self.numeric
            .iter()
            .find(|s| s.column == column)
            .map(|s| &s.stats)
    }

    pub fn categorical(&self, column: &str) -> Option<&[ValueCount]> {
        self.categorical
            .iter()
            .find(|s| s.column == column)
            .map(|s| s.counts.as_slice())
    }
}

/// Describe every numeric column, and count values of the fixed set of
/// categorical columns (most frequent first). Other columns are ignored.
pub fn describe(table: &Table) -> Summary {
    let numeric = table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Number)
        .map(|c| ColumnSummary {
            column: c.name().to_string(),
            stats: NumericSummary::from_values(&c.present_numbers().unwrap_or_default()),
        })
        .collect();

    let categorical = SUMMARIZED_CATEGORICALS
        .iter()
        .filter_map(|name| table.column(name))
        .map(|c| {
            let mut counts = count_values(c);
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            FrequencySummary {
                column: c.name().to_string(),
                counts: counts
                    .into_iter()
                    .map(|(value, count)| ValueCount { value, count })
                    .collect(),
            }
        })
        .collect();

    Summary {
        numeric,
        categorical,
    }
}

/// Describe a single numeric column.
pub fn describe_column(table: &Table, view: &str, column: &str) -> Result<NumericSummary, Condition> {
    if table.is_empty() {
        return Ok(NumericSummary::default());
    }
    let values = numeric_column(table, view, column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    Ok(NumericSummary::from_values(&present))
}

/// Describe `measure` separately for each non-null value of `group`,
/// ascending by group.
pub fn describe_by(
    table: &Table,
    view: &str,
    group: &str,
    measure: &str,
) -> Result<Vec<GroupSummary>, Condition> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let group_col = table.require(view, group)?;
    let values = numeric_column(table, view, measure)?;

    let mut groups: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
    for (row, v) in values.iter().enumerate() {
        let g = group_col.value(row);
        if g.is_null() {
            continue;
        }
        let sample = groups.entry(g).or_default();
        if let Some(v) = v {
            sample.push(*v);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(group, sample)| GroupSummary {
            group,
            stats: NumericSummary::from_values(&sample),
        })
        .collect())
}
