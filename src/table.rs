//! Column-oriented in-memory table.
//!
//! Tables are built once (by the loader or by an aggregation) and never
//! mutated afterwards; every operator takes `&Table` and returns a new one.
use crate::error::{Condition, PipelineError, PipelineResult};
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell.
///
/// Values are totally ordered (kind first, then value) and hashable so they
/// can key groups and sort deterministically. Numbers use IEEE total order.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Text(_) => 4,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn text(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => n.to_bits().hash(state),
            Value::Timestamp(t) => t.hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Timestamp(t) => {
                if t.num_seconds_from_midnight() == 0 {
                    write!(f, "{}", t.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    Bool,
    Timestamp,
    Text,
}

/// Typed, nullable column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Number(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Number(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Number(_) => ColumnKind::Number,
            ColumnData::Bool(_) => ColumnKind::Bool,
            ColumnData::Timestamp(_) => ColumnKind::Timestamp,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    pub fn value(&self, row: usize) -> Value {
        match self {
            ColumnData::Number(v) => v[row].map(Value::Number).unwrap_or(Value::Null),
            ColumnData::Bool(v) => v[row].map(Value::Bool).unwrap_or(Value::Null),
            ColumnData::Timestamp(v) => v[row].map(Value::Timestamp).unwrap_or(Value::Null),
            ColumnData::Text(v) => v[row].clone().map(Value::Text).unwrap_or(Value::Null),
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Number(v) => ColumnData::Number(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Bool(v) => ColumnData::Bool(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Timestamp(v) => {
                ColumnData::Timestamp(rows.iter().map(|&i| v[i]).collect())
            }
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Build storage of the given kind from loose values. Cells whose kind
    /// does not match become null, except for text columns which take the
    /// rendered form of any non-null value.
    pub fn from_values(kind: ColumnKind, values: Vec<Value>) -> ColumnData {
        match kind {
            ColumnKind::Number => ColumnData::Number(values.iter().map(Value::as_f64).collect()),
            ColumnKind::Bool => ColumnData::Bool(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnKind::Timestamp => ColumnData::Timestamp(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Timestamp(t) => Some(*t),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnKind::Text => ColumnData::Text(
                values
                    .into_iter()
                    .map(|v| match v {
                        Value::Null => None,
                        Value::Text(s) => Some(s),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn number(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Number(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn value(&self, row: usize) -> Value {
        self.data.value(row)
    }

    /// Numeric cells, or `None` when the column is not numeric.
    pub fn numbers(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Non-null numeric cells in row order.
    pub fn present_numbers(&self) -> Option<Vec<f64>> {
        self.numbers().map(|v| v.iter().flatten().copied().collect())
    }
}

/// An immutable, rectangular set of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Zero rows and no columns: what a missing source loads as.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table, checking that every column has the same length and
    /// that names are unique.
    pub fn new(columns: Vec<Column>) -> PipelineResult<Self> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for c in &columns {
            if c.len() != rows {
                return Err(PipelineError::RaggedColumn {
                    column: c.name.clone(),
                    expected: rows,
                    actual: c.len(),
                });
            }
            if !seen.insert(c.name.as_str()) {
                return Err(PipelineError::DuplicateColumn(c.name.clone()));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Assemble output tables whose columns are produced together by an
    /// operator and therefore have equal lengths by construction.
    pub(crate) fn from_parts(columns: Vec<Column>) -> Self {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.len() == rows));
        debug_assert!({
            let mut seen = HashSet::new();
            columns.iter().all(|c| seen.insert(c.name.as_str()))
        });
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column a view depends on, reporting `FeatureUnavailable`
    /// when the dataset does not carry it.
    pub fn require(&self, view: &str, name: &str) -> Result<&Column, Condition> {
        self.column(name)
            .ok_or_else(|| Condition::feature_unavailable(view, name))
    }

    /// Cell at `row` in column `name`; null when the column is missing.
    pub fn value_at(&self, row: usize, name: &str) -> Value {
        self.column(name)
            .map(|c| c.value(row))
            .unwrap_or(Value::Null)
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }

    pub fn select_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data.select(rows)))
            .collect();
        Table {
            columns,
            rows: rows.len(),
        }
    }

    /// Rows where `column == value`. A missing column matches nothing.
    pub fn filter_eq(&self, column: &str, value: &Value) -> Table {
        let rows: Vec<usize> = match self.column(column) {
            Some(c) => (0..self.rows).filter(|&i| c.value(i) == *value).collect(),
            None => Vec::new(),
        };
        self.select_rows(&rows)
    }
}
