//! User-driven aggregation behind the data explorer.
//!
//! The chart picked by the user decides how rows are shaped before they are
//! drawn. The mapping is a closed enum, and an [`ExploreRequest`] can only
//! be built when it carries every parameter its semantics need.
use crate::aggregate::{empty_output, group_sum, sum_label};
use crate::error::Condition;
use crate::table::{Column, ColumnKind, Table};
use std::fmt;
use std::str::FromStr;

const VIEW: &str = "explore";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Scatter,
    Line,
    Area,
    Bar,
    Pie,
    Funnel,
    Histogram,
    Box,
    Violin,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        ChartKind::Scatter,
        ChartKind::Line,
        ChartKind::Area,
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Funnel,
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Violin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Funnel => "funnel",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Violin => "violin",
        }
    }

    /// How rows must be shaped for this chart. The cumulative toggle turns
    /// any chart into a running total.
    pub fn semantics(&self, cumulative: bool) -> Semantics {
        if cumulative {
            return Semantics::CumulativeSum;
        }
        match self {
            ChartKind::Scatter
            | ChartKind::Line
            | ChartKind::Histogram
            | ChartKind::Box
            | ChartKind::Violin => Semantics::PointPairs,
            ChartKind::Area | ChartKind::Bar | ChartKind::Pie | ChartKind::Funnel => {
                Semantics::GroupedSum
            }
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        ChartKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ChartKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown chart type '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantics {
    /// Rows pass through as `(x, y)` pairs.
    PointPairs,
    /// Group by `x`, sum `y`.
    GroupedSum,
    /// Group by `x`, sum `y`, then accumulate `y` over ascending `x`.
    CumulativeSum,
}

impl Semantics {
    pub fn requires_y(&self) -> bool {
        !matches!(self, Semantics::PointPairs)
    }

    fn label(&self) -> &'static str {
        match self {
            Semantics::PointPairs => "point pairs",
            Semantics::GroupedSum => "a grouped sum",
            Semantics::CumulativeSum => "a cumulative sum",
        }
    }
}

/// A validated explorer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreRequest {
    x: String,
    y: Option<String>,
    semantics: Semantics,
}

impl ExploreRequest {
    pub fn new(
        x: impl Into<String>,
        y: Option<String>,
        semantics: Semantics,
    ) -> Result<Self, Condition> {
        if semantics.requires_y() && y.is_none() {
            return Err(Condition::MissingParameter {
                parameter: "y".to_string(),
                operation: semantics.label().to_string(),
            });
        }
        Ok(Self {
            x: x.into(),
            y,
            semantics,
        })
    }

    pub fn x(&self) -> &str {
        &self.x
    }

    pub fn y(&self) -> Option<&str> {
        self.y.as_deref()
    }

    pub fn semantics(&self) -> Semantics {
        self.semantics
    }
}

/// Columns the explorer offers as axes.
pub fn numeric_columns(table: &Table) -> Vec<&str> {
    table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Number)
        .map(Column::name)
        .collect()
}

fn lookup<'t>(table: &'t Table, name: &str) -> Result<&'t Column, Condition> {
    table.column(name).ok_or_else(|| Condition::UnknownColumn {
        column: name.to_string(),
    })
}

/// Shape `table` for the request. Column names are checked against the
/// table before anything is computed; only a table without any columns (a
/// missing source) skips the check and yields an empty output.
pub fn explore(table: &Table, request: &ExploreRequest) -> Result<Table, Condition> {
    let x = request.x();
    if table.width() == 0 {
        let names = output_names(request);
        return Ok(empty_output(&names.iter().map(String::as_str).collect::<Vec<_>>()));
    }
    let x_col = lookup(table, x)?;
    let y_col = request.y().map(|y| lookup(table, y)).transpose()?;

    match request.semantics() {
        Semantics::PointPairs => {
            let mut columns = vec![x_col.clone()];
            if let Some(y_col) = y_col.filter(|c| c.name() != x) {
                columns.push(y_col.clone());
            }
            Ok(Table::from_parts(columns))
        }
        Semantics::GroupedSum => group_sum(table, VIEW, x, required_y(y_col)?),
        Semantics::CumulativeSum => {
            let grouped = group_sum(table, VIEW, x, required_y(y_col)?)?;
            let mut columns = grouped.columns().to_vec();
            // The summed column is always last.
            let Some(sums) = columns.pop() else {
                return Ok(grouped);
            };
            let mut running = 0.0;
            let totals: Vec<Option<f64>> = sums
                .numbers()
                .unwrap_or_default()
                .iter()
                .map(|v| {
                    running += v.unwrap_or(0.0);
                    Some(running)
                })
                .collect();
            columns.push(Column::number(sums.name(), totals));
            Ok(Table::from_parts(columns))
        }
    }
}

fn output_names(request: &ExploreRequest) -> Vec<String> {
    let x = request.x();
    match (request.semantics(), request.y()) {
        (Semantics::PointPairs, Some(y)) if y != x => vec![x.to_string(), y.to_string()],
        (Semantics::PointPairs, _) => vec![x.to_string()],
        (_, Some(y)) => vec![x.to_string(), sum_label(x, y)],
        (_, None) => vec![x.to_string()],
    }
}

// Unreachable for requests built through `ExploreRequest::new`.
fn required_y(y: Option<&Column>) -> Result<&str, Condition> {
    y.map(Column::name).ok_or_else(|| Condition::MissingParameter {
        parameter: "y".to_string(),
        operation: "a sum".to_string(),
    })
}
