use crate::error::{Condition, PipelineResult};
use crate::schema::DATE;
use crate::table::{Column, ColumnData, Table};
use crate::util::{parse_bool_safe, parse_f64_safe, parse_timestamp_safe};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub http_timeout: Duration,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub origin: String,
    pub total_rows: usize,
    pub columns: usize,
    pub skipped_rows: usize,
    pub invalid_dates: usize,
    pub condition: Option<Condition>,
}

impl LoadReport {
    fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            total_rows: 0,
            columns: 0,
            skipped_rows: 0,
            invalid_dates: 0,
            condition: None,
        }
    }
}

/// A parsed CSV body before any source-level checks.
#[derive(Debug)]
pub struct ParsedTable {
    pub table: Table,
    pub skipped_rows: usize,
    pub invalid_dates: usize,
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load a dataset from a local path or an http(s) URL.
///
/// Never fails: an unreachable or unreadable source yields an empty table
/// with `SourceUnavailable`, a source without data rows an empty table with
/// `SourceEmpty`. Callers keep going with whatever they got.
pub fn load(source: &str, options: &LoaderOptions) -> (Table, LoadReport) {
    let mut report = LoadReport::new(source);
    let parsed = match read_source(source, options) {
        Ok(p) => p,
        Err(e) => {
            let condition = Condition::SourceUnavailable {
                origin: source.to_string(),
                reason: e.to_string(),
            };
            warn!("{}", condition);
            report.condition = Some(condition);
            return (Table::empty(), report);
        }
    };

    report.skipped_rows = parsed.skipped_rows;
    report.invalid_dates = parsed.invalid_dates;
    if parsed.table.is_empty() {
        let condition = Condition::SourceEmpty {
            origin: source.to_string(),
        };
        warn!("{}", condition);
        report.condition = Some(condition);
        return (Table::empty(), report);
    }

    report.total_rows = parsed.table.len();
    report.columns = parsed.table.width();
    info!(
        "Loaded {} rows x {} columns from {} ({} unparseable dates, {} skipped rows)",
        report.total_rows, report.columns, source, report.invalid_dates, report.skipped_rows
    );
    (parsed.table, report)
}

fn read_source(source: &str, options: &LoaderOptions) -> PipelineResult<ParsedTable> {
    if is_remote(source) {
        debug!("Fetching {} (timeout {:?})", source, options.http_timeout);
        let client = reqwest::blocking::Client::builder()
            .timeout(options.http_timeout)
            .build()?;
        let body = client.get(source).send()?.error_for_status()?.bytes()?;
        read_table(body.as_ref())
    } else {
        let file = File::open(source)?;
        read_table(file)
    }
}

/// Parse a CSV body with a header row into a typed table.
///
/// Rows with a different number of fields are tolerated: missing trailing
/// cells are null and extra cells are dropped. Rows the CSV reader cannot
/// decode at all are skipped and counted.
pub fn read_table<R: Read>(reader: R) -> PipelineResult<ParsedTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut skipped_rows = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping record {}: {}", line + 1, e);
                skipped_rows += 1;
                continue;
            }
        };
        for (i, cells) in raw.iter_mut().enumerate() {
            let cell = record
                .get(i)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            cells.push(cell);
        }
    }

    let mut invalid_dates = 0usize;
    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| {
            let data = if name == DATE {
                let (data, invalid) = timestamp_column(&cells);
                invalid_dates += invalid;
                data
            } else {
                infer_column(cells)
            };
            Column::new(name, data)
        })
        .collect();

    Ok(ParsedTable {
        table: Table::new(columns)?,
        skipped_rows,
        invalid_dates,
    })
}

fn timestamp_column(cells: &[Option<String>]) -> (ColumnData, usize) {
    let mut invalid = 0usize;
    let parsed = cells
        .iter()
        .map(|c| {
            let t = parse_timestamp_safe(c.as_deref());
            if c.is_some() && t.is_none() {
                invalid += 1;
            }
            t
        })
        .collect();
    (ColumnData::Timestamp(parsed), invalid)
}

// Boolean beats numeric beats text; a column with no values at all is
// numeric so that it still shows up in `describe` with a zero count.
fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    let present = || cells.iter().flatten();
    if present().next().is_some() && present().all(|s| parse_bool_safe(Some(s.as_str())).is_some()) {
        return ColumnData::Bool(cells.iter().map(|c| parse_bool_safe(c.as_deref())).collect());
    }
    if present().all(|s| parse_f64_safe(Some(s.as_str())).is_some()) {
        return ColumnData::Number(cells.iter().map(|c| parse_f64_safe(c.as_deref())).collect());
    }
    ColumnData::Text(cells)
}
