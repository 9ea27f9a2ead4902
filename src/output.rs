use crate::error::PipelineResult;
use crate::table::{Table, Value};
use crate::types::View;
use crate::util::format_number;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table as TextTable, Tabled};

/// Write a table verbatim as CSV with a header row. Nulls are empty cells.
pub fn write_table_csv<P: AsRef<Path>>(path: P, table: &Table) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.column_names())?;
    for row in 0..table.len() {
        wtr.write_record(table.row(row).iter().map(Value::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> PipelineResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

// Numbers get thousands separators; whole numbers (counts, scores) print
// without decimals.
fn display_cell(v: &Value) -> String {
    match v {
        Value::Number(n) if n.fract() == 0.0 => format_number(*n, 0),
        Value::Number(n) => format_number(*n, 2),
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    }
}

/// Markdown rendering of the first `max_rows` rows of a table.
pub fn render_table(table: &Table, max_rows: usize) -> Option<String> {
    if table.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    builder.push_record(table.column_names());
    for row in 0..table.len().min(max_rows) {
        builder.push_record(table.row(row).iter().map(display_cell));
    }
    Some(builder.build().with(Style::markdown()).to_string())
}

pub fn preview_table(table: &Table, max_rows: usize) {
    match render_table(table, max_rows) {
        Some(s) => println!("{}\n", s),
        None => println!("(no rows)\n"),
    }
}

pub fn preview_view(view: &View, max_rows: usize) {
    println!("{}", view.title);
    let y = view.axes.y.as_deref().unwrap_or("-");
    match &view.axes.series {
        Some(series) => println!("(x: {}, y: {}, series: {})\n", view.axes.x, y, series),
        None => println!("(x: {}, y: {})\n", view.axes.x, y),
    }
    preview_table(&view.table, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = TextTable::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::text("channel", vec![Some("ATM".into()), None]),
            Column::number("amount", vec![Some(1234.5), Some(3.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn csv_export_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table_csv(&path, &table()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "channel,amount\nATM,1234.5\n,3\n");
    }

    #[test]
    fn renders_markdown_with_formatted_numbers() {
        let s = render_table(&table(), 10).unwrap();
        assert!(s.lines().next().unwrap().contains("channel"), "{}", s);
        assert!(s.contains("|--"));
        assert!(s.contains("1,234.50"));
        assert!(s.contains("N/A"));
        assert!(render_table(&Table::empty(), 10).is_none());
    }
}
