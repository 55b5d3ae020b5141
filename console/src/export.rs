//! Export writers: render a full result set as CSV, aligned text table, or
//! JSON, and append it to the session's results log.

use crate::error::{ConsoleError, Result};
use crate::table::{build_table, flatten_record, render_scalar};
use chrono::Local;
use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// The output log view exports also stream into.
pub trait OutputSink: Send + Sync {
    fn append_line(&self, line: &str);
}

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Table,
    Json,
}

impl ExportFormat {
    /// Parse a configured format name; anything unrecognized falls back to
    /// JSON, matching the historical default arm.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "csv" => ExportFormat::Csv,
            "table" => ExportFormat::Table,
            _ => ExportFormat::Json,
        }
    }

    /// Results-file extension; table output is plain text
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Table => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// Render a result set in the given format. `pretty_json` only affects the
/// JSON format.
pub fn render_rows(format: ExportFormat, rows: &[JsonValue], pretty_json: bool) -> Result<String> {
    match format {
        ExportFormat::Csv => render_csv(rows),
        ExportFormat::Table => render_table(rows),
        ExportFormat::Json => render_json(rows, pretty_json),
    }
}

/// RFC-4180-style CSV with a header row. Cells are quoted only when they
/// contain a comma, quote, or newline; embedded quotes are doubled.
fn render_csv(rows: &[JsonValue]) -> Result<String> {
    let table = build_table(rows)?;
    let mut output = String::new();

    let header: Vec<String> = table.headers.iter().map(|h| csv_escape(h)).collect();
    output.push_str(&header.join(","));
    output.push('\n');

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| {
                if cell.is_null() {
                    String::new()
                } else {
                    csv_escape(&render_scalar(cell))
                }
            })
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    Ok(output)
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Fixed-width box-drawing table, one column per flattened header.
fn render_table(rows: &[JsonValue]) -> Result<String> {
    let table = build_table(rows)?;

    let string_rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(render_scalar).collect())
        .collect();

    let mut col_widths: Vec<usize> = table.headers.iter().map(|h| h.len()).collect();
    for row in &string_rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.len());
        }
    }

    let border = |left: char, mid: char, right: char| {
        let mut line = String::new();
        line.push(left);
        for (idx, width) in col_widths.iter().enumerate() {
            line.push_str(&"─".repeat(width + 2));
            line.push(if idx == col_widths.len() - 1 { right } else { mid });
        }
        line.push('\n');
        line
    };

    let render_line = |cells: &[String]| {
        let mut line = String::new();
        line.push('│');
        for (i, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(&format!("{:width$}", cell, width = col_widths[i]));
            line.push(' ');
            line.push('│');
        }
        line.push('\n');
        line
    };

    let mut output = String::new();
    output.push_str(&border('┌', '┬', '┐'));
    output.push_str(&render_line(&table.headers));
    output.push_str(&border('├', '┼', '┤'));
    for row in &string_rows {
        output.push_str(&render_line(row));
    }
    output.push_str(&border('└', '┴', '┘'));
    let row_label = if string_rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!("({} {})\n", string_rows.len(), row_label));

    Ok(output)
}

/// Valid JSON array of flattened row objects.
fn render_json(rows: &[JsonValue], pretty: bool) -> Result<String> {
    let flattened: Vec<JsonValue> = rows
        .iter()
        .map(|row| {
            let mut map = serde_json::Map::new();
            for (key, value) in flatten_record(row).into_pairs() {
                map.insert(key, value);
            }
            JsonValue::Object(map)
        })
        .collect();
    let rendered = if pretty {
        serde_json::to_string_pretty(&flattened)
    } else {
        serde_json::to_string(&flattened)
    };
    rendered.map_err(|e| ConsoleError::Export(e.to_string()))
}

/// Results-file path for one export:
/// `<root>/logs/results/query-results-<date>-<time>-<suffix>.<ext>`
pub fn results_file_name(root: &Path, format: ExportFormat) -> Result<PathBuf> {
    let dir = root.join("logs").join("results");
    std::fs::create_dir_all(&dir)
        .map_err(|e| ConsoleError::Export(format!("could not create {}: {}", dir.display(), e)))?;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let file_name = format!("query-results-{}-{}.{}", stamp, suffix, format.extension());
    Ok(dir.join(file_name))
}

/// Render `rows` and write them to the results log and the output view.
///
/// Returns the results-file path when a project root gave us somewhere to
/// put one; output-view streaming happens either way.
pub fn write_results(
    project_root: Option<&Path>,
    format: ExportFormat,
    pretty_json: bool,
    job_id: &str,
    rows: &[JsonValue],
    sink: &dyn OutputSink,
) -> Result<Option<PathBuf>> {
    let rendered = render_rows(format, rows, pretty_json)?;

    sink.append_line(&format!("Results for job {}:", job_id));
    for line in rendered.lines() {
        sink.append_line(line);
    }

    let Some(root) = project_root else {
        debug!("[EXPORT] No project root; results not written to disk");
        return Ok(None);
    };

    let path = results_file_name(root, format)?;
    std::fs::write(&path, rendered.as_bytes())
        .map_err(|e| ConsoleError::Export(format!("could not write {}: {}", path.display(), e)))?;
    info!("[EXPORT] Wrote {} rows to {}", rows.len(), path.display());
    Ok(Some(path))
}

/// Dry-run summary lines for the output view.
pub fn write_dry_run_summary(sink: &dyn OutputSink, job_id: &str, total_bytes_processed: &str) {
    sink.append_line(&format!("Results for job {} (dry run):", job_id));
    sink.append_line(&format!("Total bytes processed: {}", total_bytes_processed));
    sink.append_line("");
}
