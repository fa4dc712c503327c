//! Rendering of command results for the terminal.
//!
//! Results are first turned into a transport-agnostic [`CommandOutput`] and
//! then rendered as plain text or JSON.

use serde_json::{json, Value};

use crate::answer::AnswerView;
use crate::athena::RecordSet;
use crate::chart::{infer_kind, ColumnKind};
use crate::cli::OutputFormat;
use crate::query::ColumnDescription;

/// Output from one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Tabular data with an optional trailing note.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        kinds: Vec<ColumnKind>,
        note: Option<String>,
        json: Value,
    },
    /// Plain lines of text.
    Lines { lines: Vec<String>, json: Value },
    /// Structured data with no useful text form.
    Json(Value),
}

impl CommandOutput {
    /// Query records. Nulls render as `NULL` in text.
    pub fn records(set: &RecordSet) -> Self {
        let kinds = (0..set.columns.len())
            .map(|i| {
                infer_kind(set.records.iter().map(|record| {
                    record
                        .fields()
                        .get(i)
                        .and_then(|(_, value)| value.as_deref())
                        .unwrap_or("")
                }))
            })
            .collect();
        let rows = set
            .records
            .iter()
            .map(|record| {
                record
                    .fields()
                    .iter()
                    .map(|(_, value)| value.clone().unwrap_or_else(|| "NULL".to_string()))
                    .collect()
            })
            .collect();

        let mut note = format!("{} row(s)", set.len());
        if let Some(warning) = set.truncation_warning() {
            note = format!("{note}. {warning}");
        }

        Self::Table {
            headers: set.columns.clone(),
            rows,
            kinds,
            note: Some(note),
            json: json!({
                "columns": set.columns,
                "rows": set.records,
                "truncated": set.was_truncated,
            }),
        }
    }

    pub fn table_names(tables: &[String]) -> Self {
        Self::Lines {
            lines: tables.to_vec(),
            json: json!({ "tables": tables }),
        }
    }

    pub fn columns(table: &str, columns: &[ColumnDescription]) -> Self {
        Self::Table {
            headers: vec!["name".to_string(), "type".to_string(), "comment".to_string()],
            rows: columns
                .iter()
                .map(|c| vec![c.name.clone(), c.data_type.clone(), c.comment.clone()])
                .collect(),
            kinds: vec![ColumnKind::Text; 3],
            note: None,
            json: json!({ "table": table, "columns": columns }),
        }
    }

    pub fn answer(view: &AnswerView) -> Self {
        let mut lines = Vec::new();

        if let Some(sql) = &view.sql {
            lines.push(format!("SQL: {sql}"));
        }
        match &view.table {
            Some(table) => {
                let (headers, kinds): (Vec<String>, Vec<ColumnKind>) = table
                    .columns()
                    .iter()
                    .map(|c| (c.name.clone(), c.kind))
                    .unzip();
                lines.push(format_table(&headers, table.rows(), &kinds));
            }
            None => lines.push("No table found.".to_string()),
        }
        match &view.chart {
            Some(chart) => {
                lines.push(format!(
                    "Chart: {} by {}{}",
                    chart.value_column,
                    chart.label_column,
                    if chart.merged { " (duplicate labels summed)" } else { "" }
                ));
                lines.extend(
                    chart
                        .points
                        .iter()
                        .map(|p| format!("  {}: {}", p.label, p.value)),
                );
            }
            None if view.table.is_some() => {
                lines.push("No numeric column to chart.".to_string());
            }
            None => {}
        }

        Self::Lines {
            lines,
            json: json!({
                "sql": view.sql,
                "table": view.table.as_ref().map(|t| t.to_json()),
                "chart": view.chart,
            }),
        }
    }

    /// Renders for the terminal.
    pub fn render(&self, format: OutputFormat) -> String {
        match (self, format) {
            (Self::Table { json, .. }, OutputFormat::Json)
            | (Self::Lines { json, .. }, OutputFormat::Json)
            | (Self::Json(json), _) => {
                serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
            }
            (
                Self::Table {
                    headers,
                    rows,
                    kinds,
                    note,
                    ..
                },
                OutputFormat::Text,
            ) => {
                let mut out = format_table(headers, rows, kinds);
                if let Some(note) = note {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(note);
                }
                out
            }
            (Self::Lines { lines, .. }, OutputFormat::Text) => lines.join("\n"),
        }
    }
}

/// Lays rows out under their headers with box-drawing rules.
///
/// Numeric columns are right-aligned, header included. Columns without a
/// kind are treated as text. Cells past the last header are dropped.
pub fn format_table(headers: &[String], rows: &[Vec<String>], kinds: &[ColumnKind]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .fold(header.chars().count(), usize::max)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                match kinds.get(i) {
                    Some(ColumnKind::Numeric) => format!("{cell:>width$}"),
                    _ => format!("{cell:<width$}"),
                }
            })
            .collect();
        padded.join(" │ ").trim_end().to_string()
    };

    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(headers));
    lines.push(rule.join("─┼─"));
    lines.extend(rows.iter().map(|row| line(row.as_slice())));
    lines.join("\n")
}
