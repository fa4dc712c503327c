//! Recovers a table from free-form answer text.
//!
//! Two independent strategies, tried in order by [`extract_table`]:
//! a markdown table, then a numbered list of `N. label (1,234 unit` lines.

use std::sync::OnceLock;

use regex::Regex;

use super::table::ExtractedTable;

/// Returns the first table found in `text`, markdown tables first.
pub fn extract_table(text: &str) -> Option<ExtractedTable> {
    extract_markdown_table(text).or_else(|| extract_numbered_list(text))
}

/// Parses the first markdown table in `text`.
///
/// Tables with leading pipes are found first. Otherwise a pipe-less GitHub
/// table is accepted: a line with a `|` directly followed by a delimiter row.
pub fn extract_markdown_table(text: &str) -> Option<ExtractedTable> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let span = leading_pipe_span(&lines).or_else(|| pipeless_span(&lines))?;
    let mut table_lines = lines[span.0..span.1].iter().map(|line| split_row(line));

    let header = table_lines.next()?;
    let rows: Vec<Vec<String>> = table_lines
        .filter(|cells| !is_separator(cells))
        .filter(|cells| cells.len() == header.len())
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(ExtractedTable::new(header, rows))
}

/// Parses lines such as `1. Rakuten Card (998,080,550 transactions)` into a
/// `label`/`value` table. Other lines are skipped.
pub fn extract_numbered_list(text: &str) -> Option<ExtractedTable> {
    let pattern = numbered_line();

    let rows: Vec<Vec<String>> = text
        .lines()
        .filter_map(|line| {
            let captures = pattern.captures(line)?;
            let label = captures.get(1)?.as_str().trim();
            let digits: String = captures.get(2)?.as_str().replace(',', "");
            // Values too large for i64 are skipped like any other non-match.
            let value: i64 = digits.parse().ok()?;
            Some(vec![label.to_string(), value.to_string()])
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(ExtractedTable::new(
        vec!["label".to_string(), "value".to_string()],
        rows,
    ))
}

fn numbered_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*\d+\.\s*([^(]+?)\s*\(([\d,]+)\s+\w+").expect("pattern is a valid regex")
    })
}

/// Header index and end (exclusive) of a table whose rows start with `|`.
fn leading_pipe_span(lines: &[&str]) -> Option<(usize, usize)> {
    let start = lines.windows(2).position(|pair| {
        pair[0].starts_with('|') && pair[0][1..].contains('|') && pair[1].starts_with('|')
    })?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| !line.starts_with('|'))
        .map_or(lines.len(), |offset| start + 1 + offset);
    Some((start, end))
}

/// Header index and end (exclusive) of a table without leading pipes.
fn pipeless_span(lines: &[&str]) -> Option<(usize, usize)> {
    let start = lines
        .windows(2)
        .position(|pair| pair[0].contains('|') && is_delimiter_row(pair[1]))?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| !line.contains('|'))
        .map_or(lines.len(), |offset| start + 1 + offset);
    Some((start, end))
}

/// A GitHub delimiter row such as `--- | :---:`.
fn is_delimiter_row(line: &str) -> bool {
    if !line.contains('-') {
        return false;
    }
    let cells = split_row(line);
    cells.iter().all(|c| !c.is_empty()) && is_separator(&cells)
}

fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// True when every non-empty cell is made of `-` and `:` only.
fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .filter(|c| !c.is_empty())
        .all(|c| c.chars().all(|ch| ch == '-' || ch == ':'))
}
