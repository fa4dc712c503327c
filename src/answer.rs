//! Display view of an assistant answer.
//!
//! Pulls the SQL that was run, any table, and a chart selection out of one
//! answer string so a front end can render them side by side.

use crate::chart::{extract_table, select_columns, ChartSelection, ExtractedTable};

/// Everything a front end shows for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerView {
    /// Body of the first ```` ```sql ```` block, if any.
    pub sql: Option<String>,
    pub table: Option<ExtractedTable>,
    /// Present only when a table with a numeric column was found.
    pub chart: Option<ChartSelection>,
}

impl AnswerView {
    /// Parses an answer, using the preferred chart columns where they fit.
    pub fn parse(
        text: &str,
        preferred_label: Option<&str>,
        preferred_value: Option<&str>,
    ) -> Self {
        let sql = extract_sql_block(text);
        let table = extract_table(text);
        let chart = table
            .as_ref()
            .and_then(|t| select_columns(t, preferred_label, preferred_value));

        Self { sql, table, chart }
    }
}

/// Extracts the body of the first ```` ```sql ```` block.
///
/// The language tag is matched case-insensitively. Empty blocks count as none.
pub fn extract_sql_block(text: &str) -> Option<String> {
    const FENCE: &str = "```";

    let mut rest = text;
    while let Some(start) = rest.find(FENCE) {
        let after_fence = &rest[start + FENCE.len()..];
        let is_sql = after_fence
            .get(..3)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("sql"))
            && after_fence[3..].starts_with(char::is_whitespace);

        if is_sql {
            let body = &after_fence[3..];
            let end = body.find(FENCE)?;
            let sql = body[..end].trim();
            return (!sql.is_empty()).then(|| sql.to_string());
        }

        // Skip over this block entirely so its closing fence is not taken as an opener.
        let close = after_fence.find(FENCE)?;
        rest = &after_fence[close + FENCE.len()..];
    }

    None
}
