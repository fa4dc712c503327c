//! Read-only statement gate.
//!
//! Decides whether a caller-supplied SQL string may be sent to the engine.
//! The gate is lexical: it lower-cases the text and looks for forbidden
//! keywords anywhere in it, including inside string literals and comments.
//! A statement such as `SELECT 'drop' AS word` is therefore rejected.
//!
//! Introspection (`SHOW TABLES`, `DESCRIBE`) never passes this gate; callers
//! use the dedicated operations on [`crate::query::QueryExecutor`] instead.

mod parser;

pub use parser::check_strict;

use std::fmt;

/// Keywords that reject a statement when they appear anywhere in its text.
pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "insert", "update", "delete", "create", "drop", "alter", "truncate",
];

/// Outcome of validating a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The statement may run.
    Allowed,
    /// The statement may not run; the reason names the rule that fired.
    Rejected(String),
}

impl Verdict {
    /// Returns true if the statement may run.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns the rejection reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "Allowed"),
            Self::Rejected(reason) => write!(f, "Rejected: {reason}"),
        }
    }
}

/// Applies the lexical read-only gate to a statement.
pub fn validate(sql: &str) -> Verdict {
    let lowered = sql.to_lowercase();

    let found: Vec<&str> = FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .filter(|word| lowered.contains(word))
        .collect();
    if !found.is_empty() {
        return Verdict::Rejected(format!(
            "Only read-only SELECT queries are allowed. Found forbidden keyword(s): {} \
             (forbidden: {})",
            found.join(", "),
            FORBIDDEN_KEYWORDS.join(", ")
        ));
    }

    if !lowered.trim_start().starts_with("select") {
        return Verdict::Rejected(
            "Queries must start with SELECT. Use list_tables or describe_table for introspection."
                .to_string(),
        );
    }

    Verdict::Allowed
}

/// Validator carrying the configured strictness.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementValidator {
    strict: bool,
}

impl StatementValidator {
    /// Creates a validator. With `strict`, statements are also parsed.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Runs the lexical gate and, in strict mode, the parser check.
    ///
    /// Strict mode can only add rejections.
    pub fn validate(&self, sql: &str) -> Verdict {
        let verdict = validate(sql);
        if !verdict.is_allowed() || !self.strict {
            return verdict;
        }
        match check_strict(sql) {
            Ok(()) => Verdict::Allowed,
            Err(reason) => Verdict::Rejected(reason),
        }
    }
}

/// Checks a database or table name before it is interpolated into generated SQL.
pub fn validate_identifier(kind: &str, name: &str) -> Verdict {
    if name.is_empty() {
        return Verdict::Rejected(format!("{kind} name must not be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Verdict::Rejected(format!(
            "{kind} name '{name}' may only contain letters, digits and underscores"
        ));
    }
    Verdict::Allowed
}
