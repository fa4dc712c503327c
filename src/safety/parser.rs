//! Parser-backed check used in strict validation mode.
//!
//! Uses sqlparser-rs with the generic dialect. Anything that does not parse,
//! or parses to something other than a single plain query, is rejected.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Parses `sql` and returns a rejection reason if it is not one read-only query.
pub fn check_strict(sql: &str) -> Result<(), String> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| format!("Could not parse SQL in strict mode: {e}"))?;

    match statements.as_slice() {
        [] => Err("Empty SQL statement".to_string()),
        [Statement::Query(query)] => check_query(query),
        [_] => Err("Only a single SELECT query is allowed".to_string()),
        _ => Err(format!(
            "Only a single statement is allowed, found {}",
            statements.len()
        )),
    }
}

/// Walks a query, including its CTEs, looking for writes.
fn check_query(query: &Query) -> Result<(), String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_query(&cte.query)?;
        }
    }
    check_set_expr(&query.body)
}

fn check_set_expr(set_expr: &SetExpr) -> Result<(), String> {
    match set_expr {
        SetExpr::Insert(_) | SetExpr::Update(_) | SetExpr::Delete(_) | SetExpr::Merge(_) => {
            Err("Data-modifying statements are not allowed inside a query".to_string())
        }
        SetExpr::Query(query) => check_query(query),
        SetExpr::Select(select) => check_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
    }
}

fn check_select(select: &Select) -> Result<(), String> {
    if select.into.is_some() {
        return Err("SELECT ... INTO creates a table and is not allowed".to_string());
    }
    select.from.iter().try_for_each(check_table_with_joins)
}

fn check_table_with_joins(twj: &TableWithJoins) -> Result<(), String> {
    check_table_factor(&twj.relation)?;
    twj.joins
        .iter()
        .try_for_each(|join| check_table_factor(&join.relation))
}

fn check_table_factor(factor: &TableFactor) -> Result<(), String> {
    match factor {
        TableFactor::Derived { subquery, .. } => check_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => check_table_with_joins(table_with_joins),
        _ => Ok(()),
    }
}
