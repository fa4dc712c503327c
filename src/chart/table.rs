//! Table shape shared by the extractor and the column selector.

use serde_json::{Map, Number, Value};

/// How a column's cells are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-empty cell parses as a finite number and at least one does.
    Numeric,
    Text,
}

/// One named column of an extracted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// A small table recovered from free-form text.
///
/// Cells keep their original text; numeric columns are read through
/// [`parse_number`]. Empty cells are nulls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    columns: Vec<TableColumn>,
    rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    /// Builds a table and infers each column's kind. Every row must have one
    /// cell per header; rows of any other width are dropped.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .filter(|row| row.len() == headers.len())
            .collect();

        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let kind = infer_kind(rows.iter().map(|row| row[index].as_str()));
                TableColumn { name, kind }
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_numeric(&self, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|c| c.kind == ColumnKind::Numeric)
    }

    /// Raw cell text, `None` for empty cells.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
    }

    /// Values of a numeric column; nulls stay `None`.
    pub fn numeric_values(&self, column: usize) -> Vec<Option<f64>> {
        (0..self.rows.len())
            .map(|row| self.cell(row, column).and_then(parse_number))
            .collect()
    }

    /// Renders the rows as JSON objects. Numeric cells become numbers.
    pub fn to_json(&self) -> Value {
        let records = (0..self.rows.len())
            .map(|row_index| {
                let mut object = Map::new();
                for (index, column) in self.columns.iter().enumerate() {
                    let value = match (self.cell(row_index, index), column.kind) {
                        (None, _) => Value::Null,
                        (Some(text), ColumnKind::Numeric) => number_value(text),
                        (Some(text), ColumnKind::Text) => Value::String(text.to_string()),
                    };
                    object.insert(column.name.clone(), value);
                }
                Value::Object(object)
            })
            .collect();
        Value::Array(records)
    }
}

/// Parses a cell as a number after dropping thousands separators.
///
/// Non-finite values (`inf`, `NaN`) are not numbers here.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut seen = false;
    for cell in cells.filter(|c| !c.trim().is_empty()) {
        if parse_number(cell).is_none() {
            return ColumnKind::Text;
        }
        seen = true;
    }
    if seen {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn number_value(text: &str) -> Value {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(int) = cleaned.parse::<i64>() {
        return Value::Number(int.into());
    }
    parse_number(text)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("998,080,550"), Some(998_080_550.0));
        assert_eq!(parse_number(" 41.7 "), Some(41.7));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_kind_is_all_or_nothing() {
        let table = ExtractedTable::new(
            strings(&["name", "count", "mixed"]),
            vec![
                strings(&["Alpha", "1,000", "5"]),
                strings(&["Beta", "", "five"]),
            ],
        );

        assert_eq!(table.columns()[0].kind, ColumnKind::Text);
        assert_eq!(table.columns()[1].kind, ColumnKind::Numeric);
        assert_eq!(table.columns()[2].kind, ColumnKind::Text);
        assert_eq!(table.numeric_values(1), vec![Some(1000.0), None]);
    }

    #[test]
    fn test_all_empty_column_is_text() {
        let table = ExtractedTable::new(strings(&["a"]), vec![strings(&[""])]);
        assert_eq!(table.columns()[0].kind, ColumnKind::Text);
    }

    #[test]
    fn test_ragged_rows_are_dropped() {
        let table = ExtractedTable::new(
            strings(&["a", "b"]),
            vec![strings(&["1", "2"]), strings(&["3"])],
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_to_json_keeps_text_and_types_numbers() {
        let table = ExtractedTable::new(
            strings(&["company", "total", "share"]),
            vec![
                strings(&["Rakuten Card", "998,080,550", "12.5"]),
                strings(&["SMBC, Ltd", "", "3"]),
            ],
        );

        assert_eq!(
            table.to_json(),
            serde_json::json!([
                {"company": "Rakuten Card", "total": 998080550, "share": 12.5},
                {"company": "SMBC, Ltd", "total": null, "share": 3},
            ])
        );
    }
}
