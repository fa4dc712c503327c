//! Picks the label and value columns to chart from an extracted table.

use serde::Serialize;

use super::table::ExtractedTable;

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Chosen columns and the points to plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSelection {
    pub label_column: String,
    pub value_column: String,
    /// One point per distinct label, in first-appearance order.
    pub points: Vec<ChartPoint>,
    /// True when rows sharing a label were summed into one point.
    pub merged: bool,
}

/// Chooses chart columns, honoring preferences where they apply.
///
/// Returns `None` when the table has no numeric column; callers then show the
/// raw table instead.
pub fn select_columns(
    table: &ExtractedTable,
    preferred_label: Option<&str>,
    preferred_value: Option<&str>,
) -> Option<ChartSelection> {
    let columns = table.columns();

    let value = preferred_value
        .and_then(|name| table.column_index(name))
        .filter(|index| table.is_numeric(*index))
        .or_else(|| (0..columns.len()).find(|index| table.is_numeric(*index)))?;

    let mut label = preferred_label
        .and_then(|name| table.column_index(name))
        .or_else(|| (0..columns.len()).find(|index| !table.is_numeric(*index)))
        .unwrap_or(0);

    if label == value && columns.len() > 1 {
        if let Some(other) = (0..columns.len()).find(|index| *index != value) {
            label = other;
        }
    }

    let (points, merged) = aggregate(table, label, value);

    Some(ChartSelection {
        label_column: columns[label].name.clone(),
        value_column: columns[value].name.clone(),
        points,
        merged,
    })
}

/// Sums values per label in first-appearance order. Null values count as zero.
fn aggregate(table: &ExtractedTable, label: usize, value: usize) -> (Vec<ChartPoint>, bool) {
    let values = table.numeric_values(value);
    let mut points: Vec<ChartPoint> = Vec::new();
    let mut merged = false;

    for (row, amount) in values.into_iter().enumerate() {
        let name = table.cell(row, label).unwrap_or_default().trim();
        let amount = amount.unwrap_or(0.0);
        match points.iter_mut().find(|p| p.label == name) {
            Some(point) => {
                point.value += amount;
                merged = true;
            }
            None => points.push(ChartPoint {
                label: name.to_string(),
                value: amount,
            }),
        }
    }

    (points, merged)
}
