//! Table extraction and chart selection on realistic answers.

use athena_lens::answer::AnswerView;
use athena_lens::chart::{extract_table, select_columns, ChartPoint, ColumnKind};
use pretty_assertions::assert_eq;

const STATUS_ANSWER: &str = "\
Here is the distribution of card status colors for March:

```sql
SELECT status_color, COUNT(*) AS count,
       ROUND(100.0 * COUNT(*) / SUM(COUNT(*)) OVER (), 1) AS percentage
FROM pfm.card_status
GROUP BY 1
ORDER BY 2 DESC
```

| status_color | count | percentage |
|:-------------|------:|-----------:|
| green        | 691,200 | 50.0 |
| yellow       | 576,960 | 41.7 |
| red          | 114,240 | 8.3 |

Green accounts for half of all cards.";

#[test]
fn test_status_answer_end_to_end() {
    let view = AnswerView::parse(STATUS_ANSWER, None, None);

    let sql = view.sql.unwrap();
    assert!(sql.starts_with("SELECT status_color"));
    assert!(sql.ends_with("ORDER BY 2 DESC"));

    let table = view.table.unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.columns()[0].kind, ColumnKind::Text);
    assert_eq!(table.columns()[1].kind, ColumnKind::Numeric);
    assert_eq!(table.columns()[2].kind, ColumnKind::Numeric);

    let chart = view.chart.unwrap();
    assert_eq!(chart.label_column, "status_color");
    assert_eq!(chart.value_column, "count");
    assert_eq!(
        chart.points,
        vec![
            ChartPoint { label: "green".to_string(), value: 691_200.0 },
            ChartPoint { label: "yellow".to_string(), value: 576_960.0 },
            ChartPoint { label: "red".to_string(), value: 114_240.0 },
        ]
    );
}

#[test]
fn test_pipeless_table_example() {
    let text = "Name | Count\n--- | ---\nAlpha | 10\nBeta  | 20";

    let table = extract_table(text).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.numeric_values(1), vec![Some(10.0), Some(20.0)]);
}

#[test]
fn test_numbered_list_example() {
    let text = "1. Alpha (10 transactions)\n2. Beta (20 transactions)";

    let table = extract_table(text).unwrap();

    assert_eq!(
        table.to_json(),
        serde_json::json!([
            {"label": "Alpha", "value": 10},
            {"label": "Beta", "value": 20},
        ])
    );
}

#[test]
fn test_duplicate_labels_are_aggregated() {
    let text = "| label | value |\n|---|---|\n| x | 1 |\n| x | 2 |\n| y | 5 |";

    let table = extract_table(text).unwrap();
    let chart = select_columns(&table, None, None).unwrap();

    assert_eq!(
        chart.points,
        vec![
            ChartPoint { label: "x".to_string(), value: 3.0 },
            ChartPoint { label: "y".to_string(), value: 5.0 },
        ]
    );
    assert!(chart.merged);
}

#[test]
fn test_extract_and_select_are_idempotent() {
    let first = AnswerView::parse(STATUS_ANSWER, Some("status_color"), Some("percentage"));
    let second = AnswerView::parse(STATUS_ANSWER, Some("status_color"), Some("percentage"));

    assert_eq!(first, second);
    assert_eq!(first.chart.unwrap().value_column, "percentage");
}

#[test]
fn test_answer_without_table() {
    let view = AnswerView::parse("No transactions matched that filter.", None, None);
    assert!(view.table.is_none());
    assert!(view.chart.is_none());
}
