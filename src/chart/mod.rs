//! Chart data from free-form answers.
//!
//! Pure and synchronous: extraction and selection never fail, a missing
//! table or chart is a plain `None`.

mod extract;
mod select;
mod table;

pub use extract::{extract_markdown_table, extract_numbered_list, extract_table};
pub use select::{select_columns, ChartPoint, ChartSelection};
pub use table::{parse_number, ColumnKind, ExtractedTable, TableColumn};
pub(crate) use table::infer_kind;
