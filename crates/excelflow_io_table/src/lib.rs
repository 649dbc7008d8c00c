//! `excelflow_io_table`:
//! Input loading and ordered column selection for ExcelFlow.
//!
//! - `reader` : CSV / JSON / spreadsheet into a `DataFrame`
//! - `select` : `(column, position)` choices applied to a `DataFrame`
//! - `error`  : `ReadTableError`, `SelectColumnsError`
pub mod error;
pub mod reader;
pub mod select;

pub use error::{ReadTableError, SelectColumnsError};
pub use reader::{EnumInputFormat, read_table, read_table_from_bytes};
pub use select::{
    SpecColumnChoice, derive_default_choices, parse_column_choices, select_ordered_columns,
};
