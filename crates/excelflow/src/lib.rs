//! `excelflow`:
//! Load a table, keep and reorder chosen columns, save them as a new sheet
//! of an Excel workbook.
//!
//! - `save`   : lock check, sheet-name resolution and write
//! - `config` : TOML settings
//! - `cli`    : clap front end
//! - `error`  : `SaveError`
pub mod cli;
pub mod config;
pub mod error;
pub mod save;

pub use config::{ConfigError, SpecExcelflowConfig, load_config};
pub use error::SaveError;
pub use save::{SpecSaveReport, SpecSaveRequest, load_table, save_selected_columns, save_table};
