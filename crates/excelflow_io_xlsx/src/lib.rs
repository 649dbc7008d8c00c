//! `excelflow_io_xlsx`:
//! Workbook inspection and sheet writing for ExcelFlow.
//!
//! Layout:
//! - `conf`     : limits, package constants and default presets
//! - `spec`     : cell model, write options and reports
//! - `util`     : pure helper functions
//! - `naming`   : sheet-name normalization and collision resolution
//! - `writer`   : new-workbook writer (rust_xlsxwriter)
//! - `package`  : append a sheet to an existing package (zip + quick-xml)
//! - `dispatch` : pick `writer` or `package` from the output mode
//! - `error`    : `XlsxWriteError`
pub mod conf;
pub mod dispatch;
pub mod error;
pub mod naming;
pub mod package;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_write_options,
};
pub use dispatch::{derive_applied_mode, write_sheet_dispatch};
pub use error::XlsxWriteError;
pub use naming::{
    derive_unique_sheet_name, normalize_sheet_base_name, read_sheet_names, resolve_sheet_name,
    resolve_sheet_name_at,
};
pub use package::append_sheet_to_workbook;
pub use spec::{
    EnumCellValue, EnumOutputMode, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetWriteReport,
    SpecXlsxWriteOptions,
};
pub use util::sanitize_sheet_name;
pub use writer::{XlsxWriter, write_new_workbook};
