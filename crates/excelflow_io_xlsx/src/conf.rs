//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecXlsxWriteOptions};

/// Excel worksheet maximum row count (header row included).
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length, in characters.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [char; 7] = ['\\', '/', '*', '?', ':', '[', ']'];
/// Replacement for each illegal sheet-name character.
pub const C_SHEET_NAME_REPLACEMENT: &str = "_";

/// Base sheet name used when the caller requests none.
pub const C_SHEET_NAME_DEFAULT: &str = "Output";
/// `chrono` format of the suffix stamped on sheets of brand-new workbooks.
pub const C_SHEET_NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";

/// SpreadsheetML main namespace.
pub const C_NS_SPREADSHEETML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
/// Office document relationships namespace (the `r:` prefix).
pub const C_NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// Relationship type of a workbook -> worksheet link.
pub const C_REL_TYPE_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
/// Relationship type of the package -> main document link.
pub const C_REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
/// Content type registered for worksheet parts.
pub const C_CONTENT_TYPE_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Build default write options.
///
/// Header cells are bold; body cells keep Excel's default look.
pub fn derive_default_xlsx_write_options() -> SpecXlsxWriteOptions {
    SpecXlsxWriteOptions {
        fmt_header: SpecCellFormat { bold: Some(true) },
        ..Default::default()
    }
}
