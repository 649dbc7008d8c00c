//! Shared XLSX specification models.

use std::fmt;
use std::str::FromStr;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification translated into a `rust_xlsxwriter::Format`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Bold style.
    pub bold: Option<bool>,
}

/// Normalized cell value during conversion/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// How a save lands in the destination workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumOutputMode {
    /// (Re)write the destination from scratch with only the new sheet.
    #[default]
    New,
    /// Add the new sheet to an existing destination, keeping its sheets.
    Append,
}

impl fmt::Display for EnumOutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Append => write!(f, "append"),
        }
    }
}

impl FromStr for EnumOutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "append" => Ok(Self::Append),
            other => Err(format!(
                "Unknown output mode {other:?}; expected \"new\" or \"append\"."
            )),
        }
    }
}

/// Header-based column width policy of the new-workbook writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Options of the new-workbook writer. The append editor writes unstyled
/// cells and takes none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxWriteOptions {
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Outcome of one sheet write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetWriteReport {
    /// Sheet name actually written.
    pub sheet_name: String,
    /// Mode that was applied (an append against a missing file becomes `New`).
    pub mode_applied: EnumOutputMode,
    /// Body rows written (header excluded).
    pub n_rows: usize,
    /// Columns written.
    pub n_cols: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
