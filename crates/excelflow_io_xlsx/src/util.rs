//! Stateless helper utilities shared by the writers and the resolver.

use std::sync::LazyLock;

use polars::prelude::{AnyValue, DataFrame};
use regex::Regex;

use crate::conf::{
    C_SHEET_NAME_REPLACEMENT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::error::XlsxWriteError;
use crate::spec::EnumCellValue;

static RE_SHEET_NAME_ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/*?:\[\]]").expect("static sheet-name regex"));

////////////////////////////////////////////////////////////////////////////////
// #region SheetNameRules

/// Replace every character Excel forbids in sheet names with `_`.
pub fn sanitize_sheet_name(name: &str) -> String {
    RE_SHEET_NAME_ILLEGAL
        .replace_all(name, C_SHEET_NAME_REPLACEMENT)
        .into_owned()
}

/// Check a final sheet name against the rules Excel enforces on open.
pub fn validate_sheet_name(name: &str) -> Result<(), XlsxWriteError> {
    let err = |message: &str| XlsxWriteError::InvalidSheetName {
        name: name.to_string(),
        message: message.to_string(),
    };

    if name.is_empty() {
        return Err(err("sheet name must not be empty"));
    }
    if name.chars().count() > N_LEN_EXCEL_SHEET_NAME_MAX {
        return Err(err(&format!(
            "sheet name must be at most {N_LEN_EXCEL_SHEET_NAME_MAX} characters"
        )));
    }
    if name.chars().any(|chr| TUP_EXCEL_ILLEGAL.contains(&chr)) {
        return Err(err("sheet name contains one of \\ / * ? : [ ]"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(err("sheet name must not start or end with an apostrophe"));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableLimits

/// Reject tables that do not fit one worksheet (header row included).
pub fn validate_table_limits(df: &DataFrame) -> Result<(), XlsxWriteError> {
    let n_rows = df.height();
    let n_cols = df.width();
    if n_rows + 1 > N_NROWS_EXCEL_MAX || n_cols > N_NCOLS_EXCEL_MAX {
        return Err(XlsxWriteError::TableTooLarge { n_rows, n_cols });
    }
    Ok(())
}

pub(crate) fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value).map_err(|_| XlsxWriteError::TableTooLarge {
        n_rows: value,
        n_cols: 0,
    })
}

pub(crate) fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value).map_err(|_| XlsxWriteError::TableTooLarge {
        n_rows: 0,
        n_cols: value,
    })
}

/// Zero-based column index to Excel letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_letters(col_idx: usize) -> String {
    let mut n_rest = col_idx + 1;
    let mut l_chars = Vec::new();
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Zero-based `(row, col)` to an A1 reference.
pub fn derive_cell_ref(row_idx: usize, col_idx: usize) -> String {
    format!("{}{}", derive_column_letters(col_idx), row_idx + 1)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Map one Polars value onto the writer's cell model.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => derive_cell_value_from_f64(val as f64),
        AnyValue::Float64(val) => derive_cell_value_from_f64(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

/// NaN and infinities cannot be stored as numbers in a worksheet.
fn derive_cell_value_from_f64(x: f64) -> EnumCellValue {
    if x.is_nan() {
        return EnumCellValue::String("NaN".to_string());
    }
    if x.is_infinite() {
        return EnumCellValue::String(if x.is_sign_positive() { "Inf" } else { "-Inf" }.to_string());
    }
    EnumCellValue::Number(x)
}

/// Read `(row, col)` of `df` as a writer cell.
pub(crate) fn read_cell(
    df: &DataFrame,
    row_idx: usize,
    col_idx: usize,
) -> Result<EnumCellValue, XlsxWriteError> {
    let value = df.get_columns()[col_idx].get(row_idx)?;
    Ok(derive_cell_value_from_any_value(value))
}

/// Column names of `df` as owned strings.
pub(crate) fn derive_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => n.to_string().len(),
        EnumCellValue::Boolean(b) => if *b { 4 } else { 5 },
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use polars::prelude::AnyValue;

    use super::{
        derive_cell_ref, derive_cell_value_from_any_value, derive_column_letters,
        estimate_width_len, sanitize_sheet_name, validate_sheet_name,
    };
    use crate::error::XlsxWriteError;
    use crate::spec::EnumCellValue;

    #[test]
    fn test_sanitize_sheet_name_replaces_each_illegal_char() {
        assert_eq!(sanitize_sheet_name(r"a\b/c*d?e:f[g]h"), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_sheet_name("[[x]]"), "__x__");
        assert_eq!(sanitize_sheet_name("plain"), "plain");
    }

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Output_20250101_0930").is_ok());
        assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
        assert!(matches!(
            validate_sheet_name(&"x".repeat(32)),
            Err(XlsxWriteError::InvalidSheetName { .. })
        ));
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name("a/b").is_err());
        assert!(validate_sheet_name("'quoted'").is_err());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(derive_column_letters(0), "A");
        assert_eq!(derive_column_letters(25), "Z");
        assert_eq!(derive_column_letters(26), "AA");
        assert_eq!(derive_column_letters(701), "ZZ");
        assert_eq!(derive_column_letters(702), "AAA");
        assert_eq!(derive_column_letters(16_383), "XFD");
        assert_eq!(derive_cell_ref(0, 0), "A1");
        assert_eq!(derive_cell_ref(9, 2), "C10");
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Null),
            EnumCellValue::None
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Int64(3)),
            EnumCellValue::Number(3.0)
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Boolean(true)),
            EnumCellValue::Boolean(true)
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::String("x")),
            EnumCellValue::String("x".to_string())
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Float64(f64::NAN)),
            EnumCellValue::String("NaN".to_string())
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Float64(f64::NEG_INFINITY)),
            EnumCellValue::String("-Inf".to_string())
        );
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(estimate_width_len(&EnumCellValue::None), 0);
        assert_eq!(
            estimate_width_len(&EnumCellValue::String("abc".to_string())),
            3
        );
        assert_eq!(estimate_width_len(&EnumCellValue::Number(12.5)), 4);
        assert_eq!(estimate_width_len(&EnumCellValue::Boolean(false)), 5);
    }
}
