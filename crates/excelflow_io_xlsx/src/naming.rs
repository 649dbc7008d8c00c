//! Sheet-name normalization and collision resolution.
//!
//! Resolution rules, in order:
//! 1. A blank request becomes [`C_SHEET_NAME_DEFAULT`]; anything else is
//!    trimmed and has each illegal character replaced with `_`.
//! 2. A workbook that does not exist yet gets `"{base}_{YYYYMMDD_HHMM}"`.
//! 3. An existing workbook gets `base` when free, else the first free
//!    `base_1`, `base_2`, ... Bases that already end in `_<digits>` are not
//!    special-cased, so `"Output_1"` may resolve to `"Output_1_1"`.
//!
//! A name is taken when it equals an existing one ignoring case, the same
//! way Excel compares sheet names.

use std::collections::BTreeSet;
use std::path::Path;

use calamine::{Reader, open_workbook_auto};
use chrono::{Local, NaiveDateTime};

use crate::conf::{C_SHEET_NAME_DEFAULT, C_SHEET_NAME_TIMESTAMP_FORMAT};
use crate::error::XlsxWriteError;
use crate::util::sanitize_sheet_name;

/// Derive the base sheet name from an optional user request.
pub fn normalize_sheet_base_name(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        None | Some("") => C_SHEET_NAME_DEFAULT.to_string(),
        Some(name) => sanitize_sheet_name(name),
    }
}

/// Return `base` if unused, else the first unused `base_{n}` for `n >= 1`.
///
/// Names are compared case-insensitively.
pub fn derive_unique_sheet_name(base: &str, existing: &[String]) -> String {
    let set_existing: BTreeSet<String> = existing.iter().map(|name| name.to_lowercase()).collect();
    if !set_existing.contains(&base.to_lowercase()) {
        return base.to_string();
    }

    let mut n_idx = 1usize;
    loop {
        let candidate = format!("{base}_{n_idx}");
        if !set_existing.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

/// List sheet names of an existing workbook, in workbook order.
pub fn read_sheet_names<P: AsRef<Path>>(workbook_path: P) -> Result<Vec<String>, XlsxWriteError> {
    let path = workbook_path.as_ref();
    let workbook = open_workbook_auto(path).map_err(|err| XlsxWriteError::WorkbookRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(workbook.sheet_names())
}

/// Resolve a collision-free sheet name, taking the clock as a parameter.
pub fn resolve_sheet_name_at<P: AsRef<Path>>(
    workbook_path: P,
    requested: Option<&str>,
    now: NaiveDateTime,
) -> Result<String, XlsxWriteError> {
    let path = workbook_path.as_ref();
    let base_name = normalize_sheet_base_name(requested);

    if !path.exists() {
        return Ok(format!(
            "{base_name}_{}",
            now.format(C_SHEET_NAME_TIMESTAMP_FORMAT)
        ));
    }

    let l_sheet_names = read_sheet_names(path)?;
    Ok(derive_unique_sheet_name(&base_name, &l_sheet_names))
}

/// Resolve a collision-free sheet name against the local clock.
pub fn resolve_sheet_name<P: AsRef<Path>>(
    workbook_path: P,
    requested: Option<&str>,
) -> Result<String, XlsxWriteError> {
    resolve_sheet_name_at(workbook_path, requested, Local::now().naive_local())
}
