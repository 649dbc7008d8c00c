//! Load CSV, JSON and spreadsheet inputs into a Polars `DataFrame`.
//!
//! Spreadsheet inputs are read with calamine: the first sheet, the first
//! row as header. Every column gets one inferred type.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDate, TimeDelta};
use polars::prelude::{
    Column, CsvReadOptions, DataFrame, JsonFormat, JsonReader, SerReader,
};

use crate::error::ReadTableError;

const C_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const N_MS_PER_DAY: f64 = 86_400_000.0;

////////////////////////////////////////////////////////////////////////////////
// #region InputFormat

/// Input format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumInputFormat {
    Csv,
    Json,
    JsonLines,
    Spreadsheet,
}

impl EnumInputFormat {
    /// Anything that is not CSV or JSON is treated as a spreadsheet.
    pub fn from_file_name(file_name: &str) -> Self {
        let c_ext = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match c_ext.as_str() {
            "csv" => Self::Csv,
            "json" => Self::Json,
            "jsonl" | "ndjson" => Self::JsonLines,
            _ => Self::Spreadsheet,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReadEntry

/// Read the table stored at `path`.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<DataFrame, ReadTableError> {
    let path = path.as_ref();
    let v_bytes = std::fs::read(path).map_err(|source| ReadTableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    read_table_from_bytes(&file_name, v_bytes)
}

/// Read an in-memory upload; `file_name` only selects the format.
pub fn read_table_from_bytes(
    file_name: &str,
    v_bytes: Vec<u8>,
) -> Result<DataFrame, ReadTableError> {
    let format = EnumInputFormat::from_file_name(file_name);
    let parse_err = |source| ReadTableError::Parse {
        file_name: file_name.to_string(),
        source,
    };

    let df = match format {
        EnumInputFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(v_bytes))
            .finish()
            .map_err(parse_err)?,
        EnumInputFormat::Json => JsonReader::new(Cursor::new(v_bytes))
            .with_json_format(JsonFormat::Json)
            .finish()
            .map_err(parse_err)?,
        EnumInputFormat::JsonLines => JsonReader::new(Cursor::new(v_bytes))
            .with_json_format(JsonFormat::JsonLines)
            .finish()
            .map_err(parse_err)?,
        EnumInputFormat::Spreadsheet => read_spreadsheet(file_name, v_bytes)?,
    };

    if df.width() == 0 {
        return Err(ReadTableError::Empty {
            file_name: file_name.to_string(),
        });
    }
    log::info!(
        "Loaded {file_name} as {format:?}: {} rows x {} columns",
        df.height(),
        df.width()
    );
    Ok(df)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Spreadsheet

fn read_spreadsheet(file_name: &str, v_bytes: Vec<u8>) -> Result<DataFrame, ReadTableError> {
    let sheet_err = |message: String| ReadTableError::Spreadsheet {
        file_name: file_name.to_string(),
        message,
    };

    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(v_bytes)).map_err(|err| sheet_err(err.to_string()))?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(sheet_err("workbook has no sheets".to_string()));
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| sheet_err(err.to_string()))?;

    // The range starts at the first used cell; columns left of it still
    // count, blank rows above it do not.
    let n_col_offset = range.start().map_or(0, |(_, n_col)| n_col as usize);
    let mut rows = range.rows();
    let Some(l_header) = rows.next() else {
        return Err(ReadTableError::Empty {
            file_name: file_name.to_string(),
        });
    };
    let l_names = derive_header_names(n_col_offset, l_header);
    let l_body: Vec<&[Data]> = rows.collect();

    let l_columns: Vec<Column> = l_names
        .into_iter()
        .enumerate()
        .map(|(n_idx_col, name)| {
            let l_cells: Vec<&Data> = l_body
                .iter()
                .map(|row| {
                    n_idx_col
                        .checked_sub(n_col_offset)
                        .and_then(|n_idx_range| row.get(n_idx_range))
                        .unwrap_or(&Data::Empty)
                })
                .collect();
            build_column(&name, &l_cells)
        })
        .collect();

    DataFrame::new(l_columns).map_err(|source| ReadTableError::Parse {
        file_name: file_name.to_string(),
        source,
    })
}

/// Blank headers become `Unnamed: {i}`; repeats get `.1`, `.2`, ...
///
/// `n_col_offset` blank columns are assumed left of `l_header`.
fn derive_header_names(n_col_offset: usize, l_header: &[Data]) -> Vec<String> {
    let mut set_seen: HashSet<String> = HashSet::new();
    let mut l_names = Vec::with_capacity(n_col_offset + l_header.len());

    let iter_cells = std::iter::repeat_n(&Data::Empty, n_col_offset).chain(l_header.iter());
    for (n_idx, cell) in iter_cells.enumerate() {
        let base = derive_cell_text(cell)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("Unnamed: {n_idx}"));
        let mut name = base.clone();
        let mut n_dup = 0usize;
        while set_seen.contains(&name) {
            n_dup += 1;
            name = format!("{base}.{n_dup}");
        }
        set_seen.insert(name.clone());
        l_names.push(name);
    }
    l_names
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumInferredType {
    Int,
    Float,
    Bool,
    Text,
}

fn infer_column_type(l_cells: &[&Data]) -> EnumInferredType {
    let mut if_all_int = true;
    let mut if_all_num = true;
    let mut if_all_bool = true;
    for cell in l_cells {
        match cell {
            Data::Empty | Data::Error(_) => {}
            Data::Int(_) => if_all_bool = false,
            Data::Float(val) => {
                if_all_bool = false;
                if as_exact_i64(*val).is_none() {
                    if_all_int = false;
                }
            }
            Data::Bool(_) => {
                if_all_int = false;
                if_all_num = false;
            }
            _ => {
                if_all_int = false;
                if_all_num = false;
                if_all_bool = false;
            }
        }
    }

    let if_any_value = l_cells
        .iter()
        .any(|cell| !matches!(cell, Data::Empty | Data::Error(_)));
    if !if_any_value {
        EnumInferredType::Text
    } else if if_all_int {
        EnumInferredType::Int
    } else if if_all_num {
        EnumInferredType::Float
    } else if if_all_bool {
        EnumInferredType::Bool
    } else {
        EnumInferredType::Text
    }
}

fn build_column(name: &str, l_cells: &[&Data]) -> Column {
    match infer_column_type(l_cells) {
        EnumInferredType::Int => {
            let l_values: Vec<Option<i64>> = l_cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(val) => Some(*val),
                    Data::Float(val) => as_exact_i64(*val),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumInferredType::Float => {
            let l_values: Vec<Option<f64>> = l_cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(val) => Some(*val as f64),
                    Data::Float(val) => Some(*val),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumInferredType::Bool => {
            let l_values: Vec<Option<bool>> = l_cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(val) => Some(*val),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), l_values)
        }
        EnumInferredType::Text => {
            let l_values: Vec<Option<String>> =
                l_cells.iter().map(|cell| derive_cell_text(cell)).collect();
            Column::new(name.into(), l_values)
        }
    }
}

fn as_exact_i64(val: f64) -> Option<i64> {
    if val.is_finite() && val.fract() == 0.0 && val.abs() < 9.007_199_254_740_992e15 {
        Some(val as i64)
    } else {
        None
    }
}

/// Text rendering of one spreadsheet cell; `None` for empty and error cells.
fn derive_cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(val) | Data::DateTimeIso(val) | Data::DurationIso(val) => Some(val.clone()),
        Data::Int(val) => Some(val.to_string()),
        Data::Float(val) => Some(match as_exact_i64(*val) {
            Some(n_int) => n_int.to_string(),
            None => val.to_string(),
        }),
        Data::Bool(val) => Some(if *val { "True" } else { "False" }.to_string()),
        Data::DateTime(val) => Some(derive_datetime_text(val.as_f64())),
    }
}

/// Excel serial date (1900 system) to `YYYY-MM-DD HH:MM:SS`.
fn derive_datetime_text(serial: f64) -> String {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let delta = TimeDelta::try_milliseconds((serial * N_MS_PER_DAY).round() as i64);
    match (base, delta) {
        (Some(base), Some(delta)) => match base.checked_add_signed(delta) {
            Some(dt) => dt.format(C_DATETIME_FORMAT).to_string(),
            None => serial.to_string(),
        },
        _ => serial.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use calamine::Data;
    use polars::prelude::DataType;
    use rust_xlsxwriter::Workbook;

    use super::{
        EnumInputFormat, derive_datetime_text, derive_header_names, read_table,
        read_table_from_bytes,
    };
    use crate::error::ReadTableError;

    #[test]
    fn format_follows_extension() {
        assert_eq!(EnumInputFormat::from_file_name("a.CSV"), EnumInputFormat::Csv);
        assert_eq!(EnumInputFormat::from_file_name("a.json"), EnumInputFormat::Json);
        assert_eq!(
            EnumInputFormat::from_file_name("a.ndjson"),
            EnumInputFormat::JsonLines
        );
        assert_eq!(
            EnumInputFormat::from_file_name("a.xlsx"),
            EnumInputFormat::Spreadsheet
        );
        assert_eq!(
            EnumInputFormat::from_file_name("noext"),
            EnumInputFormat::Spreadsheet
        );
    }

    #[test]
    fn csv_keeps_header_order() {
        let df = read_table_from_bytes("in.csv", b"A,B,C\n1,x,2.5\n2,y,3.5\n".to_vec())
            .expect("csv");
        assert_eq!(df.get_column_names_str(), vec!["A", "B", "C"]);
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("A").expect("A").dtype(), &DataType::Int64);
    }

    #[test]
    fn json_records_and_lines() {
        let df = read_table_from_bytes(
            "in.json",
            br#"[{"A": 1, "B": "x"}, {"A": 2, "B": "y"}]"#.to_vec(),
        )
        .expect("json");
        assert_eq!(df.shape(), (2, 2));

        let df = read_table_from_bytes("in.jsonl", b"{\"A\": 1}\n{\"A\": 2}\n{\"A\": 3}\n".to_vec())
            .expect("jsonl");
        assert_eq!(df.shape(), (3, 1));
    }

    #[test]
    fn garbage_spreadsheet_is_an_error() {
        let err = read_table_from_bytes("in.xlsx", b"definitely not a workbook".to_vec())
            .expect_err("must fail");
        assert!(matches!(err, ReadTableError::Spreadsheet { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = read_table(tmp.path().join("nope.csv")).expect_err("must fail");
        assert!(matches!(err, ReadTableError::Io { .. }));
    }

    #[test]
    fn header_names_are_filled_and_deduplicated() {
        let l_header = vec![
            Data::String("a".to_string()),
            Data::Empty,
            Data::String("a".to_string()),
            Data::Float(2.0),
            Data::String("a".to_string()),
        ];
        assert_eq!(
            derive_header_names(0, &l_header),
            vec!["a", "Unnamed: 1", "a.1", "2", "a.2"]
        );
        assert_eq!(
            derive_header_names(2, &l_header[..1]),
            vec!["Unnamed: 0", "Unnamed: 1", "a"]
        );
    }

    #[test]
    fn datetime_serial_is_rendered() {
        assert_eq!(derive_datetime_text(45_000.5), "2023-03-15 12:00:00");
    }

    #[test]
    fn spreadsheet_columns_are_typed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("in.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (n_col, name) in ["id", "score", "ok", "label"].iter().enumerate() {
            worksheet.write_string(0, n_col as u16, *name).expect("header");
        }
        worksheet.write_number(1, 0, 1.0).expect("write");
        worksheet.write_number(2, 0, 2.0).expect("write");
        worksheet.write_number(1, 1, 0.5).expect("write");
        worksheet.write_number(2, 1, 3.0).expect("write");
        worksheet.write_boolean(1, 2, true).expect("write");
        worksheet.write_boolean(2, 2, false).expect("write");
        worksheet.write_string(1, 3, "x").expect("write");
        worksheet.write_number(2, 3, 7.0).expect("write");
        workbook.save(&path).expect("save");

        let df = read_table(&path).expect("xlsx");
        assert_eq!(df.get_column_names_str(), vec!["id", "score", "ok", "label"]);
        assert_eq!(df.column("id").expect("id").dtype(), &DataType::Int64);
        assert_eq!(df.column("score").expect("score").dtype(), &DataType::Float64);
        assert_eq!(df.column("ok").expect("ok").dtype(), &DataType::Boolean);
        assert_eq!(df.column("label").expect("label").dtype(), &DataType::String);
    }

    #[test]
    fn spreadsheet_columns_keep_their_sheet_position() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("offset.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(2, 1, "x").expect("header");
        worksheet.write_string(2, 2, "y").expect("header");
        worksheet.write_number(3, 1, 1.0).expect("write");
        worksheet.write_string(3, 2, "a").expect("write");
        worksheet.write_number(4, 1, 2.0).expect("write");
        workbook.save(&path).expect("save");

        let df = read_table(&path).expect("xlsx");
        assert_eq!(df.get_column_names_str(), vec!["Unnamed: 0", "x", "y"]);
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Unnamed: 0").expect("pad").null_count(), 2);
        assert_eq!(df.column("x").expect("x").dtype(), &DataType::Int64);
        assert_eq!(df.column("y").expect("y").null_count(), 1);
    }
}
