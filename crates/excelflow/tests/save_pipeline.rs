use std::fs::{self, OpenOptions};
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use excelflow::{SaveError, SpecSaveRequest, load_table, save_selected_columns, save_table};
use excelflow_io_table::SpecColumnChoice;
use excelflow_io_xlsx::EnumOutputMode;
use filetime::{FileTime, set_file_mtime};
use polars::prelude::{Column, DataFrame};
use rust_xlsxwriter::Workbook;

fn sample_df() -> DataFrame {
    DataFrame::new(vec![
        Column::new("A".into(), vec![1i64, 2, 3]),
        Column::new("B".into(), vec!["x", "y", "z"]),
        Column::new("C".into(), vec![0.5f64, 1.5, 2.5]),
    ])
    .expect("df")
}

fn request(path: &Path, mode: EnumOutputMode, sheet: Option<&str>) -> SpecSaveRequest {
    SpecSaveRequest {
        workbook_path: path.to_path_buf(),
        mode,
        sheet_name_requested: sheet.map(ToString::to_string),
    }
}

fn create_existing_workbook(path: &Path) {
    create_workbook_with_sheet(path, "Existing");
}

fn create_workbook_with_sheet(path: &Path, sheet_name: &str) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).expect("name");
    worksheet.write_string(0, 0, "keep me").expect("write");
    workbook.save(path).expect("save fixture");
}

#[test]
fn chosen_positions_decide_column_order() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("out.xlsx");

    for choices in [
        vec![SpecColumnChoice::new("C", 1), SpecColumnChoice::new("A", 2)],
        vec![SpecColumnChoice::new("A", 2), SpecColumnChoice::new("C", 1)],
    ] {
        let report = save_selected_columns(
            &sample_df(),
            &choices,
            &request(&path, EnumOutputMode::New, Some("Picked")),
        )
        .expect("save");
        assert_eq!(report.n_cols, 2);

        let mut workbook: Xlsx<_> = open_workbook(&path).expect("open");
        let range = workbook
            .worksheet_range(&report.sheet_name)
            .expect("range");
        assert_eq!(range.get((0, 0)), Some(&Data::String("C".to_string())));
        assert_eq!(range.get((0, 1)), Some(&Data::String("A".to_string())));
        assert_eq!(range.get((1, 0)), Some(&Data::Float(0.5)));
        assert_eq!(range.get((3, 1)), Some(&Data::Float(3.0)));
        assert_eq!(range.width(), 2);
    }
}

#[test]
fn repeated_appends_get_suffixed_sheet_names() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("book.xlsx");
    create_existing_workbook(&path);

    let first = save_table(&sample_df(), &request(&path, EnumOutputMode::Append, Some("  ")))
        .expect("first append");
    let second = save_table(&sample_df(), &request(&path, EnumOutputMode::Append, None))
        .expect("second append");
    assert_eq!(first.sheet_name, "Output");
    assert_eq!(second.sheet_name, "Output_1");
    assert_eq!(second.mode_applied, EnumOutputMode::Append);

    let mut workbook: Xlsx<_> = open_workbook(&path).expect("open");
    assert_eq!(
        workbook.sheet_names(),
        vec![
            "Existing".to_string(),
            "Output".to_string(),
            "Output_1".to_string()
        ]
    );
    let range = workbook.worksheet_range("Existing").expect("range");
    assert_eq!(range.get((0, 0)), Some(&Data::String("keep me".to_string())));
}

#[test]
fn append_to_missing_workbook_creates_it() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("fresh.xlsx");

    let report = save_table(&sample_df(), &request(&path, EnumOutputMode::Append, Some("Report")))
        .expect("save");
    assert_eq!(report.mode_applied, EnumOutputMode::New);
    assert!(report.sheet_name.starts_with("Report_"));
    assert!(path.is_file());
}

#[test]
fn new_mode_replaces_workbook_contents() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("book.xlsx");
    create_existing_workbook(&path);

    let report = save_table(&sample_df(), &request(&path, EnumOutputMode::New, Some("Existing")))
        .expect("save");
    assert_eq!(report.sheet_name, "Existing_1");

    let workbook: Xlsx<_> = open_workbook(&path).expect("open");
    assert_eq!(workbook.sheet_names(), vec!["Existing_1".to_string()]);
}

#[test]
fn blank_workbook_path_is_reported() {
    let err = save_table(
        &sample_df(),
        &request(Path::new(""), EnumOutputMode::New, None),
    )
    .expect_err("must fail");
    assert!(matches!(err, SaveError::MissingWorkbook));
}

#[test]
fn unreadable_workbook_is_unexpected_write_error_and_untouched() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("broken.xlsx");
    fs::write(&path, b"not a workbook").expect("write");
    let mtime = FileTime::from_unix_time(1_600_000_000, 0);
    set_file_mtime(&path, mtime).expect("pin mtime");

    let err = save_table(&sample_df(), &request(&path, EnumOutputMode::Append, None))
        .expect_err("must fail");
    assert!(matches!(err, SaveError::UnexpectedWrite { .. }));
    assert_eq!(fs::read(&path).expect("read"), b"not a workbook");

    let meta = fs::metadata(&path).expect("metadata");
    assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
}

#[test]
fn csv_input_flows_through_to_workbook() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path_input = tmp.path().join("in.csv");
    fs::write(&path_input, "A,B,C\n1,x,0.5\n2,y,1.5\n").expect("write");
    let path_out = tmp.path().join("out.xlsx");

    let df = load_table(&path_input).expect("load");
    let report = save_selected_columns(
        &df,
        &[SpecColumnChoice::new("B", 1)],
        &request(&path_out, EnumOutputMode::New, Some("Only B")),
    )
    .expect("save");
    assert_eq!((report.n_rows, report.n_cols), (2, 1));

    let mut workbook: Xlsx<_> = open_workbook(&path_out).expect("open");
    let range = workbook
        .worksheet_range(&report.sheet_name)
        .expect("range");
    assert_eq!(range.get((2, 0)), Some(&Data::String("y".to_string())));
}

#[test]
fn missing_input_is_input_read_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = load_table(tmp.path().join("none.csv")).expect_err("must fail");
    assert!(matches!(err, SaveError::InputRead(_)));
    assert_eq!(err.user_message(), "Failed to read uploaded file");
}

fn set_readonly(path: &Path, if_readonly: bool) {
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(if_readonly);
    fs::set_permissions(path, perms).expect("set permissions");
}

#[test]
fn refused_target_is_locked_error_and_untouched() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("book.xlsx");
    create_existing_workbook(&path);
    let mtime = FileTime::from_unix_time(1_600_000_000, 0);
    set_file_mtime(&path, mtime).expect("pin mtime");
    let v_before = fs::read(&path).expect("read");
    set_readonly(&path, true);

    if OpenOptions::new().append(true).open(&path).is_ok() {
        set_readonly(&path, false);
        eprintln!("skipping: read-only bit is not enforced for this user");
        return;
    }

    let result = save_table(&sample_df(), &request(&path, EnumOutputMode::Append, None));
    set_readonly(&path, false);

    let err = result.expect_err("must fail");
    assert!(matches!(err, SaveError::LockedTarget { .. }));
    assert_eq!(
        err.user_message(),
        "Excel file is open or locked. Close it and try again."
    );
    assert_eq!(fs::read(&path).expect("read"), v_before);
    let meta = fs::metadata(&path).expect("metadata");
    assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
}

#[test]
fn lowercase_default_sheet_still_gets_a_free_name() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("book.xlsx");
    create_workbook_with_sheet(&path, "output");

    let report = save_table(&sample_df(), &request(&path, EnumOutputMode::Append, None))
        .expect("append");
    assert_eq!(report.sheet_name, "Output_1");

    let workbook: Xlsx<_> = open_workbook(&path).expect("open");
    assert_eq!(
        workbook.sheet_names(),
        vec!["output".to_string(), "Output_1".to_string()]
    );
}

#[test]
fn overlong_name_for_new_workbook_explains_the_limit() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("fresh.xlsx");

    let err = save_table(
        &sample_df(),
        &request(&path, EnumOutputMode::New, Some("Quarterly Revenue EU")),
    )
    .expect_err("stamped name exceeds 31 characters");
    assert!(matches!(err, SaveError::UnexpectedWrite { .. }));
    assert!(err.user_message().contains("at most 31 characters"));
    assert!(err.user_message().contains("Quarterly Revenue EU_"));
    assert!(!path.exists());
}
