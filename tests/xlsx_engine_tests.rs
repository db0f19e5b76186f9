//! .xlsx round-trip tests
//!
//! Fixtures are generated with `TrackerTemplate`, then edited in place through
//! `XlsxEngine` and re-opened from disk.

use chrono::NaiveDate;
use forecast_tracker::excel::{TrackerTemplate, XlsxEngine};
use forecast_tracker::layout::{ForecastField, SheetLayout, INPUT_SHEET, OUTPUT_SHEET};
use forecast_tracker::{CellValue, ForecastInput, ForecastOutput, TrackerError, WorkbookAccessor};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seeded_tracker(dir: &Path) -> PathBuf {
    let path = dir.join("Sales forecast tracker.xlsx");
    TrackerTemplate::default()
        .with_input_row(
            ForecastInput::new()
                .with(ForecastField::OpportunityName, "Contoso")
                .with(ForecastField::ForecastAmount, 20000.0)
                .with(ForecastField::ForecastClose, date(2027, 1, 20)),
        )
        .with_output_row([
            CellValue::Date(date(2027, 1, 1)),
            CellValue::Number(15000.0),
            CellValue::Number(15000.0),
        ])
        .with_output_row([
            CellValue::Date(date(2027, 2, 1)),
            CellValue::Number(7500.5),
            CellValue::Number(22500.5),
        ])
        .save(&path)
        .unwrap();
    path
}

fn open(path: &Path) -> WorkbookAccessor {
    WorkbookAccessor::open(&XlsxEngine::new(), path, SheetLayout::default()).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// APPEND ROUND-TRIP TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_append_persists_to_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());

    let mut tracker = open(&path);
    let row = tracker
        .append_forecast_input_row(
            &ForecastInput::new()
                .with(ForecastField::OpportunityName, "Agent Test Corp")
                .with(ForecastField::SalesAgent, "Jules")
                .with(ForecastField::ForecastAmount, 50000.0)
                .with(ForecastField::ProbabilityOfSale, 0.75)
                .with(ForecastField::ForecastClose, date(2027, 3, 1)),
        )
        .unwrap();
    assert_eq!(row, 8);
    tracker.close().unwrap();

    let reopened = open(&path);
    let values = reopened
        .read_range(&format!("'{INPUT_SHEET}'!B8:I8"))
        .unwrap();
    let row = &values[0];
    assert_eq!(row[0], CellValue::Text("Agent Test Corp".to_string()));
    assert_eq!(row[1], CellValue::Text("Jules".to_string()));
    assert_eq!(row[2], CellValue::Empty);
    assert_eq!(row[4].as_number(), Some(50000.0));
    assert_eq!(row[6].as_number(), Some(0.75));
    assert_eq!(row[7].as_date(), Some(date(2027, 3, 1)));
}

#[test]
fn test_consecutive_appends_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());

    let mut tracker = open(&path);
    let first = tracker.append_named([("Opportunity name", "One")]).unwrap();
    let second = tracker.append_named([("Opportunity name", "Two")]).unwrap();
    tracker.close().unwrap();
    assert_eq!((first, second), (8, 9));

    // A fresh accessor sees both rows
    let mut tracker = open(&path);
    assert_eq!(tracker.next_input_row().unwrap(), 10);
    assert_eq!(tracker.append_named([("opportunity_name", "Three")]).unwrap(), 10);
}

#[test]
fn test_header_with_newline_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());

    let tracker = open(&path);
    let structure = tracker.inspect_structure(5).unwrap();
    assert_eq!(
        structure.input.headers[1],
        CellValue::Text("Sales \nagent".to_string())
    );
    assert_eq!(structure.input.sample.len(), 1);
    assert_eq!(structure.sheet_names, vec![INPUT_SHEET, OUTPUT_SHEET]);
}

#[test]
fn test_unknown_field_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());
    let before = fs::read(&path).unwrap();

    let mut tracker = open(&path);
    let result = tracker.append_named([
        ("Opportunity name", CellValue::from("Tailspin")),
        ("Budget", CellValue::from(1.0)),
    ]);
    assert!(matches!(result, Err(TrackerError::SchemaMismatch { .. })));
    tracker.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), before);
}

// ═══════════════════════════════════════════════════════════════════════════
// BLANK CELL TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_empty_string_marker_counts_as_free() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());

    // Store a real "" cell in B8, the way other editors leave cleared cells
    let mut book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
    book.get_sheet_by_name_mut(INPUT_SHEET)
        .unwrap()
        .get_cell_mut("B8")
        .set_value_string("");
    umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

    let mut tracker = open(&path);
    let marker = tracker
        .read_range(&format!("'{INPUT_SHEET}'!B8"))
        .unwrap();
    assert!(marker[0][0].is_blank());
    assert_eq!(tracker.next_input_row().unwrap(), 8);
    assert_eq!(tracker.append_named([("Opportunity name", "Fills B8")]).unwrap(), 8);
}

#[test]
fn test_append_clears_stale_value_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stale.xlsx");
    TrackerTemplate::default()
        .with_input_row(ForecastInput::new().with(ForecastField::OpportunityName, "Contoso"))
        // Row 8 has no opportunity name but a leftover amount in F8
        .with_input_row(ForecastInput::new().with(ForecastField::ForecastAmount, 999.0))
        .save(&path)
        .unwrap();

    let mut tracker = open(&path);
    let row = tracker
        .append_named([("Opportunity name", "Tailspin")])
        .unwrap();
    assert_eq!(row, 8);
    tracker.close().unwrap();

    let reopened = open(&path);
    let values = reopened
        .read_range(&format!("'{INPUT_SHEET}'!B8:F8"))
        .unwrap();
    assert_eq!(values[0][0], CellValue::Text("Tailspin".to_string()));
    assert_eq!(values[0][4], CellValue::Empty);
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTPUT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_read_forecast_output_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());
    let tracker = open(&path);

    let table = match tracker.read_forecast_output(true).unwrap() {
        ForecastOutput::Table(table) => table,
        other => panic!("Expected table, got {:?}", other),
    };
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0].month, Some(date(2027, 1, 1)));
    assert_eq!(table.rows[1].monthly_forecast, Some(7500.5));
    assert_eq!(table.final_cumulative(), Some(22500.5));

    let direct: f64 = tracker
        .read_range("Q7:Q8")
        .unwrap()
        .iter()
        .filter_map(|row| row[0].as_number())
        .sum();
    assert_eq!(table.monthly_total(), direct);
}

#[test]
fn test_read_range_p7_r9_shape() {
    let temp_dir = TempDir::new().unwrap();
    let path = seeded_tracker(temp_dir.path());
    let tracker = open(&path);

    let values = tracker.read_range("$P$7:$R$9").unwrap();
    assert_eq!(values.len(), 3);
    assert!(values.iter().all(|row| row.len() == 3));
    assert_eq!(values[0][1], CellValue::Number(15000.0));
    assert_eq!(values[2], vec![CellValue::Empty; 3]);
}

#[test]
fn test_month_block_template_reads_cached_results() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blank.xlsx");
    TrackerTemplate::default()
        .with_month_block(date(2027, 1, 15), 4)
        .save(&path)
        .unwrap();

    let tracker = open(&path);
    let table = match tracker.read_forecast_output(true).unwrap() {
        ForecastOutput::Table(table) => table,
        other => panic!("Expected table, got {:?}", other),
    };
    assert_eq!(table.len(), 4);
    assert_eq!(table.rows[0].month, Some(date(2027, 1, 1)));
    assert_eq!(table.rows[3].month, Some(date(2027, 4, 1)));
    assert_eq!(table.monthly_total(), 0.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_open_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = WorkbookAccessor::open(
        &XlsxEngine::new(),
        temp_dir.path().join("missing.xlsx"),
        SheetLayout::default(),
    );
    assert!(matches!(result, Err(TrackerError::FileNotFound(_))));
}

#[test]
fn test_open_wrong_sheets() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("other.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    workbook.add_worksheet().set_name("Sheet1").unwrap();
    workbook.save(&path).unwrap();

    let result = WorkbookAccessor::open(&XlsxEngine::new(), &path, SheetLayout::default());
    match result {
        Err(TrackerError::SheetNotFound(name)) => assert_eq!(name, INPUT_SHEET),
        Err(other) => panic!("Expected SheetNotFound, got {:?}", other),
        Ok(_) => panic!("Expected SheetNotFound"),
    }
}

#[cfg(unix)]
#[test]
fn test_save_into_removed_directory_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let work_dir = temp_dir.path().join("work");
    fs::create_dir(&work_dir).unwrap();
    let path = seeded_tracker(&work_dir);

    let mut tracker = open(&path);
    fs::remove_dir_all(&work_dir).unwrap();

    let result = tracker.append_named([("Opportunity name", "Lost")]);
    assert!(matches!(result, Err(TrackerError::Io(_))));
}
