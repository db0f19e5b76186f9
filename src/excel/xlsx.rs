//! .xlsx file engine
//!
//! Reads go through a calamine snapshot of the file on disk, overlaid with
//! writes made since the last save. Writes are applied to a umya-spreadsheet
//! document, which keeps formulas, styles and the untouched sheets intact when
//! the file is written back in place.

use crate::error::{TrackerError, TrackerResult};
use crate::excel::address::CellRef;
use crate::excel::engine::{closed_error, SpreadsheetEngine, WorkbookHandle};
use crate::types::{date_to_excel_serial, excel_serial_to_date, CellValue};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use umya_spreadsheet::Spreadsheet;

/// Number format applied to cells written from a date
pub const DATE_FORMAT_CODE: &str = "yyyy-mm-dd";

/// Engine for .xlsx / .xlsm workbooks
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxEngine;

impl XlsxEngine {
    pub fn new() -> Self {
        Self
    }

    fn check_format(path: &Path) -> TrackerResult<()> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => Ok(()),
            Some(other) => Err(TrackerError::EngineUnavailable(format!(
                "the xlsx engine cannot edit .{other} files"
            ))),
            None => Err(TrackerError::EngineUnavailable(format!(
                "cannot tell the format of {} (no extension)",
                path.display()
            ))),
        }
    }
}

impl SpreadsheetEngine for XlsxEngine {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn open(&self, path: &Path) -> TrackerResult<Box<dyn WorkbookHandle>> {
        if !path.exists() {
            return Err(TrackerError::FileNotFound(path.to_path_buf()));
        }
        Self::check_format(path)?;

        let document = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| TrackerError::Io(format!("Failed to open Excel file: {}", e)))?;
        let snapshot = Snapshot::load(path)?;
        info!(path = %path.display(), sheets = snapshot.sheets.len(), "opened workbook");

        Ok(Box::new(XlsxHandle {
            path: path.to_path_buf(),
            state: Some(OpenState {
                document,
                snapshot,
                pending: HashMap::new(),
            }),
        }))
    }
}

/// Cell values of every sheet as last saved
struct Snapshot {
    sheets: Vec<(String, Range<Data>)>,
}

impl Snapshot {
    fn load(path: &Path) -> TrackerResult<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| TrackerError::Io(format!("Failed to read Excel file: {}", e)))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| TrackerError::Io(format!("Failed to read worksheet {}: {}", name, e)))?;
            sheets.push((name, range));
        }

        Ok(Self { sheets })
    }

    fn range(&self, sheet: &str) -> Option<&Range<Data>> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, range)| range)
    }
}

struct OpenState {
    document: Spreadsheet,
    snapshot: Snapshot,
    /// Writes since the last save, keyed by (sheet, cell)
    pending: HashMap<(String, CellRef), CellValue>,
}

struct XlsxHandle {
    path: PathBuf,
    state: Option<OpenState>,
}

impl XlsxHandle {
    fn state(&self) -> TrackerResult<&OpenState> {
        self.state.as_ref().ok_or_else(|| closed_error(&self.path))
    }

    fn state_mut(&mut self) -> TrackerResult<&mut OpenState> {
        let path = &self.path;
        self.state.as_mut().ok_or_else(|| closed_error(path))
    }
}

impl WorkbookHandle for XlsxHandle {
    fn sheet_names(&self) -> TrackerResult<Vec<String>> {
        let state = self.state()?;
        Ok(state.snapshot.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_cell(&self, sheet: &str, cell: CellRef) -> TrackerResult<CellValue> {
        let state = self.state()?;
        if let Some(value) = state.pending.get(&(sheet.to_string(), cell)) {
            return Ok(value.clone());
        }

        let range = state
            .snapshot
            .range(sheet)
            .ok_or_else(|| TrackerError::SheetNotFound(sheet.to_string()))?;

        Ok(range
            .get_value((cell.row - 1, cell.col - 1))
            .map(convert_data)
            .unwrap_or(CellValue::Empty))
    }

    fn write_cell(&mut self, sheet: &str, cell: CellRef, value: &CellValue) -> TrackerResult<()> {
        let state = self.state_mut()?;
        let worksheet = state
            .document
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| TrackerError::SheetNotFound(sheet.to_string()))?;

        let coordinate = (cell.col, cell.row);
        match value {
            CellValue::Empty => {
                // Drop the cell entirely; an empty-string cell is not blank to Excel
                worksheet.remove_cell(coordinate);
            }
            CellValue::Text(s) | CellValue::Error(s) => {
                worksheet.get_cell_mut(coordinate).set_value_string(s.clone());
            }
            CellValue::Number(n) => {
                worksheet.get_cell_mut(coordinate).set_value_number(*n);
            }
            CellValue::Bool(b) => {
                worksheet.get_cell_mut(coordinate).set_value_bool(*b);
            }
            CellValue::Date(d) => {
                worksheet
                    .get_cell_mut(coordinate)
                    .set_value_number(date_to_excel_serial(*d));
                worksheet
                    .get_style_mut(coordinate)
                    .get_number_format_mut()
                    .set_format_code(DATE_FORMAT_CODE);
            }
        }

        debug!(sheet, cell = %cell, kind = value.type_name(), "wrote cell");
        state.pending.insert((sheet.to_string(), cell), value.clone());
        Ok(())
    }

    fn save(&mut self) -> TrackerResult<()> {
        let path = self.path.clone();
        let state = self.state_mut()?;

        umya_spreadsheet::writer::xlsx::write(&state.document, &path)
            .map_err(|e| TrackerError::Io(format!("Failed to save Excel file: {}", e)))?;

        state.snapshot = Snapshot::load(&path)?;
        let written = state.pending.len();
        state.pending.clear();
        info!(path = %path.display(), cells = written, "saved workbook");
        Ok(())
    }

    fn close(&mut self) -> TrackerResult<()> {
        if self.state.take().is_some() {
            debug!(path = %self.path.display(), "closed workbook");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.is_none()
    }
}

/// Convert a calamine cell to a [`CellValue`]
fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_date(serial)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Number(serial))
        }
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_convert_data_scalars() {
        assert_eq!(convert_data(&Data::Empty), CellValue::Empty);
        assert_eq!(convert_data(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(convert_data(&Data::Float(0.75)), CellValue::Number(0.75));
        assert_eq!(
            convert_data(&Data::String("Jules".to_string())),
            CellValue::Text("Jules".to_string())
        );
        assert_eq!(convert_data(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_convert_data_iso_date() {
        assert_eq!(
            convert_data(&Data::DateTimeIso("2027-01-01T00:00:00".to_string())),
            CellValue::Date(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_open_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = XlsxEngine::new().open(&temp_dir.path().join("missing.xlsx"));
        assert!(matches!(result, Err(TrackerError::FileNotFound(_))));
    }

    #[test]
    fn test_open_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tracker.ods");
        std::fs::write(&path, b"not a workbook").unwrap();

        let result = XlsxEngine::new().open(&path);
        assert!(matches!(result, Err(TrackerError::EngineUnavailable(_))));
    }

    #[test]
    fn test_open_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tracker.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let result = XlsxEngine::new().open(&path);
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }
}
