//! In-memory spreadsheet engine
//!
//! Workbooks live in a path-keyed map shared by every clone of the engine.
//! A handle edits a private working copy; `save` publishes it back.

use crate::error::{TrackerError, TrackerResult};
use crate::excel::address::CellRef;
use crate::excel::engine::{closed_error, SpreadsheetEngine, WorkbookHandle};
use crate::types::CellValue;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Sheets of an in-memory workbook, in tab order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, BTreeMap<CellRef, CellValue>)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty sheet (no-op if it already exists)
    pub fn with_sheet(mut self, name: &str) -> Self {
        if self.sheet(name).is_none() {
            self.sheets.push((name.to_string(), BTreeMap::new()));
        }
        self
    }

    /// Set a cell by A1 address, creating the sheet if needed
    pub fn set_cell(
        &mut self,
        sheet: &str,
        address: &str,
        value: impl Into<CellValue>,
    ) -> TrackerResult<()> {
        let cell = CellRef::parse(address)?;
        if self.sheet(sheet).is_none() {
            self.sheets.push((sheet.to_string(), BTreeMap::new()));
        }
        self.set(sheet, cell, value.into());
        Ok(())
    }

    /// Builder form of [`set_cell`](Self::set_cell) for test fixtures.
    ///
    /// Panics on a malformed address.
    #[doc(hidden)]
    pub fn with_cell(mut self, sheet: &str, address: &str, value: impl Into<CellValue>) -> Self {
        if let Err(e) = self.set_cell(sheet, address, value) {
            panic!("fixture address {address:?}: {e}");
        }
        self
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, sheet: &str, cell: CellRef) -> Option<&CellValue> {
        self.sheet(sheet).and_then(|cells| cells.get(&cell))
    }

    fn sheet(&self, name: &str) -> Option<&BTreeMap<CellRef, CellValue>> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, cells)| cells)
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut BTreeMap<CellRef, CellValue>> {
        self.sheets
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| cells)
    }

    fn set(&mut self, sheet: &str, cell: CellRef, value: CellValue) -> bool {
        match self.sheet_mut(sheet) {
            Some(cells) => {
                if value.is_blank() {
                    cells.remove(&cell);
                } else {
                    cells.insert(cell, value);
                }
                true
            }
            None => false,
        }
    }
}

/// Path-keyed in-memory engine
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    files: Rc<RefCell<HashMap<PathBuf, MemoryWorkbook>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>>(&self, path: P, workbook: MemoryWorkbook) {
        self.files
            .borrow_mut()
            .insert(path.as_ref().to_path_buf(), workbook);
    }

    /// Saved state of a workbook
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<MemoryWorkbook> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    /// Drop a workbook; open handles can no longer save to it
    pub fn remove<P: AsRef<Path>>(&self, path: P) -> Option<MemoryWorkbook> {
        self.files.borrow_mut().remove(path.as_ref())
    }
}

impl SpreadsheetEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, path: &Path) -> TrackerResult<Box<dyn WorkbookHandle>> {
        let workbook = self
            .get(path)
            .ok_or_else(|| TrackerError::FileNotFound(path.to_path_buf()))?;
        debug!(path = %path.display(), sheets = workbook.sheets.len(), "opened in-memory workbook");

        Ok(Box::new(MemoryHandle {
            path: path.to_path_buf(),
            files: Rc::clone(&self.files),
            workbook,
            closed: false,
        }))
    }
}

struct MemoryHandle {
    path: PathBuf,
    files: Rc<RefCell<HashMap<PathBuf, MemoryWorkbook>>>,
    workbook: MemoryWorkbook,
    closed: bool,
}

impl MemoryHandle {
    fn ensure_open(&self) -> TrackerResult<()> {
        if self.closed {
            return Err(closed_error(&self.path));
        }
        Ok(())
    }
}

impl WorkbookHandle for MemoryHandle {
    fn sheet_names(&self) -> TrackerResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.workbook.sheet_names())
    }

    fn read_cell(&self, sheet: &str, cell: CellRef) -> TrackerResult<CellValue> {
        self.ensure_open()?;
        let cells = self
            .workbook
            .sheet(sheet)
            .ok_or_else(|| TrackerError::SheetNotFound(sheet.to_string()))?;
        Ok(cells.get(&cell).cloned().unwrap_or(CellValue::Empty))
    }

    fn write_cell(&mut self, sheet: &str, cell: CellRef, value: &CellValue) -> TrackerResult<()> {
        self.ensure_open()?;
        if !self.workbook.set(sheet, cell, value.clone()) {
            return Err(TrackerError::SheetNotFound(sheet.to_string()));
        }
        Ok(())
    }

    fn save(&mut self) -> TrackerResult<()> {
        self.ensure_open()?;
        let mut files = self.files.borrow_mut();
        match files.get_mut(&self.path) {
            Some(saved) => {
                *saved = self.workbook.clone();
                Ok(())
            }
            None => Err(TrackerError::Io(format!(
                "workbook {} is no longer reachable",
                self.path.display()
            ))),
        }
    }

    fn close(&mut self) -> TrackerResult<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_book() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.insert(
            "book.xlsx",
            MemoryWorkbook::new()
                .with_sheet("Data")
                .with_cell("Data", "A1", "hello"),
        );
        engine
    }

    #[test]
    fn test_open_missing_path() {
        let engine = MemoryEngine::new();
        assert!(matches!(
            engine.open(Path::new("missing.xlsx")),
            Err(TrackerError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_writes_are_private_until_save() {
        let engine = engine_with_book();
        let mut handle = engine.open(Path::new("book.xlsx")).unwrap();

        handle
            .write_cell("Data", CellRef::new(2, 1), &CellValue::Number(42.0))
            .unwrap();
        assert_eq!(
            handle.read_cell("Data", CellRef::new(2, 1)).unwrap(),
            CellValue::Number(42.0)
        );
        assert_eq!(engine.get("book.xlsx").unwrap().get("Data", CellRef::new(2, 1)), None);

        handle.save().unwrap();
        assert_eq!(
            engine.get("book.xlsx").unwrap().get("Data", CellRef::new(2, 1)),
            Some(&CellValue::Number(42.0))
        );
    }

    #[test]
    fn test_writing_blank_clears_cell() {
        let engine = engine_with_book();
        let mut handle = engine.open(Path::new("book.xlsx")).unwrap();
        handle
            .write_cell("Data", CellRef::new(1, 1), &CellValue::Empty)
            .unwrap();
        assert_eq!(
            handle.read_cell("Data", CellRef::new(1, 1)).unwrap(),
            CellValue::Empty
        );
    }

    #[test]
    fn test_set_cell_rejects_bad_address() {
        let mut book = MemoryWorkbook::new();
        let result = book.set_cell("Data", "B0", 1.0);
        assert!(matches!(result, Err(TrackerError::InvalidRange { .. })));
        assert!(book.sheet_names().is_empty());

        book.set_cell("Data", "$B$2", "ok").unwrap();
        assert_eq!(
            book.get("Data", CellRef::new(2, 2)),
            Some(&CellValue::Text("ok".to_string()))
        );
    }

    #[test]
    fn test_unknown_sheet() {
        let engine = engine_with_book();
        let handle = engine.open(Path::new("book.xlsx")).unwrap();
        assert!(matches!(
            handle.read_cell("Other", CellRef::new(1, 1)),
            Err(TrackerError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_closed_handle_rejects_calls() {
        let engine = engine_with_book();
        let mut handle = engine.open(Path::new("book.xlsx")).unwrap();
        handle.close().unwrap();
        assert!(handle.is_closed());
        assert!(matches!(
            handle.read_cell("Data", CellRef::new(1, 1)),
            Err(TrackerError::Io(_))
        ));
    }

    #[test]
    fn test_save_after_removal_fails() {
        let engine = engine_with_book();
        let mut handle = engine.open(Path::new("book.xlsx")).unwrap();
        engine.remove("book.xlsx");
        assert!(matches!(handle.save(), Err(TrackerError::Io(_))));
    }
}
