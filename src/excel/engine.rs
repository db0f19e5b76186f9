//! Spreadsheet engine capability traits
//!
//! The accessor never talks to a file format directly. An engine turns a path
//! into an open [`WorkbookHandle`]; the handle offers cell reads, cell writes,
//! save and close. Backends:
//! - `xlsx`: the .xlsx/.xlsm file format (calamine for reads, umya-spreadsheet
//!   for in-place edits)
//! - `memory`: path-keyed in-memory workbooks

use crate::error::{TrackerError, TrackerResult};
use crate::excel::address::CellRef;
use crate::excel::memory::MemoryEngine;
use crate::excel::xlsx::XlsxEngine;
use crate::types::CellValue;
use std::path::Path;

/// Opens workbooks
pub trait SpreadsheetEngine {
    /// Short name used in configuration and logs
    fn name(&self) -> &'static str;

    /// Open the workbook at `path`.
    ///
    /// Fails with `FileNotFound` for a missing path and `EngineUnavailable`
    /// when this engine cannot serve the file.
    fn open(&self, path: &Path) -> TrackerResult<Box<dyn WorkbookHandle>>;
}

/// An open workbook
pub trait WorkbookHandle {
    fn sheet_names(&self) -> TrackerResult<Vec<String>>;

    fn read_cell(&self, sheet: &str, cell: CellRef) -> TrackerResult<CellValue>;

    fn write_cell(&mut self, sheet: &str, cell: CellRef, value: &CellValue) -> TrackerResult<()>;

    /// Persist all writes made so far
    fn save(&mut self) -> TrackerResult<()>;

    /// Release the workbook without saving. Later calls fail with `Io`.
    fn close(&mut self) -> TrackerResult<()>;

    fn is_closed(&self) -> bool;
}

/// Names accepted by [`by_name`]
pub const ENGINE_NAMES: [&str; 2] = ["xlsx", "memory"];

/// Resolve an engine by its configured name
pub fn by_name(name: &str) -> TrackerResult<Box<dyn SpreadsheetEngine>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "xlsx" => Ok(Box::new(XlsxEngine::new())),
        "memory" => Ok(Box::new(MemoryEngine::new())),
        other => Err(TrackerError::EngineUnavailable(format!(
            "no engine named {other:?} on this platform (available: {})",
            ENGINE_NAMES.join(", ")
        ))),
    }
}

pub(crate) fn closed_error(path: &Path) -> TrackerError {
    TrackerError::Io(format!("workbook {} is closed", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name_known_engines() {
        assert_eq!(by_name("xlsx").unwrap().name(), "xlsx");
        assert_eq!(by_name(" Memory ").unwrap().name(), "memory");
    }

    #[test]
    fn test_by_name_unknown_engine() {
        match by_name("excel-com") {
            Err(TrackerError::EngineUnavailable(msg)) => {
                assert!(msg.contains("excel-com"));
                assert!(msg.contains("xlsx"));
            }
            other => panic!("Expected EngineUnavailable, got {:?}", other.map(|e| e.name())),
        }
    }
}
