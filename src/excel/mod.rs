//! Spreadsheet backends
//!
//! - `address`: A1 cell and range notation
//! - `engine`: capability traits the accessor is written against
//! - `xlsx`: .xlsx files (calamine reads, umya-spreadsheet in-place edits)
//! - `memory`: in-memory workbooks
//! - `template`: new tracker workbooks (rust_xlsxwriter)

pub mod address;
pub mod engine;
pub mod memory;
pub mod template;
pub mod xlsx;

pub use address::{CellRange, CellRef};
pub use engine::{by_name, SpreadsheetEngine, WorkbookHandle};
pub use memory::{MemoryEngine, MemoryWorkbook};
pub use template::TrackerTemplate;
pub use xlsx::XlsxEngine;
