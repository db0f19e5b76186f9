//! Forecast tracker - read and write a fixed-layout sales forecast workbook
//!
//! The workbook has a "Forecast input" sheet (one opportunity per row, headers
//! in row 6, columns B:J) and a "Sales forecast" sheet (Month, Monthly
//! Forecast and Cumulative in P:R). This crate appends opportunities and reads
//! the computed forecast back.
//!
//! # Example
//!
//! ```no_run
//! use forecast_tracker::excel::XlsxEngine;
//! use forecast_tracker::layout::{ForecastField, SheetLayout};
//! use forecast_tracker::{ForecastInput, WorkbookAccessor};
//!
//! let engine = XlsxEngine::new();
//! let mut tracker = WorkbookAccessor::open(&engine, "tracker.xlsx", SheetLayout::default())?;
//!
//! let row = tracker.append_forecast_input_row(
//!     &ForecastInput::new()
//!         .with(ForecastField::OpportunityName, "Agent Test Corp")
//!         .with(ForecastField::ForecastAmount, 50000.0),
//! )?;
//! println!("Added row {}", row);
//!
//! let output = tracker.read_forecast_output(true)?;
//! println!("Forecast rows: {}", output.len());
//! tracker.close()?;
//! # Ok::<(), forecast_tracker::TrackerError>(())
//! ```

pub mod accessor;
pub mod cli;
pub mod config;
pub mod error;
pub mod excel;
pub mod layout;
pub mod types;

// Re-export commonly used types
pub use accessor::{WorkbookAccessor, WorkbookStructure};
pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use types::{CellValue, ForecastInput, ForecastOutput, ForecastOutputRow, ForecastTable};
