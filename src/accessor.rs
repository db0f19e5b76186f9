//! Workbook accessor - the single point of contact with a tracker workbook
//!
//! Translates between the named forecast schema and raw cell addresses:
//! - append: first blank cell in column B at or below the data start row is
//!   the target row; each present field goes to its fixed column
//! - output: rows of P:R from the data start row until an all-blank row
//! - ranges: any A1 range, row-major
//!
//! Every call reads the live workbook; nothing is cached here.

use crate::error::{TrackerError, TrackerResult};
use crate::excel::address::{column_index_to_letter, CellRange, CellRef, MAX_RANGE_CELLS, MAX_ROWS};
use crate::excel::engine::{SpreadsheetEngine, WorkbookHandle};
use crate::layout::{ForecastField, OutputColumn, SheetLayout};
use crate::types::{CellValue, ForecastInput, ForecastOutput, ForecastOutputRow, ForecastTable, RawForecastRow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Header and sample rows of one tracked sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetStructure {
    pub name: String,
    pub header_row: u32,
    /// Column letters covered, left to right
    pub columns: Vec<String>,
    pub headers: Vec<CellValue>,
    pub sample: Vec<SampleRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub row: u32,
    pub values: Vec<CellValue>,
}

/// Result of [`WorkbookAccessor::inspect_structure`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookStructure {
    pub path: PathBuf,
    pub sheet_names: Vec<String>,
    pub input: SheetStructure,
    pub output: SheetStructure,
}

/// Owns an open tracker workbook for its lifetime.
///
/// The handle is closed by [`close`](Self::close) or, failing that, on drop.
pub struct WorkbookAccessor {
    path: PathBuf,
    layout: SheetLayout,
    handle: Box<dyn WorkbookHandle>,
}

impl WorkbookAccessor {
    /// Open `path` through `engine` and check both tracked sheets exist
    pub fn open<P: AsRef<Path>>(
        engine: &dyn SpreadsheetEngine,
        path: P,
        layout: SheetLayout,
    ) -> TrackerResult<Self> {
        let path = path.as_ref();
        layout.validate()?;

        let mut handle = engine.open(path)?;
        if let Err(e) = Self::check_sheets(handle.as_ref(), &layout) {
            handle.close()?;
            return Err(e);
        }

        debug!(path = %path.display(), engine = engine.name(), "accessor ready");
        Ok(Self {
            path: path.to_path_buf(),
            layout,
            handle,
        })
    }

    fn check_sheets(handle: &dyn WorkbookHandle, layout: &SheetLayout) -> TrackerResult<()> {
        let names = handle.sheet_names()?;
        for sheet in [&layout.input_sheet, &layout.output_sheet] {
            if !names.iter().any(|n| n == sheet) {
                return Err(TrackerError::SheetNotFound(sheet.clone()));
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Header row and up to `sample_rows` data rows of both sheets.
    ///
    /// Sampling stops early at the first all-blank row.
    pub fn inspect_structure(&self, sample_rows: u32) -> TrackerResult<WorkbookStructure> {
        let input_columns: Vec<u32> = ForecastField::ALL.iter().map(|f| f.column_index()).collect();
        let output_columns: Vec<u32> = OutputColumn::ALL.iter().map(|c| c.column_index()).collect();

        let structure = WorkbookStructure {
            path: self.path.clone(),
            sheet_names: self.handle.sheet_names()?,
            input: self.inspect_sheet(&self.layout.input_sheet, &input_columns, sample_rows)?,
            output: self.inspect_sheet(&self.layout.output_sheet, &output_columns, sample_rows)?,
        };

        info!(
            path = %self.path.display(),
            input_sample = structure.input.sample.len(),
            output_sample = structure.output.sample.len(),
            "inspected workbook structure"
        );
        Ok(structure)
    }

    fn inspect_sheet(&self, sheet: &str, columns: &[u32], sample_rows: u32) -> TrackerResult<SheetStructure> {
        let headers = self.read_row(sheet, self.layout.header_row, columns)?;

        let mut sample = Vec::new();
        for row in (self.layout.data_start_row..).take(sample_rows as usize) {
            let values = self.read_row(sheet, row, columns)?;
            if values.iter().all(CellValue::is_blank) {
                break;
            }
            sample.push(SampleRow { row, values });
        }

        for (col, header) in columns.iter().zip(&headers) {
            debug!(sheet, column = %column_index_to_letter(*col), header = %header, "header");
        }

        Ok(SheetStructure {
            name: sheet.to_string(),
            header_row: self.layout.header_row,
            columns: columns.iter().map(|c| column_index_to_letter(*c)).collect(),
            headers,
            sample,
        })
    }

    fn read_row(&self, sheet: &str, row: u32, columns: &[u32]) -> TrackerResult<Vec<CellValue>> {
        columns
            .iter()
            .map(|col| self.handle.read_cell(sheet, CellRef::new(row, *col)))
            .collect()
    }

    /// Row the next appended opportunity will land on
    pub fn next_input_row(&self) -> TrackerResult<u32> {
        let sheet = &self.layout.input_sheet;
        let marker = self.layout.marker_column();

        let mut row = self.layout.data_start_row;
        loop {
            if self.handle.read_cell(sheet, CellRef::new(row, marker))?.is_blank() {
                return Ok(row);
            }
            if row == MAX_ROWS {
                return Err(TrackerError::Io(format!(
                    "{sheet} has no empty row left in column {}",
                    column_index_to_letter(marker)
                )));
            }
            row += 1;
        }
    }

    /// Write one opportunity below the last occupied row and save.
    ///
    /// Returns the 1-based row written. "Opportunity name" is required: it is
    /// the marker the next append scans for, so a row without it would be
    /// overwritten. Absent fields are left blank.
    pub fn append_forecast_input_row(&mut self, fields: &ForecastInput) -> TrackerResult<u32> {
        let marker = ForecastField::OpportunityName;
        if fields.get(marker).map_or(true, CellValue::is_blank) {
            return Err(TrackerError::SchemaMismatch {
                field: marker.header().to_string(),
                reason: "required field is missing".to_string(),
            });
        }

        let row = self.next_input_row()?;
        let sheet = self.layout.input_sheet.clone();

        for field in ForecastField::ALL {
            let cell = CellRef::new(row, field.column_index());
            match fields.get(field) {
                Some(value) if !value.is_blank() => self.handle.write_cell(&sheet, cell, value)?,
                _ => {
                    if !self.handle.read_cell(&sheet, cell)?.is_blank() {
                        warn!(sheet = %sheet, cell = %cell, "clearing stale value in target row");
                        self.handle.write_cell(&sheet, cell, &CellValue::Empty)?;
                    }
                }
            }
        }

        self.handle.save()?;
        info!(row, fields = fields.len(), "appended forecast input row");
        Ok(row)
    }

    /// Validate string keys, then append.
    ///
    /// Unknown keys are rejected with `SchemaMismatch` before anything is written.
    pub fn append_named<I, K, V>(&mut self, pairs: I) -> TrackerResult<u32>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CellValue>,
    {
        let input = ForecastInput::from_named(pairs)?;
        self.append_forecast_input_row(&input)
    }

    /// Read the Month / Monthly Forecast / Cumulative block.
    ///
    /// `as_table` selects typed rows with named columns; otherwise the raw
    /// cell triples are returned.
    pub fn read_forecast_output(&self, as_table: bool) -> TrackerResult<ForecastOutput> {
        let rows = self.read_output_rows()?;
        debug!(rows = rows.len(), as_table, "read forecast output");

        if as_table {
            let typed = rows
                .iter()
                .map(|(row, raw)| ForecastOutputRow::from_raw(*row, raw))
                .collect();
            Ok(ForecastOutput::Table(ForecastTable::new(typed)))
        } else {
            Ok(ForecastOutput::Raw(rows.into_iter().map(|(_, raw)| raw).collect()))
        }
    }

    fn read_output_rows(&self) -> TrackerResult<Vec<(u32, RawForecastRow)>> {
        let sheet = &self.layout.output_sheet;
        let mut rows = Vec::new();

        for row in self.layout.data_start_row..=MAX_ROWS {
            let raw: RawForecastRow = [
                self.handle.read_cell(sheet, CellRef::new(row, OutputColumn::Month.column_index()))?,
                self.handle.read_cell(sheet, CellRef::new(row, OutputColumn::MonthlyForecast.column_index()))?,
                self.handle.read_cell(sheet, CellRef::new(row, OutputColumn::Cumulative.column_index()))?,
            ];
            if raw.iter().all(CellValue::is_blank) {
                break;
            }
            rows.push((row, raw));
        }

        Ok(rows)
    }

    /// Read a rectangular range, row-major.
    ///
    /// Unqualified addresses read the output sheet; `'Sheet name'!A1:B2`
    /// reads any sheet of the workbook. Ranges over `MAX_RANGE_CELLS` cells
    /// are rejected with `InvalidRange`.
    pub fn read_range(&self, address: &str) -> TrackerResult<Vec<Vec<CellValue>>> {
        let range = CellRange::parse(address)?;
        if range.cell_count() > MAX_RANGE_CELLS {
            return Err(TrackerError::invalid_range(
                address,
                format!(
                    "{} cells requested, at most {} can be read at once",
                    range.cell_count(),
                    MAX_RANGE_CELLS
                ),
            ));
        }
        let sheet = range.sheet.as_deref().unwrap_or(self.layout.output_sheet.as_str());
        debug!(sheet, range = %range, "reading range");

        range
            .rows()
            .map(|cells| {
                cells
                    .into_iter()
                    .map(|cell| self.handle.read_cell(sheet, cell))
                    .collect()
            })
            .collect()
    }

    /// Release the workbook
    pub fn close(mut self) -> TrackerResult<()> {
        self.handle.close()
    }
}

impl Drop for WorkbookAccessor {
    fn drop(&mut self) {
        if !self.handle.is_closed() {
            if let Err(e) = self.handle.close() {
                warn!(path = %self.path.display(), error = %e, "failed to close workbook");
            }
        }
    }
}
