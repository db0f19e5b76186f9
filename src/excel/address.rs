//! A1-style cell and range addresses

use crate::error::{TrackerError, TrackerResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Last row of an .xlsx worksheet
pub const MAX_ROWS: u32 = 1_048_576;
/// Last column of an .xlsx worksheet (XFD)
pub const MAX_COLUMNS: u32 = 16_384;
/// Most cells a single range read may return
pub const MAX_RANGE_CELLS: u64 = 1_000_000;

fn cell_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").expect("cell address pattern compiles")
    })
}

/// Convert a column letter to its 1-based number (A→1, Z→26, AA→27)
pub fn column_letter_to_index(letters: &str) -> u32 {
    letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A') as u32 + 1)
}

/// Convert a 1-based column number to its letter (1→A, 26→Z, 27→AA)
pub fn column_index_to_letter(index: u32) -> String {
    let mut result = String::new();
    let mut num = index;

    while num > 0 {
        let remainder = (num - 1) % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        num = (num - 1) / 26;
    }

    result
}

/// A single cell position, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn parse(address: &str) -> TrackerResult<Self> {
        let caps = cell_pattern()
            .captures(address.trim())
            .ok_or_else(|| TrackerError::invalid_range(address, "not an A1-style cell address"))?;

        let col = column_letter_to_index(&caps[1]);
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| TrackerError::invalid_range(address, "row number out of range"))?;

        if row == 0 || row > MAX_ROWS {
            return Err(TrackerError::invalid_range(
                address,
                format!("row {row} is outside 1..={MAX_ROWS}"),
            ));
        }
        if col > MAX_COLUMNS {
            return Err(TrackerError::invalid_range(
                address,
                format!("column {} is beyond XFD", &caps[1]),
            ));
        }

        Ok(Self { row, col })
    }

    pub fn column_letter(&self) -> String {
        column_index_to_letter(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letter(), self.row)
    }
}

/// A rectangular range, optionally qualified with a sheet name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: Option<String>,
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Parse `P7:R12`, `$P$7:$R$12`, `P7`, `Sheet1!A1:B2` or `'Sales forecast'!P7:R9`.
    ///
    /// Corners are normalised so that `start` is the top-left cell.
    pub fn parse(address: &str) -> TrackerResult<Self> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(TrackerError::invalid_range(address, "empty address"));
        }

        let (sheet, cells) = match trimmed.rfind('!') {
            Some(pos) => (
                Some(Self::parse_sheet_name(address, &trimmed[..pos])?),
                &trimmed[pos + 1..],
            ),
            None => (None, trimmed),
        };

        let mut parts = cells.split(':');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(TrackerError::invalid_range(address, "too many ':' separators"));
        }

        let a = CellRef::parse(first).map_err(|_| {
            TrackerError::invalid_range(address, format!("bad start cell {first:?}"))
        })?;
        let b = match second {
            Some(cell) => CellRef::parse(cell).map_err(|_| {
                TrackerError::invalid_range(address, format!("bad end cell {cell:?}"))
            })?,
            None => a,
        };

        Ok(Self {
            sheet,
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        })
    }

    fn parse_sheet_name(address: &str, raw: &str) -> TrackerResult<String> {
        let name = match raw.strip_prefix('\'') {
            Some(rest) => rest
                .strip_suffix('\'')
                .ok_or_else(|| TrackerError::invalid_range(address, "unterminated sheet quote"))?
                .replace("''", "'"),
            None => raw.to_string(),
        };
        if name.is_empty() {
            return Err(TrackerError::invalid_range(address, "empty sheet name"));
        }
        Ok(name)
    }

    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// Number of cells covered; a full sheet does not fit in u32
    pub fn cell_count(&self) -> u64 {
        u64::from(self.height()) * u64::from(self.width())
    }

    /// Cell positions grouped by row, top to bottom, left to right
    pub fn rows(&self) -> impl Iterator<Item = Vec<CellRef>> + '_ {
        (self.start.row..=self.end.row)
            .map(move |row| (self.start.col..=self.end.col).map(|col| CellRef::new(row, col)).collect())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "'{}'!", sheet.replace('\'', "''"))?;
        }
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
