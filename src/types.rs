use crate::error::TrackerResult;
use crate::layout::{ForecastField, OutputColumn};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

//==============================================================================
// Cell Values
//==============================================================================

/// A single worksheet cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Serialized as YYYY-MM-DD
    Date(NaiveDate),
    /// Spreadsheet error literal such as `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// Empty cells and empty strings are both blank
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Dates come back either typed or as raw serial numbers, depending on
    /// whether the engine saw a date number format on the cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Number(n) => excel_serial_to_date(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "Empty",
            CellValue::Text(_) => "Text",
            CellValue::Number(_) => "Number",
            CellValue::Bool(_) => "Boolean",
            CellValue::Date(_) => "Date",
            CellValue::Error(_) => "Error",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

//==============================================================================
// Excel 1900 date system
//==============================================================================

/// Convert an Excel serial (1900 date system) to a date.
///
/// Serial 60 is Excel's phantom 1900-02-29; it maps to 1900-02-28.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let base = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let days = if days == 60 { 59 } else { days };
    base.checked_add_days(Days::new(days as u64))
}

/// Days from 0001-01-01 to 1899-12-30, the serial-zero date
const EXCEL_EPOCH_DAYS_FROM_CE: i32 = 693_594;

/// Convert a date to its Excel serial (1900 date system)
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    let mut days = date.num_days_from_ce() - EXCEL_EPOCH_DAYS_FROM_CE;
    if date.year() == 1900 && date.month() <= 2 {
        days -= 1;
    }
    days as f64
}

//==============================================================================
// Forecast Input
//==============================================================================

/// Field values for one new row of the "Forecast input" sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastInput {
    values: BTreeMap<ForecastField, CellValue>,
}

impl ForecastInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: ForecastField, value: impl Into<CellValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: ForecastField, value: impl Into<CellValue>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: ForecastField) -> Option<&CellValue> {
        self.values.get(&field)
    }

    /// Present fields in column order
    pub fn iter(&self) -> impl Iterator<Item = (ForecastField, &CellValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build from string-keyed pairs, validating every key.
    ///
    /// Keys are exact header strings or identifier keys (see
    /// [`ForecastField::resolve`]). The first unknown key aborts with
    /// `SchemaMismatch`; nothing is partially accepted.
    pub fn from_named<I, K, V>(pairs: I) -> TrackerResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CellValue>,
    {
        let mut input = Self::new();
        for (name, value) in pairs {
            let field = ForecastField::resolve(name.as_ref())?;
            input.set(field, value);
        }
        Ok(input)
    }
}

//==============================================================================
// Forecast Output
//==============================================================================

/// Month / Monthly Forecast / Cumulative, as stored in P:R
pub type RawForecastRow = [CellValue; 3];

/// One typed row of the output block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutputRow {
    /// Worksheet row the values came from (1-based)
    pub row: u32,
    pub month: Option<NaiveDate>,
    pub monthly_forecast: Option<f64>,
    pub cumulative: Option<f64>,
}

impl ForecastOutputRow {
    pub fn from_raw(row: u32, raw: &RawForecastRow) -> Self {
        Self {
            row,
            month: raw[0].as_date(),
            monthly_forecast: raw[1].as_number(),
            cumulative: raw[2].as_number(),
        }
    }
}

/// Output block with named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<ForecastOutputRow>,
}

impl ForecastTable {
    pub fn new(rows: Vec<ForecastOutputRow>) -> Self {
        Self {
            columns: OutputColumn::ALL.iter().map(|c| c.header()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the Monthly Forecast column; non-numeric cells count as zero
    pub fn monthly_total(&self) -> f64 {
        self.rows.iter().filter_map(|r| r.monthly_forecast).sum()
    }

    /// Cumulative value of the last row
    pub fn final_cumulative(&self) -> Option<f64> {
        self.rows.last().and_then(|r| r.cumulative)
    }
}

/// Result of reading the output block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForecastOutput {
    Table(ForecastTable),
    Raw(Vec<RawForecastRow>),
}

impl ForecastOutput {
    pub fn len(&self) -> usize {
        match self {
            ForecastOutput::Table(t) => t.len(),
            ForecastOutput::Raw(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
