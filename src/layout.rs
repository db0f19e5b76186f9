//! Fixed layout of the sales forecast tracker workbook
//!
//! The tracker has two worksheets:
//! - "Forecast input": one opportunity per row, headers in row 6 across B:J
//! - "Sales forecast": computed Month / Monthly Forecast / Cumulative in P:R
//!
//! Column positions are compile-time constants. Sheet names and row offsets
//! default to the stock template and can be overridden through configuration.

use crate::error::{TrackerError, TrackerResult};
use crate::excel::address::column_letter_to_index;
use crate::types::CellValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const INPUT_SHEET: &str = "Forecast input";
pub const OUTPUT_SHEET: &str = "Sales forecast";
pub const HEADER_ROW: u32 = 6;
pub const DATA_START_ROW: u32 = 7;

/// Value kind expected in a forecast input column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

impl FieldKind {
    /// Parse command-line text into a cell value of this kind.
    ///
    /// Empty text is always accepted and yields a blank cell.
    pub fn parse_value(self, raw: &str) -> TrackerResult<CellValue> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(CellValue::Empty);
        }

        match self {
            FieldKind::Text => Ok(CellValue::Text(raw.to_string())),
            FieldKind::Number => {
                let cleaned: String = trimmed.chars().filter(|c| *c != ',' && *c != '$').collect();
                if let Some(percent) = cleaned.strip_suffix('%') {
                    return percent
                        .trim()
                        .parse::<f64>()
                        .map(|n| CellValue::Number(n / 100.0))
                        .map_err(|_| TrackerError::Validation(format!("not a number: {raw:?}")));
                }
                cleaned
                    .parse::<f64>()
                    .map(CellValue::Number)
                    .map_err(|_| TrackerError::Validation(format!("not a number: {raw:?}")))
            }
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(CellValue::Date)
                .map_err(|_| {
                    TrackerError::Validation(format!("expected a YYYY-MM-DD date, got {raw:?}"))
                }),
        }
    }
}

/// A column of the "Forecast input" sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForecastField {
    OpportunityName,
    SalesAgent,
    SalesRegion,
    SalesCategory,
    ForecastAmount,
    SalesPhase,
    ProbabilityOfSale,
    ForecastClose,
    WeightedForecast,
}

impl ForecastField {
    /// All fields in column order (B through J)
    pub const ALL: [ForecastField; 9] = [
        ForecastField::OpportunityName,
        ForecastField::SalesAgent,
        ForecastField::SalesRegion,
        ForecastField::SalesCategory,
        ForecastField::ForecastAmount,
        ForecastField::SalesPhase,
        ForecastField::ProbabilityOfSale,
        ForecastField::ForecastClose,
        ForecastField::WeightedForecast,
    ];

    /// Header text exactly as it appears in row 6, embedded newlines included
    pub fn header(self) -> &'static str {
        match self {
            ForecastField::OpportunityName => "Opportunity name",
            ForecastField::SalesAgent => "Sales \nagent",
            ForecastField::SalesRegion => "Sales \nregion",
            ForecastField::SalesCategory => "Sales \ncategory",
            ForecastField::ForecastAmount => "Forecast amount",
            ForecastField::SalesPhase => "Sales \nphase",
            ForecastField::ProbabilityOfSale => "Probability of sale",
            ForecastField::ForecastClose => "Forecast \nclose",
            ForecastField::WeightedForecast => "Weighted forecast",
        }
    }

    /// Identifier-style key, convenient where newlines are awkward (CLI, YAML)
    pub fn key(self) -> &'static str {
        match self {
            ForecastField::OpportunityName => "opportunity_name",
            ForecastField::SalesAgent => "sales_agent",
            ForecastField::SalesRegion => "sales_region",
            ForecastField::SalesCategory => "sales_category",
            ForecastField::ForecastAmount => "forecast_amount",
            ForecastField::SalesPhase => "sales_phase",
            ForecastField::ProbabilityOfSale => "probability_of_sale",
            ForecastField::ForecastClose => "forecast_close",
            ForecastField::WeightedForecast => "weighted_forecast",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            ForecastField::OpportunityName => "B",
            ForecastField::SalesAgent => "C",
            ForecastField::SalesRegion => "D",
            ForecastField::SalesCategory => "E",
            ForecastField::ForecastAmount => "F",
            ForecastField::SalesPhase => "G",
            ForecastField::ProbabilityOfSale => "H",
            ForecastField::ForecastClose => "I",
            ForecastField::WeightedForecast => "J",
        }
    }

    /// 1-based column number
    pub fn column_index(self) -> u32 {
        column_letter_to_index(self.column())
    }

    pub fn kind(self) -> FieldKind {
        match self {
            ForecastField::ForecastAmount
            | ForecastField::ProbabilityOfSale
            | ForecastField::WeightedForecast => FieldKind::Number,
            ForecastField::ForecastClose => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    /// Exact header lookup
    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.header() == header)
    }

    /// Resolve either an exact header string or an identifier key.
    ///
    /// Header matching is exact: "Sales agent" (no newline) is not the
    /// header "Sales \nagent", so it is rejected unless given as `sales_agent`.
    pub fn resolve(name: &str) -> TrackerResult<Self> {
        Self::from_header(name)
            .or_else(|| Self::ALL.into_iter().find(|f| f.key() == name))
            .ok_or_else(|| TrackerError::unknown_field(name))
    }
}

/// A column of the output block on the "Sales forecast" sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputColumn {
    Month,
    MonthlyForecast,
    Cumulative,
}

impl OutputColumn {
    pub const ALL: [OutputColumn; 3] = [
        OutputColumn::Month,
        OutputColumn::MonthlyForecast,
        OutputColumn::Cumulative,
    ];

    pub fn header(self) -> &'static str {
        match self {
            OutputColumn::Month => "Month",
            OutputColumn::MonthlyForecast => "Monthly Forecast",
            OutputColumn::Cumulative => "Cumulative",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            OutputColumn::Month => "P",
            OutputColumn::MonthlyForecast => "Q",
            OutputColumn::Cumulative => "R",
        }
    }

    pub fn column_index(self) -> u32 {
        column_letter_to_index(self.column())
    }
}

/// Sheet names and row offsets of a tracker workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub input_sheet: String,
    pub output_sheet: String,
    pub header_row: u32,
    pub data_start_row: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            input_sheet: INPUT_SHEET.to_string(),
            output_sheet: OUTPUT_SHEET.to_string(),
            header_row: HEADER_ROW,
            data_start_row: DATA_START_ROW,
        }
    }
}

impl SheetLayout {
    pub fn validate(&self) -> TrackerResult<()> {
        if self.input_sheet.trim().is_empty() || self.output_sheet.trim().is_empty() {
            return Err(TrackerError::Config(
                "sheet names must not be empty".to_string(),
            ));
        }
        if self.header_row == 0 {
            return Err(TrackerError::Config("header_row is 1-based".to_string()));
        }
        if self.data_start_row <= self.header_row {
            return Err(TrackerError::Config(format!(
                "data_start_row ({}) must be below header_row ({})",
                self.data_start_row, self.header_row
            )));
        }
        Ok(())
    }

    /// Marker column scanned for the next free input row
    pub fn marker_column(&self) -> u32 {
        ForecastField::OpportunityName.column_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_contiguous_b_to_j() {
        let indexes: Vec<u32> = ForecastField::ALL.iter().map(|f| f.column_index()).collect();
        assert_eq!(indexes, (2..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_headers_keep_embedded_newlines() {
        assert_eq!(ForecastField::SalesAgent.header(), "Sales \nagent");
        assert_eq!(ForecastField::ForecastClose.header(), "Forecast \nclose");
        assert_eq!(
            ForecastField::from_header("Sales \nregion"),
            Some(ForecastField::SalesRegion)
        );
        assert_eq!(ForecastField::from_header("Sales region"), None);
    }

    #[test]
    fn test_resolve_accepts_header_or_key() {
        assert_eq!(
            ForecastField::resolve("Opportunity name").unwrap(),
            ForecastField::OpportunityName
        );
        assert_eq!(
            ForecastField::resolve("weighted_forecast").unwrap(),
            ForecastField::WeightedForecast
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_names() {
        match ForecastField::resolve("Sales agent") {
            Err(TrackerError::SchemaMismatch { field, .. }) => assert_eq!(field, "Sales agent"),
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_output_columns_p_to_r() {
        let indexes: Vec<u32> = OutputColumn::ALL.iter().map(|c| c.column_index()).collect();
        assert_eq!(indexes, vec![16, 17, 18]);
    }

    #[test]
    fn test_parse_value_by_kind() {
        assert_eq!(
            FieldKind::Number.parse_value("$50,000").unwrap(),
            CellValue::Number(50000.0)
        );
        assert_eq!(
            FieldKind::Number.parse_value("75%").unwrap(),
            CellValue::Number(0.75)
        );
        assert_eq!(
            FieldKind::Date.parse_value("2027-01-01").unwrap(),
            CellValue::Date(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap())
        );
        assert_eq!(
            FieldKind::Text.parse_value("US - West").unwrap(),
            CellValue::Text("US - West".to_string())
        );
        assert_eq!(FieldKind::Number.parse_value("  ").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_parse_value_rejects_bad_input() {
        assert!(FieldKind::Number.parse_value("lots").is_err());
        assert!(FieldKind::Date.parse_value("01/01/2027").is_err());
    }

    #[test]
    fn test_layout_validation() {
        assert!(SheetLayout::default().validate().is_ok());

        let layout = SheetLayout {
            data_start_row: 6,
            ..SheetLayout::default()
        };
        assert!(matches!(layout.validate(), Err(TrackerError::Config(_))));
    }
}
