//! Blank tracker workbook generation - writes a fresh .xlsx with the fixed layout

use crate::error::{TrackerError, TrackerResult};
use crate::excel::address::column_index_to_letter;
use crate::layout::{ForecastField, OutputColumn, SheetLayout};
use crate::types::{date_to_excel_serial, CellValue, ForecastInput, RawForecastRow};
use chrono::{Datelike, Months, NaiveDate};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

/// Last input row covered by the generated SUMIFS formulas
const INPUT_FORMULA_LAST_ROW: u32 = 1000;

/// Builder for a new tracker workbook
#[derive(Debug, Clone)]
pub struct TrackerTemplate {
    layout: SheetLayout,
    title: String,
    input_rows: Vec<ForecastInput>,
    output_rows: Vec<RawForecastRow>,
    month_block: Option<(NaiveDate, u32)>,
}

impl Default for TrackerTemplate {
    fn default() -> Self {
        Self::new(SheetLayout::default())
    }
}

impl TrackerTemplate {
    pub fn new(layout: SheetLayout) -> Self {
        Self {
            layout,
            title: "Sales forecast tracker".to_string(),
            input_rows: Vec::new(),
            output_rows: Vec::new(),
            month_block: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Seed an opportunity row below the header
    pub fn with_input_row(mut self, row: ForecastInput) -> Self {
        self.input_rows.push(row);
        self
    }

    /// Seed a literal Month / Monthly Forecast / Cumulative row
    pub fn with_output_row(mut self, row: RawForecastRow) -> Self {
        self.output_rows.push(row);
        self
    }

    /// Generate `months` formula rows starting at the month containing `start`.
    ///
    /// Written below any literal output rows. Monthly Forecast sums the
    /// weighted forecast of opportunities closing in that month; Cumulative
    /// is the running total. Cached results are zero until the workbook is
    /// recalculated by a spreadsheet application.
    pub fn with_month_block(mut self, start: NaiveDate, months: u32) -> Self {
        self.month_block = Some((start, months));
        self
    }

    /// Write the workbook to `path`
    pub fn save(&self, path: &Path) -> TrackerResult<()> {
        self.layout.validate()?;

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold().set_text_wrap();
        let title_format = Format::new().set_bold().set_font_size(18);
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        let input = workbook.add_worksheet();
        input.set_name(&self.layout.input_sheet).map_err(template_error)?;
        self.write_input_sheet(input, &title_format, &header_format, &date_format)?;

        let output = workbook.add_worksheet();
        output.set_name(&self.layout.output_sheet).map_err(template_error)?;
        self.write_output_sheet(output, &title_format, &header_format, &date_format)?;

        workbook
            .save(path)
            .map_err(|e| TrackerError::Io(format!("Failed to save Excel file: {}", e)))?;

        info!(
            path = %path.display(),
            input_rows = self.input_rows.len(),
            output_rows = self.output_rows.len(),
            "created tracker workbook"
        );
        Ok(())
    }

    fn write_input_sheet(
        &self,
        worksheet: &mut Worksheet,
        title_format: &Format,
        header_format: &Format,
        date_format: &Format,
    ) -> TrackerResult<()> {
        worksheet
            .write_string_with_format(1, 1, &self.title, title_format)
            .map_err(template_error)?;

        for field in ForecastField::ALL {
            let col = (field.column_index() - 1) as u16;
            worksheet
                .write_string_with_format(self.layout.header_row - 1, col, field.header(), header_format)
                .map_err(template_error)?;
            worksheet.set_column_width(col, 18).map_err(template_error)?;
        }

        for (offset, row) in self.input_rows.iter().enumerate() {
            let excel_row = self.layout.data_start_row + offset as u32;
            for (field, value) in row.iter() {
                write_value(worksheet, excel_row, field.column_index(), value, date_format)?;
            }
        }

        Ok(())
    }

    fn write_output_sheet(
        &self,
        worksheet: &mut Worksheet,
        title_format: &Format,
        header_format: &Format,
        date_format: &Format,
    ) -> TrackerResult<()> {
        worksheet
            .write_string_with_format(1, 1, &self.title, title_format)
            .map_err(template_error)?;

        for column in OutputColumn::ALL {
            let col = (column.column_index() - 1) as u16;
            worksheet
                .write_string_with_format(self.layout.header_row - 1, col, column.header(), header_format)
                .map_err(template_error)?;
            worksheet.set_column_width(col, 16).map_err(template_error)?;
        }

        let mut excel_row = self.layout.data_start_row;
        for row in &self.output_rows {
            for (column, value) in OutputColumn::ALL.iter().zip(row.iter()) {
                write_value(worksheet, excel_row, column.column_index(), value, date_format)?;
            }
            excel_row += 1;
        }

        if let Some((start, months)) = self.month_block {
            let first_row = excel_row;
            let first_month = start.with_day(1).unwrap_or(start);
            for i in 0..months {
                let month = first_month
                    .checked_add_months(Months::new(i))
                    .ok_or_else(|| TrackerError::Template(format!("month {i} overflows")))?;
                write_value(
                    worksheet,
                    excel_row,
                    OutputColumn::Month.column_index(),
                    &CellValue::Date(month),
                    date_format,
                )?;

                let monthly = Formula::new(self.monthly_formula(excel_row)).set_result("0");
                worksheet
                    .write_formula(excel_row - 1, (OutputColumn::MonthlyForecast.column_index() - 1) as u16, monthly)
                    .map_err(template_error)?;

                let cumulative = if excel_row == first_row {
                    format!("=Q{excel_row}")
                } else {
                    format!("=R{}+Q{}", excel_row - 1, excel_row)
                };
                worksheet
                    .write_formula(
                        excel_row - 1,
                        (OutputColumn::Cumulative.column_index() - 1) as u16,
                        Formula::new(cumulative).set_result("0"),
                    )
                    .map_err(template_error)?;

                excel_row += 1;
            }
        }

        Ok(())
    }

    /// SUMIFS of weighted forecast for opportunities closing in the row's month
    fn monthly_formula(&self, excel_row: u32) -> String {
        let sheet = self.layout.input_sheet.replace('\'', "''");
        let column = |field: ForecastField| {
            format!(
                "'{sheet}'!${col}${start}:${col}${end}",
                col = field.column(),
                start = self.layout.data_start_row,
                end = INPUT_FORMULA_LAST_ROW,
            )
        };
        let weighted = column(ForecastField::WeightedForecast);
        let close = column(ForecastField::ForecastClose);
        let month = format!("{}{}", column_index_to_letter(OutputColumn::Month.column_index()), excel_row);

        format!("=SUMIFS({weighted},{close},\">=\"&{month},{close},\"<\"&EDATE({month},1))")
    }
}

fn write_value(
    worksheet: &mut Worksheet,
    excel_row: u32,
    column: u32,
    value: &CellValue,
    date_format: &Format,
) -> TrackerResult<()> {
    let row = excel_row - 1;
    let col = (column - 1) as u16;
    match value {
        CellValue::Empty => {}
        CellValue::Text(s) | CellValue::Error(s) => {
            worksheet.write_string(row, col, s).map_err(template_error)?;
        }
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n).map_err(template_error)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b).map_err(template_error)?;
        }
        CellValue::Date(d) => {
            worksheet
                .write_number_with_format(row, col, date_to_excel_serial(*d), date_format)
                .map_err(template_error)?;
        }
    }
    Ok(())
}

fn template_error(e: rust_xlsxwriter::XlsxError) -> TrackerError {
    TrackerError::Template(e.to_string())
}
