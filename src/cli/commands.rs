use crate::accessor::{SheetStructure, WorkbookAccessor};
use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::excel::{by_name, TrackerTemplate};
use crate::layout::ForecastField;
use crate::types::{CellValue, ForecastInput, ForecastOutput, ForecastTable};
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    // Round to 6 decimal places; enough for currency and probabilities
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format an amount as `$1,234.50`
fn format_currency(n: f64) -> String {
    let sign = if n < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", n.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{cents}")
}

/// Single-line rendering of a cell; embedded newlines shown as `\n`
fn display_cell(value: &CellValue) -> String {
    match value {
        CellValue::Empty => "-".to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => s.replace('\n', "\\n"),
        other => other.to_string(),
    }
}

fn to_json<T: Serialize>(value: &T) -> TrackerResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| TrackerError::Validation(format!("cannot serialize output: {}", e)))
}

fn open_tracker(file: &Path, config: &TrackerConfig) -> TrackerResult<WorkbookAccessor> {
    let engine = by_name(&config.engine)?;
    WorkbookAccessor::open(engine.as_ref(), file, config.layout.clone())
}

/// Parse `KEY=VALUE` arguments into forecast fields.
///
/// KEY is a header string (`\n` may be typed as a literal backslash-n) or an
/// identifier key such as `sales_agent`. VALUE is parsed per the field's kind.
fn parse_field_args(args: &[String], input: &mut ForecastInput) -> TrackerResult<()> {
    for arg in args {
        let (key, raw) = arg.split_once('=').ok_or_else(|| {
            TrackerError::Validation(format!("expected KEY=VALUE, got {arg:?}"))
        })?;
        let field = ForecastField::resolve(&key.replace("\\n", "\n"))?;
        input.set(field, field.kind().parse_value(raw)?);
    }
    Ok(())
}

/// Load fields from a YAML mapping (`sales_agent: Jules`, `forecast_amount: 50000`)
fn load_fields_file(path: &Path) -> TrackerResult<ForecastInput> {
    let content = fs::read_to_string(path)?;
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(&content)
        .map_err(|e| TrackerError::Validation(format!("{}: {}", path.display(), e)))?;

    let mut input = ForecastInput::new();
    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| TrackerError::Validation(format!("non-string key {key:?}")))?;
        let field = ForecastField::resolve(key)?;

        let cell = match value {
            serde_yaml::Value::Null => CellValue::Empty,
            serde_yaml::Value::Bool(b) => CellValue::Bool(b),
            serde_yaml::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .ok_or_else(|| TrackerError::Validation(format!("{key}: number out of range")))?,
            serde_yaml::Value::String(s) => field.kind().parse_value(&s)?,
            other => {
                return Err(TrackerError::Validation(format!(
                    "{key}: unsupported value {other:?}"
                )))
            }
        };
        input.set(field, cell);
    }
    Ok(input)
}

fn print_sheet(sheet: &SheetStructure) {
    println!("   📄 Sheet: {}", sheet.name.bright_blue().bold());
    let headers: Vec<String> = sheet
        .columns
        .iter()
        .zip(&sheet.headers)
        .map(|(col, value)| format!("{}={}", col, display_cell(value)))
        .collect();
    println!("      Row {:>2} (header): {}", sheet.header_row, headers.join(" | ").cyan());

    if sheet.sample.is_empty() {
        println!("      {}", "(no data rows)".dimmed());
    }
    for sample in &sheet.sample {
        let values: Vec<String> = sample.values.iter().map(display_cell).collect();
        println!("      Row {:>2}: {}", sample.row, values.join(" | "));
    }
    println!();
}

fn print_table(table: &ForecastTable) {
    println!(
        "   {:<12} {:>18} {:>18}",
        table.columns[0].bold(),
        table.columns[1].bold(),
        table.columns[2].bold()
    );
    for row in &table.rows {
        let month = row
            .month
            .map(|m| m.format("%Y-%m").to_string())
            .unwrap_or_else(|| "-".to_string());
        let monthly = row.monthly_forecast.map(format_currency).unwrap_or_else(|| "-".to_string());
        let cumulative = row.cumulative.map(format_currency).unwrap_or_else(|| "-".to_string());
        println!("   {:<12} {:>18} {:>18}", month, monthly, cumulative);
    }
    println!();
}

/// Execute the inspect command
pub fn inspect(file: PathBuf, json: bool, config: &TrackerConfig) -> TrackerResult<()> {
    let tracker = open_tracker(&file, config)?;
    let structure = tracker.inspect_structure(config.inspect_sample_rows)?;
    tracker.close()?;

    if json {
        println!("{}", to_json(&structure)?);
        return Ok(());
    }

    println!("{}", "🔍 Forecast - Workbook Structure".bold().green());
    println!("   File: {}", file.display());
    println!("   Sheets: {}\n", structure.sheet_names.join(", "));
    print_sheet(&structure.input);
    print_sheet(&structure.output);
    Ok(())
}

/// Execute the append command
pub fn append(
    file: PathBuf,
    fields: Vec<String>,
    from: Option<PathBuf>,
    dry_run: bool,
    config: &TrackerConfig,
) -> TrackerResult<()> {
    let mut input = match &from {
        Some(path) => load_fields_file(path)?,
        None => ForecastInput::new(),
    };
    parse_field_args(&fields, &mut input)?;

    if input.is_empty() {
        return Err(TrackerError::Validation(
            "no fields given (use --field KEY=VALUE or --from FILE)".to_string(),
        ));
    }

    println!("{}", "📝 Forecast - Append Opportunity".bold().green());
    println!("   File: {}", file.display());

    let mut tracker = open_tracker(&file, config)?;

    if dry_run {
        let row = tracker.next_input_row()?;
        println!("{}", "📋 DRY RUN MODE - No changes will be written\n".yellow());
        println!("   Target row: {}", row.to_string().bold());
        for (field, value) in input.iter() {
            println!(
                "      {}{} = {}",
                field.column(),
                row,
                display_cell(value).cyan()
            );
        }
        tracker.close()?;
        return Ok(());
    }

    let row = tracker.append_forecast_input_row(&input)?;
    tracker.close()?;

    println!("{}", "✅ Row added".bold().green());
    println!("   Row: {}", row.to_string().bold());
    for (field, value) in input.iter() {
        println!(
            "      {:<20} {}",
            field.header().replace('\n', ""),
            display_cell(value).cyan()
        );
    }
    println!();
    Ok(())
}

/// Execute the read command
pub fn read(file: PathBuf, raw: bool, json: bool, config: &TrackerConfig) -> TrackerResult<()> {
    let tracker = open_tracker(&file, config)?;
    let output = tracker.read_forecast_output(!raw)?;
    tracker.close()?;

    if json {
        println!("{}", to_json(&output)?);
        return Ok(());
    }

    println!("{}", "📈 Forecast - Sales Forecast".bold().green());
    println!("   File: {}\n", file.display());

    match &output {
        ForecastOutput::Table(table) => {
            if table.is_empty() {
                println!("   {}", "No forecast rows found".yellow());
                return Ok(());
            }
            print_table(table);
            println!(
                "   Total Monthly Forecast: {}",
                format_currency(table.monthly_total()).bold()
            );
            if let Some(last) = table.final_cumulative() {
                println!("   Final Cumulative:       {}", format_currency(last).bold());
            }
        }
        ForecastOutput::Raw(rows) => {
            for row in rows {
                let values: Vec<String> = row.iter().map(display_cell).collect();
                println!("   ({})", values.join(", "));
            }
            println!("\n   {} rows", rows.len());
        }
    }
    Ok(())
}

/// Execute the range command
pub fn range(file: PathBuf, address: String, json: bool, config: &TrackerConfig) -> TrackerResult<()> {
    let tracker = open_tracker(&file, config)?;
    let values = tracker.read_range(&address)?;
    tracker.close()?;

    if json {
        println!("{}", to_json(&values)?);
        return Ok(());
    }

    println!("{}", format!("📐 Range {}", address).bold().green());
    for row in &values {
        let cells: Vec<String> = row.iter().map(display_cell).collect();
        println!("   {}", cells.join(" | "));
    }
    Ok(())
}

/// Parse `YYYY-MM` (or a full `YYYY-MM-DD`) to the first day of that month
fn parse_month(raw: &str) -> TrackerResult<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|_| TrackerError::Validation(format!("expected YYYY-MM, got {raw:?}")))
}

/// Execute the init command
pub fn init(
    file: PathBuf,
    start: Option<String>,
    months: u32,
    force: bool,
    config: &TrackerConfig,
) -> TrackerResult<()> {
    if file.exists() && !force {
        return Err(TrackerError::Validation(format!(
            "{} already exists (use --force to overwrite)",
            file.display()
        )));
    }

    let mut template = TrackerTemplate::new(config.layout.clone());
    if let Some(raw) = &start {
        template = template.with_month_block(parse_month(raw)?, months);
    }
    template.save(&file)?;

    println!("{}", "✅ Tracker workbook created".bold().green());
    println!("   File: {}", file.display());
    println!(
        "   Sheets: {}, {}",
        config.layout.input_sheet.bright_blue(),
        config.layout.output_sheet.bright_blue()
    );
    if start.is_some() {
        println!("   Forecast months: {}", months);
    }
    println!();
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
