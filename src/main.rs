use anyhow::Context;
use clap::{Parser, Subcommand};
use forecast_tracker::cli;
use forecast_tracker::config::TrackerConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forecast")]
#[command(about = "Append opportunities to a sales forecast tracker and read the forecast back")]
#[command(long_about = "Forecast - sales forecast tracker workbook tool

Works on a fixed-layout .xlsx tracker:
  'Forecast input'  one opportunity per row, headers in row 6, columns B:J
  'Sales forecast'  Month | Monthly Forecast | Cumulative in columns P:R

COMMANDS:
  init      - Create a blank tracker workbook
  inspect   - Show sheet names, header rows and sample data
  append    - Add an opportunity to the next free input row
  read      - Read the Sales forecast block
  range     - Read any cell range (e.g. P7:R9 or 'Forecast input'!B6:J6)

EXAMPLES:
  forecast init tracker.xlsx --start 2027-01 --months 12
  forecast append tracker.xlsx -f opportunity_name=\"Agent Test Corp\" -f forecast_amount=50000
  forecast read tracker.xlsx --json
  forecast range tracker.xlsx P7:R9

Field keys are the column headers (type a newline as \\n) or their
identifier form: opportunity_name, sales_agent, sales_region,
sales_category, forecast_amount, sales_phase, probability_of_sale,
forecast_close, weighted_forecast.")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "FORECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Spreadsheet engine (overrides the configuration)
    #[arg(short, long, global = true)]
    engine: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blank tracker workbook
    Init {
        /// Path of the .xlsx file to create
        file: PathBuf,

        /// First forecast month (YYYY-MM); adds a formula-driven month block
        #[arg(short, long)]
        start: Option<String>,

        /// Number of months in the block
        #[arg(short, long, default_value_t = 12)]
        months: u32,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show sheet names, header rows and sample data rows
    Inspect {
        /// Tracker workbook
        file: PathBuf,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Append one opportunity to the 'Forecast input' sheet.

The target row is the first row at or below the data start row whose
'Opportunity name' cell is blank. Unknown keys are rejected before
anything is written. 'Opportunity name' is required.

Values are parsed per column: amounts accept $ and thousands separators,
probabilities accept 75%, close dates use YYYY-MM-DD.

Use --dry-run to see the target row without modifying the file.")]
    /// Append an opportunity to the next free input row
    Append {
        /// Tracker workbook
        file: PathBuf,

        /// Field value as KEY=VALUE (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// YAML mapping of fields; --field values take precedence
        #[arg(long, value_name = "ROW.yaml")]
        from: Option<PathBuf>,

        /// Show the target row without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Read the Month / Monthly Forecast / Cumulative block
    Read {
        /// Tracker workbook
        file: PathBuf,

        /// Raw cell triples instead of typed rows
        #[arg(long)]
        raw: bool,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Read a rectangular cell range, row-major
    Range {
        /// Tracker workbook
        file: PathBuf,

        /// A1 range; unqualified ranges read the 'Sales forecast' sheet
        address: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "forecast_tracker=debug"
    } else {
        "forecast_tracker=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = TrackerConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(engine) = cli.engine {
        config.engine = engine;
    }

    match cli.command {
        Commands::Init {
            file,
            start,
            months,
            force,
        } => cli::init(file, start, months, force, &config)?,

        Commands::Inspect { file, json } => cli::inspect(file, json, &config)?,

        Commands::Append {
            file,
            fields,
            from,
            dry_run,
        } => cli::append(file, fields, from, dry_run, &config)?,

        Commands::Read { file, raw, json } => cli::read(file, raw, json, &config)?,

        Commands::Range {
            file,
            address,
            json,
        } => cli::range(file, address, json, &config)?,
    }

    Ok(())
}
