// reset; cargo run -- --excel-file ./data/LinePlan_E25.xlsb
// reset; RUST_LOG=debug cargo run -- --excel-file ./data/LinePlan_E25.xlsb --format json

mod report;

use clap::{Parser, ValueEnum};
use lineplan_lib::{
    DEFAULT_REQUIRED_COLUMNS, ERRORS_LOG_FILE, HeaderPolicy, REFERENCE_SHEET_NAME,
    ReferentialValidator, ValidatorConfig, utils::write_error_to_log,
};
use report::ValidationReport;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "lineplan-checker")]
#[command(about = "Checks the reference sheet of a LinePlan workbook (.xlsb)")]
#[command(version)]
struct Args {
    /// Path to the LinePlan workbook to check
    #[arg(short, long)]
    excel_file: String,

    /// Name of the sheet to check
    #[arg(long, default_value = REFERENCE_SHEET_NAME)]
    sheet_name: String,

    /// Column that must be present and filled on every row (repeatable)
    #[arg(long = "required-column", default_values = DEFAULT_REQUIRED_COLUMNS)]
    required_columns: Vec<String>,

    /// Report blank header cells in a single message instead of one per column
    #[arg(long)]
    aggregate_header_errors: bool,

    /// Ignore data rows whose cells are all blank
    #[arg(long)]
    skip_blank_rows: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl Args {
    fn validator_config(&self) -> ValidatorConfig {
        let header_policy = if self.aggregate_header_errors {
            HeaderPolicy::Aggregate
        } else {
            HeaderPolicy::PerColumn
        };

        ValidatorConfig::default()
            .with_sheet_name(&self.sheet_name)
            .with_required_columns(self.required_columns.iter().cloned())
            .with_header_policy(header_policy)
            .with_skip_blank_rows(self.skip_blank_rows)
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let arguments = Args::parse();

    let validator = ReferentialValidator::new(arguments.validator_config());
    log::info!("Checking '{}'", arguments.excel_file);
    let findings = validator.validate_path(&arguments.excel_file);

    let report = ValidationReport::new(
        &arguments.excel_file,
        &validator.config().sheet_name,
        findings,
    );
    match arguments.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if !report.valid {
        match write_error_to_log(
            ERRORS_LOG_FILE,
            "LinePlan Validation Report",
            &report.to_log_entry(),
        ) {
            Ok(()) => eprintln!("❌ Check {} for details.", ERRORS_LOG_FILE),
            Err(e) => log::warn!("Could not write {}: {}", ERRORS_LOG_FILE, e),
        }
        std::process::exit(1);
    }

    Ok(())
}
