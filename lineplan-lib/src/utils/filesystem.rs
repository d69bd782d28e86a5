use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::utils::get_utc_iso_datetime;

/// Append an error report to the given log file, prefixed with a UTC timestamp.
///
/// # Arguments
/// * `log_file` - Path of the log file, created if missing
/// * `error_type` - A description of the error category (e.g., "LinePlan Validation Report")
/// * `error_message` - The actual error message content
pub fn write_error_to_log<P: AsRef<Path>>(
    log_file: P,
    error_type: &str,
    error_message: &str,
) -> std::io::Result<()> {
    let timestamp = get_utc_iso_datetime();
    let log_entry = format!("\n[{}] {}:\n{}\n", timestamp, error_type, error_message);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    writeln!(file, "{}", log_entry)
}
