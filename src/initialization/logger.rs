//! Logger setup.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::LevelFilter;

/// Installs the global `env_logger` with the given level and format.
///
/// `RUST_LOG` is read first; `level` then overrides it for this crate, so
/// `RUST_LOG=debug` still works for dependencies while `--log-level` controls
/// the limiter's own output.
///
/// Plain output is colored and timestamped for a terminal. JSON output writes
/// one object per line (`ts`, `level`, `target`, `msg`) for log shippers.
///
/// # Errors
///
/// Returns [`InitializationError::LoggerError`] if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug flood_guard --simulate-items 50
/// flood_guard --log-level debug --log-format json
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("tokio_util", LevelFilter::Warn);
    builder.filter_module("flood_guard", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(|buf, record| {
                let level = record.level();
                let (marker, colored_level) = match level {
                    log::Level::Error => ("⛔", level.to_string().red().bold()),
                    log::Level::Warn => ("⏳", level.to_string().yellow()),
                    log::Level::Info => ("•", level.to_string().green()),
                    log::Level::Debug => ("·", level.to_string().blue()),
                    log::Level::Trace => ("·", level.to_string().purple()),
                };

                writeln!(
                    buf,
                    "{} {} [{}] {} {}",
                    chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
                    marker,
                    colored_level,
                    record.target().cyan(),
                    record.args()
                )
            });
        }
    }

    // try_init so a second call (tests, embedding) errors instead of panicking
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}
