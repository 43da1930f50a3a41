//! Initialisation of the program logger.
//!
//! Messages go to stdout (or stderr for warnings and errors), coloured when writing to a terminal,
//! and optionally to log files in the output folder. The log level can be set in the settings file
//! or overridden with an environment variable.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used if neither the environment variable nor the settings file gives one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which takes precedence over the log level in the settings file
pub const LOG_LEVEL_ENV_VAR: &str = "BESS_ECON_LOG_LEVEL";

/// Log file for messages at info level and below
const LOG_INFO_FILE_NAME: &str = "bess_econ_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "bess_econ_error.log";

/// Prefix removed from log targets to keep messages short
const TARGET_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The level comes from the `BESS_ECON_LOG_LEVEL` environment variable if it is set, otherwise
/// from `log_level_from_settings`, otherwise [`DEFAULT_LOG_LEVEL`]. Valid levels are `off`,
/// `error`, `warn`, `info`, `debug` and `trace`, in any case.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_dir`: Folder in which to create log files, if any
pub fn init(log_level_from_settings: Option<&str>, log_file_dir: Option<&Path>) -> Result<()> {
    let log_level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => level,
        Err(_) => log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string(),
    };
    let log_level = parse_log_level(&log_level)?;

    let mut dispatch = Dispatch::new()
        .chain(console_dispatch(log_level, false))
        .chain(console_dispatch(log_level, true));
    if let Some(dir) = log_file_dir {
        let [info_file, error_file] = [LOG_INFO_FILE_NAME, LOG_ERROR_FILE_NAME].map(|file_name| {
            let path = dir.join(file_name);
            File::create(&path)
                .with_context(|| format!("Could not create log file {}", path.display()))
        });
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(info_file?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(error_file?),
            );
    }

    dispatch.apply().context("Logger already initialised")?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// Output to stderr (warnings and errors) or stdout (everything else), coloured for terminals
fn console_dispatch(log_level: LevelFilter, errors: bool) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    if errors {
        let use_colour = std::io::stderr().is_terminal();
        Dispatch::new()
            .format(move |out, message, record| {
                write_log_colour(out, message, record, use_colour, &colours);
            })
            .level(log_level.min(LevelFilter::Warn))
            .chain(std::io::stderr())
    } else {
        let use_colour = std::io::stdout().is_terminal();
        Dispatch::new()
            .filter(|metadata| metadata.level() > LevelFilter::Warn)
            .format(move |out, message, record| {
                write_log_colour(out, message, record, use_colour, &colours);
            })
            .level(log_level)
            .chain(std::io::stdout())
    }
}

/// Convert a log level name (case insensitive) to a [`LevelFilter`]
pub(crate) fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// The module a message came from, without the crate name
fn short_target(target: &str) -> &str {
    target.strip_prefix(TARGET_PREFIX).unwrap_or(target)
}

/// Write a message as `[HH:MM:SS LEVEL target] message`
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    out.finish(format_args!(
        "[{} {} {}] {message}",
        Local::now().format("%H:%M:%S"),
        record.level(),
        short_target(record.target())
    ));
}

/// Write a message, colouring the level if `use_colour` is set
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if !use_colour {
        write_log_plain(out, message, record);
        return;
    }

    out.finish(format_args!(
        "[{} {} {}] {message}",
        Local::now().format("%H:%M:%S"),
        colours.color(record.level()),
        short_target(record.target())
    ));
}
