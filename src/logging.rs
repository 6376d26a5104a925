//! log4rs setup for the `pgd-sweep` binary.
use crate::error::{PgdError, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

const CONSOLE_PATTERN: &str = "{d(%H:%M:%S)} {h({l})} - {m}{n}";

/// Console logging at `level`
///
/// # Errors
/// If the configuration is rejected
pub fn console_config(level: LevelFilter) -> Result<Config> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| PgdError::Logging(e.to_string()))
}

/// Initializes the global logger from a log4rs YAML file if given, otherwise
/// logs to the console at `level`.
///
/// # Errors
/// If the file is unreadable or invalid, or a logger is already set
pub fn init(log_config: Option<&Path>, level: LevelFilter) -> Result<()> {
    match log_config {
        Some(path) => log4rs::init_file(path, Default::default())
            .map_err(|e| PgdError::Logging(format!("{}: {}", path.display(), e))),
        None => log4rs::init_config(console_config(level)?)
            .map(|_handle| ())
            .map_err(|e| PgdError::Logging(e.to_string())),
    }
}
