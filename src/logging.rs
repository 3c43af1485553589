//! log4rs setup shared by the binaries
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;
use thiserror::Error;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid logging configuration: {0}")]
    Config(String),
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}

/// Builds a stdout-only configuration at `level`
///
/// # Errors
/// If log4rs rejects the configuration
pub fn console_config(level: LevelFilter) -> Result<Config, LoggingError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|err| LoggingError::Config(err.to_string()))
}

/// Installs the global logger, from a log4rs YAML file when one is given
///
/// # Errors
/// If the configuration is invalid or a logger is already installed
pub fn init(level: LevelFilter, config_file: Option<&Path>) -> Result<(), LoggingError> {
    match config_file {
        Some(path) => log4rs::init_file(path, Default::default())
            .map_err(|err| LoggingError::Config(err.to_string())),
        None => {
            log4rs::init_config(console_config(level)?)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_config_sets_root_level() {
        let config = console_config(LevelFilter::Debug).unwrap();
        assert_eq!(config.root().level(), LevelFilter::Debug);
        assert_eq!(config.appenders().len(), 1);
    }
}
