//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from `LoggingConfig`
//! - Route output to a log file so the operator shell keeps the terminal
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Text format by default, JSON on request
//! - No ANSI colors when writing to a file

use std::fs::OpenOptions;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Errors from logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log level: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Default filter directive for a configured level.
pub fn default_directive(level: &str) -> String {
    format!("tcp_balancer={}", level)
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(&config.level))?,
    };

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::File {
                    path: path.clone(),
                    source,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(config.file.is_none());

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_targets_crate() {
        assert_eq!(default_directive("debug"), "tcp_balancer=debug");
        assert!(EnvFilter::try_new(default_directive("warn")).is_ok());
    }

    #[test]
    fn test_unopenable_file_is_reported() {
        let config = LoggingConfig {
            file: Some("/nonexistent-dir/lb.log".into()),
            ..LoggingConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(LoggingError::File { .. })));
    }
}
