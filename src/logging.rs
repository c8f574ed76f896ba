//! Structured logging setup.
//!
//! Logs always go to stderr so dumped models on stdout stay machine-readable.
//! Configuration comes from the environment:
//!
//! - `SWAGGERC_LOG_LEVEL`: trace/debug/info/warn/error (default `warn`)
//! - `SWAGGERC_LOG_FORMAT`: json/pretty (default `pretty`)
//! - `SWAGGERC_LOG_TARGET_FILTER`: extra comma-separated filter directives
//! - `SWAGGERC_LOG_ASYNC`: buffer output on a background thread (default `true`)
//!
//! `RUST_LOG` takes precedence over `SWAGGERC_LOG_LEVEL` when set.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    /// Module filter (comma-separated)
    pub target_filter: Option<String>,
    pub async_logging: bool,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("SWAGGERC_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
            format: LogFormat::parse(
                &env::var("SWAGGERC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            ),
            target_filter: env::var("SWAGGERC_LOG_TARGET_FILTER").ok(),
            async_logging: env::var("SWAGGERC_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        }
    }

    /// Raise the level for `-v` / `-vv`
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {}
            1 => self.log_level = "info".to_string(),
            2 => self.log_level = "debug".to_string(),
            _ => self.log_level = "trace".to_string(),
        }
        self
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber. Keep the returned guard alive until exit,
/// otherwise buffered lines are lost.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_writer(writer)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .boxed(),
        };
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize async logging")?;
        return Ok(Some(guard));
    }

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };
    registry
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("other"), LogFormat::Pretty);
    }

    #[test]
    fn test_verbosity_raises_level() {
        let config = LogConfig {
            log_level: "warn".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            async_logging: false,
        };
        assert_eq!(config.clone().with_verbosity(0).level(), Level::WARN);
        assert_eq!(config.clone().with_verbosity(1).level(), Level::INFO);
        assert_eq!(config.clone().with_verbosity(2).level(), Level::DEBUG);
        assert_eq!(config.with_verbosity(5).level(), Level::TRACE);
    }
}
