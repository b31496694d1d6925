// Tracing subscriber setup
use std::env;

use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggerConfig};
use crate::error::LoggingError;

/// Environment variable naming the deployment environment
pub const ENVIRONMENT_VAR: &str = "STUDYDESK_ENV";

/// Filter used when `RUST_LOG` is unset: `targets` at `level`, noisy
/// dependencies held back
pub fn default_filter(targets: &[&str], level: &str) -> String {
    let mut directives: Vec<String> = targets.iter().map(|t| format!("{}={}", t, level)).collect();
    directives.extend(["tower_http=info", "sqlx=warn", "hyper=info"].map(String::from));
    directives.join(",")
}

/// Whether the pretty layer should be used for `format`
pub fn use_pretty_output(format: LogFormat) -> bool {
    match format {
        LogFormat::Pretty => true,
        LogFormat::Json => false,
        LogFormat::Auto => {
            let is_development = env::var(ENVIRONMENT_VAR)
                .unwrap_or_else(|_| "development".to_string())
                == "development";
            let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);
            is_development && use_colors
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` forces debug for
/// `targets`.
///
/// # Errors
///
/// Fails when the filter does not parse or a subscriber is already installed.
pub fn init_tracing(config: &LoggerConfig, targets: &[&str], verbose: bool) -> Result<(), LoggingError> {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let fallback = default_filter(targets, level);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&fallback).map_err(|e| LoggingError::InvalidFilter {
            filter: fallback.clone(),
            reason: e.to_string(),
        })?,
    };

    if use_pretty_output(config.format) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_level(true)
                    .compact(),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter(&["studydesk_server", "database_layer"], "debug"),
            "studydesk_server=debug,database_layer=debug,tower_http=info,sqlx=warn,hyper=info"
        );
    }

    #[test]
    fn test_explicit_formats() {
        assert!(use_pretty_output(LogFormat::Pretty));
        assert!(!use_pretty_output(LogFormat::Json));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter(&["form_integrity"], "info")).is_ok());
    }
}
