use std::env::var;
use std::str::FromStr;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        })
    }
}

impl LogFormat {
    /// Format selected by `RUST_LOG_FORMAT`
    pub fn from_env() -> Self {
        var("RUST_LOG_FORMAT")
            .inspect_err(|error| {
                warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}")
            })
            .unwrap_or_default()
            .parse()
            .unwrap_or_default()
    }
}

/// Install the global subscriber at INFO
pub fn init() {
    init_with(LevelFilter::INFO);
}

/// Install the global subscriber with `level` as the default directive.
///
/// Panics if a global subscriber is already installed.
pub fn init_with(level: LevelFilter) {
    if let Err(error) = try_init_with(level) {
        panic!("Failed to install tracing subscriber: {error}");
    }
}

/// Install the global subscriber, reporting an already installed one
pub fn try_init_with(level: LevelFilter) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    }

    #[test]
    fn test_second_init_is_reported() {
        assert!(try_init_with(LevelFilter::DEBUG).is_ok());
        assert!(try_init_with(LevelFilter::DEBUG).is_err());
    }
}
