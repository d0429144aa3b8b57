//! Tracing initialization
//!
//! Library code only emits `tracing` events. Binaries and test harnesses
//! that want to see them call [`init`] once.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Environment variable holding per-target filter directives,
/// e.g. `CAUSA_LOG=causa_fifo=debug,causa_runtime=info`
pub const LOG_ENV: &str = "CAUSA_LOG";

/// Logging configuration
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Filter used when `CAUSA_LOG` is unset or invalid
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            default_filter: "info".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Verbose preset showing every buffering decision
    pub fn verbose() -> Self {
        LogConfig {
            default_filter: "causa_fifo=trace,causa_runtime=debug,info".to_string(),
            json: false,
        }
    }
}

/// Install the global subscriber. Idempotent; if another subscriber is
/// already installed it is left in place.
pub fn init(config: &LogConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(&config.default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = if config.json {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .json()
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .try_init()
        };

        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(&LogConfig::default());
        init(&LogConfig::verbose());
        tracing::info!("logging initialized twice without panicking");
    }
}
