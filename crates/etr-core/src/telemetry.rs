//! Global subscriber setup for the `etr` binary.
//!
//! Logs go to stderr; stdout is left to the run report.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "ETR_LOG";

/// Install the global subscriber, as JSON lines when `json` is set.
///
/// Directives come from `ETR_LOG`, then `RUST_LOG`, then `level`. Returns
/// `false` when a global subscriber was already installed.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let output = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let output = if json {
        output.json().boxed()
    } else {
        output.boxed()
    };

    tracing_subscriber::registry()
        .with(output)
        .with(build_filter(level))
        .try_init()
        .is_ok()
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        init_tracing(false, Level::WARN);
        assert!(!init_tracing(true, Level::DEBUG));
    }
}
