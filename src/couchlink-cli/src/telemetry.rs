//! Logging setup for the command-line tool
//!
//! Logs go to stderr through a non-blocking writer so that stdout carries only
//! command output. `RUST_LOG` overrides the default filter.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "couchlink=info,couchlink_rs=info";

/// Initialize tracing; `verbose` raises the default filter to debug.
///
/// Returns a guard that must be kept alive to ensure logs are flushed
pub fn init_telemetry(verbose: bool, json: bool) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    let default_filter = if verbose {
        "couchlink=debug,couchlink_rs=debug"
    } else {
        DEFAULT_FILTER
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_target(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
