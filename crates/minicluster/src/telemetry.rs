//! Structured telemetry for the harness and the processes it supervises.

use std::io::{self, IsTerminal};

use minicluster_config::LogFormat;
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs a global subscriber writing to stderr.
///
/// Only the first call installs anything; later calls return a handle
/// without touching global state, whatever arguments they pass. Pass
/// [`ClusterOptions::log_filter`](minicluster_config::ClusterOptions::log_filter)
/// and [`ClusterOptions::log_format`](minicluster_config::ClusterOptions::log_format)
/// to follow the cluster configuration.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter, or
/// [`TelemetryError::Subscriber`] when another subscriber was installed
/// outside this function.
pub fn initialise(filter: &str, format: LogFormat) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(filter, format))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(directives: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(directives)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_idempotent() {
        initialise("info", LogFormat::Compact).expect("first initialisation");
        initialise("not a [valid filter", LogFormat::Json).expect("later calls are no-ops");
    }
}
