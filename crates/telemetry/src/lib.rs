//! Tracing bootstrap shared by the server binary and the CLI.

use anyhow::{anyhow, Context};
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG`, falling back to the configured directive.
pub fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.filter)
            .with_context(|| format!("invalid log filter '{}'", settings.filter)),
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed for the process.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    }
    .map_err(|e| anyhow!(e).context("failed to install tracing subscriber"))?;

    tracing::debug!(
        target: "shelf-telemetry",
        format = ?settings.log_format,
        "tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let settings = TelemetrySettings {
            filter: "shelf=loudest".to_string(),
            log_format: LogFormat::Pretty,
        };
        assert!(env_filter(&settings).is_err());
    }

    #[test]
    fn accepts_target_directives() {
        let settings = TelemetrySettings {
            filter: "info,shelf_app=debug".to_string(),
            log_format: LogFormat::Json,
        };
        assert!(env_filter(&settings).is_ok());
    }
}
