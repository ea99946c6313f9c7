//! Process-wide tracing setup.

use tracing_subscriber::EnvFilter;

use statmirror_core::config::GeneralConfig;

use crate::error::{Result, SessionError};

/// Environment variable holding a filter directive that overrides the
/// configured log level.
pub const LOG_ENV: &str = "STATMIRROR_LOG";

/// Filter from `STATMIRROR_LOG`, or from `general.log_level` when the
/// variable is unset or invalid.
#[must_use]
pub fn env_filter(general: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&general.log_level))
}

/// Install the global `fmt` subscriber, as JSON lines when
/// `general.json_logs` is set.
///
/// # Errors
///
/// Returns [`SessionError::Telemetry`] if a global subscriber is already set.
pub fn init_tracing(general: &GeneralConfig) -> Result<()> {
    let filter = env_filter(general);
    let installed = if general.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };
    installed.map_err(|e| SessionError::Telemetry(e.to_string()))?;

    tracing::info!(
        level = %general.log_level,
        json = general.json_logs,
        "Logging initialized"
    );
    Ok(())
}
