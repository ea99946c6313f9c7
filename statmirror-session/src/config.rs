//! Session configuration.
//!
//! One TOML file carries the mirror sections (`[general]`, `[layout]`,
//! `[tables]`, `[export]`) plus `[polling]`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use statmirror_core::config::MirrorConfig;

use crate::error::{Result, SessionError};

/// Full configuration of a polling session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Mirror settings.
    #[serde(flatten)]
    pub mirror: MirrorConfig,
    /// Poll cadence and drop policy.
    #[serde(default)]
    pub polling: PollingConfig,
}

impl SessionConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `SessionError::Config` if the TOML is invalid or a value is
    /// out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| SessionError::Config(e.to_string()))?;
        config.mirror.layout.validate()?;
        config.polling.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Poll cadence and drop policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Milliseconds between ticks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Consecutive failed refreshes after which a unit is dropped.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

impl PollingConfig {
    /// Tick interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(SessionError::Config("polling.interval_ms must be positive".into()));
        }
        if self.max_consecutive_failures == 0 {
            return Err(SessionError::Config(
                "polling.max_consecutive_failures must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

fn default_interval_ms() -> u64 { 100 }
fn default_max_consecutive_failures() -> u32 { 3 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_sections_and_polling_share_one_file() {
        let config = SessionConfig::from_toml(
            r#"
            [general]
            log_level = "debug"

            [export]
            write_html = false

            [polling]
            interval_ms = 250
            "#,
        )
        .expect("parse");

        assert_eq!(config.mirror.general.log_level, "debug");
        assert!(!config.mirror.export.write_html);
        assert_eq!(config.polling.interval(), Duration::from_millis(250));
        assert_eq!(config.polling.max_consecutive_failures, 3);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = SessionConfig::from_toml("").expect("parse");
        assert_eq!(config.polling.interval_ms, 100);
        assert_eq!(config.mirror.tables.experience_column, "Amazon");
    }

    #[test]
    fn zero_failure_budget_rejected() {
        let err = SessionConfig::from_toml("[polling]\nmax_consecutive_failures = 0\n")
            .expect_err("zero budget");
        assert!(matches!(err, SessionError::Config(_)));
    }
}
