//! Configuration for the mirror.
//!
//! Maps directly to `statmirror.toml`. Every section is optional; a missing
//! section or key falls back to the built-in default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::layout::UnitLayout;

/// Top-level mirror configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Remote structure offsets.
    #[serde(default)]
    pub layout: UnitLayout,
    /// Static game data files.
    #[serde(default)]
    pub tables: TablesConfig,
    /// Inventory export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

impl MirrorConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` if the TOML is invalid or a layout
    /// offset overflows.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| MirrorError::Config(e.to_string()))?;
        config.layout.validate()?;
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

    /// Serialize back to TOML.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` if a value cannot be represented.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MirrorError::Config(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Where to find the static game tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Path to `experience.txt`; the built-in curve is used when unset.
    #[serde(default)]
    pub experience_file: Option<PathBuf>,
    /// Path to `itemstatcost.txt`; built-in value shifts are used when unset.
    #[serde(default)]
    pub stat_cost_file: Option<PathBuf>,
    /// Character-class column to read thresholds from.
    #[serde(default = "default_experience_column")]
    pub experience_column: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            experience_file: None,
            stat_cost_file: None,
            experience_column: default_experience_column(),
        }
    }
}

/// Inventory export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the export documents are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Write `<name>.json`.
    #[serde(default = "default_true")]
    pub write_json: bool,
    /// Write `<name>.html`.
    #[serde(default = "default_true")]
    pub write_html: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_json: true,
            write_html: true,
        }
    }
}

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_experience_column() -> String { "Amazon".to_string() }
fn default_output_dir() -> PathBuf { PathBuf::from("exports") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = MirrorConfig::from_toml("").expect("parse");
        assert_eq!(config.general.log_level, "info");
        assert!(!config.general.json_logs);
        assert_eq!(config.tables.experience_column, "Amazon");
        assert!(config.tables.experience_file.is_none());
        assert!(config.export.write_json && config.export.write_html);
        assert_eq!(config.layout, UnitLayout::default());
    }

    #[test]
    fn partial_sections_override() {
        let config = MirrorConfig::from_toml(
            r#"
            [general]
            json_logs = true

            [export]
            output_dir = "/tmp/out"
            write_html = false
            "#,
        )
        .expect("parse");
        assert!(config.general.json_logs);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.export.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.export.write_json);
        assert!(!config.export.write_html);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(
            MirrorConfig::from_toml("[general\nlog_level = 3"),
            Err(MirrorError::Config(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let config = MirrorConfig::default();
        let text = config.to_toml().expect("serialize");
        let back = MirrorConfig::from_toml(&text).expect("parse");
        assert_eq!(back.layout, config.layout);
        assert_eq!(back.export.output_dir, config.export.output_dir);
    }
}
