//! Writes export documents to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use tracing::{debug, info, info_span};

use statmirror_core::classify::ItemCollectionView;
use statmirror_core::config::ExportConfig;
use statmirror_core::entity::PlayerSnapshot;
use statmirror_core::metrics::{MirrorCounters, spans};

use crate::describe::ItemDescriber;
use crate::error::{ExportError, Result};
use crate::html::HtmlTemplate;
use crate::json::InventoryDocument;

/// Paths written by one export. A format disabled in the config is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// `<name>.json`
    pub json_path: Option<PathBuf>,
    /// `<name>.html`
    pub html_path: Option<PathBuf>,
}

/// Writes a player's classified items as JSON and HTML.
#[derive(Debug, Clone)]
pub struct InventoryExporter {
    config: ExportConfig,
    template: HtmlTemplate,
    counters: Option<Arc<MirrorCounters>>,
}

impl InventoryExporter {
    /// Exporter using the built-in HTML template.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            template: HtmlTemplate::default(),
            counters: None,
        }
    }

    /// Replace the HTML template.
    #[must_use]
    pub fn with_template(mut self, template: HtmlTemplate) -> Self {
        self.template = template;
        self
    }

    /// Count written documents in `counters`.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<MirrorCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Directory documents are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Export the items of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidPlayerName`] if the player's name has
    /// no usable characters, [`ExportError::Template`] if the page does not
    /// render, or an I/O or JSON error if writing fails.
    pub fn export(
        &self,
        player: &PlayerSnapshot,
        view: &ItemCollectionView,
        describer: &dyn ItemDescriber,
    ) -> Result<ExportOutcome> {
        self.export_named(player.name(), view, describer)
    }

    /// Export `view` under `player_name`.
    ///
    /// # Errors
    ///
    /// See [`export`](Self::export).
    pub fn export_named(
        &self,
        player_name: &str,
        view: &ItemCollectionView,
        describer: &dyn ItemDescriber,
    ) -> Result<ExportOutcome> {
        let _span = info_span!(spans::EXPORT, player = player_name).entered();
        let stem = file_stem(player_name)?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        let mut outcome = ExportOutcome::default();

        if self.config.write_json {
            let document = InventoryDocument::from_view(view, describer)
                .with_metadata(player_name, Utc::now());
            let path = self.config.output_dir.join(format!("{stem}.json"));
            std::fs::write(&path, document.to_json_pretty()?)?;
            debug!(path = %path.display(), items = document.items.len(), "JSON export written");
            self.count_written();
            outcome.json_path = Some(path);
        }

        if self.config.write_html {
            let page = self.template.render(player_name, view, describer)?;
            let path = self.config.output_dir.join(format!("{stem}.html"));
            std::fs::write(&path, page)?;
            debug!(path = %path.display(), "HTML export written");
            self.count_written();
            outcome.html_path = Some(path);
        }

        info!(
            player = player_name,
            items = view.len(),
            dir = %self.config.output_dir.display(),
            "Inventory exported"
        );
        Ok(outcome)
    }

    fn count_written(&self) {
        if let Some(counters) = &self.counters {
            counters.exports_written.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// File-name stem for a player: characters other than ASCII letters,
/// digits, `-` and `_` become `_`.
///
/// # Errors
///
/// Returns [`ExportError::InvalidPlayerName`] for a name with no letters or
/// digits.
pub fn file_stem(player_name: &str) -> Result<String> {
    let trimmed = player_name.trim();
    if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(ExportError::InvalidPlayerName(player_name.to_string()));
    }
    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}
