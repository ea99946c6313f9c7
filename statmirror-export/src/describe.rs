//! Human-readable item descriptions.
//!
//! Naming an item properly needs the game's string tables, which live
//! outside the mirror. [`ItemDescriber`] is the seam; [`BasicDescriber`]
//! covers what the static data files alone can provide.

use std::collections::HashMap;

use statmirror_core::entity::{ItemQuality, ItemSnapshot};
use statmirror_core::loader::{INDEX_KEY, Record};
use statmirror_core::resolver;
use statmirror_core::tables::StatMetadata;

/// Names, colours and stat text for items.
pub trait ItemDescriber {
    /// Name of the item's base type (`"Shako"`).
    fn base_name(&self, item: &ItemSnapshot) -> String;

    /// Full display name, affixes and rune word included.
    fn full_name(&self, item: &ItemSnapshot) -> String;

    /// CSS colour for the name, as `#RRGGBB`.
    fn color(&self, item: &ItemSnapshot) -> String;

    /// Rune-word name for a rune-word id.
    fn runeword_name(&self, runeword_id: u16) -> Option<String>;

    /// One line per stat, in display order.
    fn stat_lines(&self, item: &ItemSnapshot) -> Vec<String>;
}

/// Describer backed by base names, rune-word names and stat metadata.
#[derive(Debug, Clone, Default)]
pub struct BasicDescriber {
    base_names: HashMap<u32, String>,
    runewords: HashMap<u16, String>,
    stat_metadata: StatMetadata,
}

impl BasicDescriber {
    /// A describer that knows no names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base names keyed by txt file number.
    #[must_use]
    pub fn with_base_names(mut self, base_names: HashMap<u32, String>) -> Self {
        self.base_names = base_names;
        self
    }

    /// Base names from item-table records: each row's `name` keyed by its
    /// row index. Rows without a name are skipped.
    #[must_use]
    pub fn with_item_records(mut self, records: &[Record]) -> Self {
        self.base_names.extend(records.iter().filter_map(|record| {
            let index = record.get(INDEX_KEY)?.parse::<u32>().ok()?;
            let name = record.get("name").filter(|n| !n.is_empty())?;
            Some((index, name.clone()))
        }));
        self
    }

    /// Rune-word names keyed by rune-word id.
    #[must_use]
    pub fn with_runewords(mut self, runewords: HashMap<u16, String>) -> Self {
        self.runewords = runewords;
        self
    }

    /// Stat metadata used to shift raw values.
    #[must_use]
    pub fn with_stat_metadata(mut self, stat_metadata: StatMetadata) -> Self {
        self.stat_metadata = stat_metadata;
        self
    }
}

impl ItemDescriber for BasicDescriber {
    fn base_name(&self, item: &ItemSnapshot) -> String {
        self.base_names
            .get(&item.txt_file_no())
            .cloned()
            .unwrap_or_else(|| format!("Item #{}", item.txt_file_no()))
    }

    fn full_name(&self, item: &ItemSnapshot) -> String {
        let base = self.base_name(item);
        let mut name = match item.runeword_id().and_then(|id| self.runeword_name(id)) {
            Some(runeword) => format!("{runeword} {base}"),
            None => base,
        };
        if item.is_ethereal() {
            name = format!("Ethereal {name}");
        }
        name
    }

    fn color(&self, item: &ItemSnapshot) -> String {
        if item.is_runeword() {
            return "#C7B377".to_string();
        }
        let color = match item.detail().quality {
            ItemQuality::Magic => "#4169E1",
            ItemQuality::Set => "#00FF00",
            ItemQuality::Rare => "#FFFF64",
            ItemQuality::Unique => "#A59263",
            ItemQuality::Craft | ItemQuality::Tempered => "#FFA800",
            ItemQuality::Inferior => "#696969",
            _ if item.is_ethereal() => "#696969",
            _ => "#FFFFFF",
        };
        color.to_string()
    }

    fn runeword_name(&self, runeword_id: u16) -> Option<String> {
        self.runewords.get(&runeword_id).cloned()
    }

    fn stat_lines(&self, item: &ItemSnapshot) -> Vec<String> {
        item.stats()
            .iter()
            .map(|(stat, raw)| {
                let value = resolver::adjusted_value(stat, raw, &self.stat_metadata);
                format!("{}: {value}", stat.display_name())
            })
            .collect()
    }
}
