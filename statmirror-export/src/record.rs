//! Per-item export record.

use serde::{Deserialize, Serialize};

use statmirror_core::entity::ItemSnapshot;
use statmirror_core::stats::Stat;
use statmirror_core::types::Position;

use crate::describe::ItemDescriber;

/// One item as it appears in the JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedItem {
    /// Row in the item tables.
    pub txt_file_no: u32,
    /// Base type name.
    pub base_name: String,
    /// Quality, upper case (`"UNIQUE"`).
    pub quality: String,
    /// Full display name.
    pub full_name: String,
    /// Rune-word name, `null` for other items.
    pub rune_word: Option<String>,
    /// Ethereal flag.
    pub ethereal: bool,
    /// Identified flag.
    pub identified: bool,
    /// Socket count, 0 when the item has none.
    pub num_sockets: i32,
    /// Position inside the container.
    pub position: Position,
    /// Equipment slot, upper case (`"HEAD"`, `"NONE"`).
    pub body_loc: String,
    /// Stat lines.
    pub stats: Vec<String>,
}

impl ExportedItem {
    /// Describe one item snapshot.
    pub fn from_snapshot(item: &ItemSnapshot, describer: &dyn ItemDescriber) -> Self {
        let detail = item.detail();
        Self {
            txt_file_no: item.txt_file_no(),
            base_name: describer.base_name(item),
            quality: detail.quality.as_str().to_string(),
            full_name: describer.full_name(item),
            rune_word: item.runeword_id().and_then(|id| describer.runeword_name(id)),
            ethereal: item.is_ethereal(),
            identified: item.is_identified(),
            num_sockets: item.stats().value_or_zero(Stat::NumSockets),
            position: detail.position,
            body_loc: detail.body_loc.as_str().to_string(),
            stats: describer.stat_lines(item),
        }
    }
}
