//! The JSON inventory document.
//!
//! Layout:
//!
//! ```json
//! { "items": { "equipped": [...], "inventory": [...], "mercenary": [...],
//!              "cube": [...], "personalStash": [...], "sharedStashTab1": [...],
//!              "sharedStashTab2": [...], "sharedStashTab3": [...] } }
//! ```
//!
//! `player` and `exportedAt` are added at the top level when known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use statmirror_core::classify::{BucketKind, ItemCollectionView};

use crate::describe::ItemDescriber;
use crate::error::Result;
use crate::record::ExportedItem;

/// Items per bucket. A bucket missing from parsed JSON is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InventoryItems {
    /// Worn by the player.
    pub equipped: Vec<ExportedItem>,
    /// Backpack.
    pub inventory: Vec<ExportedItem>,
    /// Worn by the mercenary.
    pub mercenary: Vec<ExportedItem>,
    /// Horadric cube.
    pub cube: Vec<ExportedItem>,
    /// Personal stash tab.
    pub personal_stash: Vec<ExportedItem>,
    /// Shared stash tab 1.
    pub shared_stash_tab1: Vec<ExportedItem>,
    /// Shared stash tab 2.
    pub shared_stash_tab2: Vec<ExportedItem>,
    /// Shared stash tab 3.
    pub shared_stash_tab3: Vec<ExportedItem>,
}

impl InventoryItems {
    /// Items of one bucket.
    #[must_use]
    pub fn bucket(&self, kind: BucketKind) -> &[ExportedItem] {
        match kind {
            BucketKind::Equipped => &self.equipped,
            BucketKind::Inventory => &self.inventory,
            BucketKind::Mercenary => &self.mercenary,
            BucketKind::Cube => &self.cube,
            BucketKind::PersonalStash => &self.personal_stash,
            BucketKind::SharedStash1 => &self.shared_stash_tab1,
            BucketKind::SharedStash2 => &self.shared_stash_tab2,
            BucketKind::SharedStash3 => &self.shared_stash_tab3,
        }
    }

    fn bucket_mut(&mut self, kind: BucketKind) -> &mut Vec<ExportedItem> {
        match kind {
            BucketKind::Equipped => &mut self.equipped,
            BucketKind::Inventory => &mut self.inventory,
            BucketKind::Mercenary => &mut self.mercenary,
            BucketKind::Cube => &mut self.cube,
            BucketKind::PersonalStash => &mut self.personal_stash,
            BucketKind::SharedStash1 => &mut self.shared_stash_tab1,
            BucketKind::SharedStash2 => &mut self.shared_stash_tab2,
            BucketKind::SharedStash3 => &mut self.shared_stash_tab3,
        }
    }

    /// Items across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        BucketKind::ALL.iter().map(|kind| self.bucket(*kind).len()).sum()
    }

    /// Whether every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete JSON export for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDocument {
    /// Player name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    /// When the export was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    /// Items per bucket.
    pub items: InventoryItems,
}

impl InventoryDocument {
    /// Describe every classified item, keeping bucket order.
    pub fn from_view(view: &ItemCollectionView, describer: &dyn ItemDescriber) -> Self {
        let mut items = InventoryItems::default();
        for (kind, bucket) in view.iter_buckets() {
            items.bucket_mut(kind).extend(
                bucket
                    .iter()
                    .map(|item| ExportedItem::from_snapshot(item, describer)),
            );
        }
        Self {
            player: None,
            exported_at: None,
            items,
        }
    }

    /// Attach the player name and export time.
    #[must_use]
    pub fn with_metadata(mut self, player: impl Into<String>, exported_at: DateTime<Utc>) -> Self {
        self.player = Some(player.into());
        self.exported_at = Some(exported_at);
        self
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExportError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExportError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document written by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExportError::Json`] if the text is not a valid document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statmirror_core::types::Position;

    fn exported(txt: u32) -> ExportedItem {
        ExportedItem {
            txt_file_no: txt,
            base_name: "Ring".into(),
            quality: "RARE".into(),
            full_name: "Rare Ring".into(),
            rune_word: None,
            ethereal: false,
            identified: true,
            num_sockets: 0,
            position: Position { x: 1, y: 2 },
            body_loc: "NONE".into(),
            stats: vec!["Strength: 5".into()],
        }
    }

    #[test]
    fn field_names_match_export_format() {
        let mut doc = InventoryDocument::default();
        doc.items.shared_stash_tab2.push(exported(522));
        let json: serde_json::Value = serde_json::from_str(&doc.to_json().expect("json")).expect("value");

        let item = &json["items"]["sharedStashTab2"][0];
        assert_eq!(item["txtFileNo"], 522);
        assert_eq!(item["fullName"], "Rare Ring");
        assert!(item["runeWord"].is_null());
        assert_eq!(item["numSockets"], 0);
        assert_eq!(item["position"]["y"], 2);
        assert_eq!(item["bodyLoc"], "NONE");
        assert!(json.get("player").is_none());
        assert_eq!(json["items"]["personalStash"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn bare_items_document_parses() {
        let doc = InventoryDocument::from_json(
            r#"{"items":{"equipped":[],"inventory":[],"mercenary":[],"cube":[],
                "personalStash":[],"sharedStashTab1":[],"sharedStashTab2":[],"sharedStashTab3":[]}}"#,
        )
        .expect("parse");
        assert!(doc.items.is_empty());
        assert!(doc.player.is_none());
    }
}
