//! Party roster.
//!
//! The roster is owned and refreshed by the polling owner and published as
//! an `Arc<Roster>`. Players reference entries by unit id only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::UnitId;

/// One party member as listed by the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Unit id of the member's player unit.
    pub unit_id: UnitId,
    /// Character name.
    pub name: String,
    /// Character class id.
    pub class: u32,
    /// Character level.
    pub level: u16,
    /// Party id, `u16::MAX` when in no party.
    pub party_id: u16,
}

/// Roster entries keyed by unit id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: HashMap<UnitId, RosterEntry>,
}

impl Roster {
    /// Build a roster. A later entry for the same unit replaces an earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.unit_id, e)).collect(),
        }
    }

    /// Entry for `unit_id`.
    #[must_use]
    pub fn get(&self, unit_id: UnitId) -> Option<&RosterEntry> {
        self.entries.get(&unit_id)
    }

    /// All entries keyed by unit id.
    #[must_use]
    pub fn entries_by_unit_id(&self) -> &HashMap<UnitId, RosterEntry> {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RosterEntry> for Roster {
    fn from_iter<I: IntoIterator<Item = RosterEntry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}
