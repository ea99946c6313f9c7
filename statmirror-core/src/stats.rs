//! Stat identifiers and the per-unit [`StatTable`].
//!
//! A stat table is the flat set of raw numeric attributes the game attaches
//! to a unit. A missing stat means "no contribution": callers go through
//! [`StatTable::get`] or [`StatTable::value_or_zero`], the table has no
//! indexing operator.

use std::collections::BTreeMap;
use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Stat identifiers understood by the mirror, with the game's numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Stat {
    /// Strength.
    Strength = 0,
    /// Energy.
    Energy = 1,
    /// Dexterity.
    Dexterity = 2,
    /// Vitality.
    Vitality = 3,
    /// Unspent attribute points.
    StatPoints = 4,
    /// Unspent skill points.
    SkillPoints = 5,
    /// Current life, stored shifted.
    Life = 6,
    /// Maximum life, stored shifted.
    MaxLife = 7,
    /// Current mana, stored shifted.
    Mana = 8,
    /// Maximum mana, stored shifted.
    MaxMana = 9,
    /// Current stamina, stored shifted.
    Stamina = 10,
    /// Maximum stamina, stored shifted.
    MaxStamina = 11,
    /// Character level.
    Level = 12,
    /// Experience, stored as a wrapping signed 32-bit value.
    Experience = 13,
    /// Gold carried.
    Gold = 14,
    /// Gold in the stash.
    GoldBank = 15,
    /// Enhanced defense percent.
    EnhancedDefense = 16,
    /// Enhanced maximum damage percent.
    EnhancedDamageMax = 17,
    /// Enhanced minimum damage percent.
    EnhancedDamageMin = 18,
    /// Attack rating.
    AttackRating = 19,
    /// Chance to block percent.
    ChanceToBlock = 20,
    /// Minimum damage.
    MinDamage = 21,
    /// Maximum damage.
    MaxDamage = 22,
    /// Defense.
    Defense = 31,
    /// Flat damage reduction.
    DamageReduced = 36,
    /// Magic resistance.
    MagicResist = 37,
    /// Fire resistance.
    FireResist = 39,
    /// Maximum fire resistance bonus.
    MaxFireResist = 40,
    /// Lightning resistance.
    LightningResist = 41,
    /// Maximum lightning resistance bonus.
    MaxLightningResist = 42,
    /// Cold resistance.
    ColdResist = 43,
    /// Maximum cold resistance bonus.
    MaxColdResist = 44,
    /// Poison resistance.
    PoisonResist = 45,
    /// Maximum poison resistance bonus.
    MaxPoisonResist = 46,
    /// Current durability.
    Durability = 72,
    /// Maximum durability.
    MaxDurability = 73,
    /// Life replenished per second.
    ReplenishLife = 74,
    /// Extra gold from monsters percent.
    GoldFind = 79,
    /// Better chance of magic items percent.
    MagicFind = 80,
    /// Increased attack speed percent.
    IncreasedAttackSpeed = 93,
    /// Faster run/walk percent.
    FasterRunWalk = 96,
    /// Faster hit recovery percent.
    FasterHitRecovery = 99,
    /// Faster block rate percent.
    FasterBlockRate = 102,
    /// Faster cast rate percent.
    FasterCastRate = 105,
    /// Bonus to all skills.
    AllSkills = 127,
    /// Number of sockets on an item.
    NumSockets = 194,
}

impl Stat {
    /// Every stat known to the mirror, ordered by id.
    pub const ALL: [Self; 46] = [
        Self::Strength,
        Self::Energy,
        Self::Dexterity,
        Self::Vitality,
        Self::StatPoints,
        Self::SkillPoints,
        Self::Life,
        Self::MaxLife,
        Self::Mana,
        Self::MaxMana,
        Self::Stamina,
        Self::MaxStamina,
        Self::Level,
        Self::Experience,
        Self::Gold,
        Self::GoldBank,
        Self::EnhancedDefense,
        Self::EnhancedDamageMax,
        Self::EnhancedDamageMin,
        Self::AttackRating,
        Self::ChanceToBlock,
        Self::MinDamage,
        Self::MaxDamage,
        Self::Defense,
        Self::DamageReduced,
        Self::MagicResist,
        Self::FireResist,
        Self::MaxFireResist,
        Self::LightningResist,
        Self::MaxLightningResist,
        Self::ColdResist,
        Self::MaxColdResist,
        Self::PoisonResist,
        Self::MaxPoisonResist,
        Self::Durability,
        Self::MaxDurability,
        Self::ReplenishLife,
        Self::GoldFind,
        Self::MagicFind,
        Self::IncreasedAttackSpeed,
        Self::FasterRunWalk,
        Self::FasterHitRecovery,
        Self::FasterBlockRate,
        Self::FasterCastRate,
        Self::AllSkills,
        Self::NumSockets,
    ];

    /// Numeric id used by the game.
    #[must_use]
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Look up a stat by its numeric id.
    #[must_use]
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL
            .binary_search_by_key(&id, |stat| stat.id())
            .ok()
            .map(|idx| Self::ALL[idx])
    }

    /// Fixed-point shift the game applies when storing this stat.
    ///
    /// Life, mana and stamina are stored multiplied by 256.
    #[must_use]
    pub fn default_shift(self) -> u32 {
        match self {
            Self::Life
            | Self::MaxLife
            | Self::Mana
            | Self::MaxMana
            | Self::Stamina
            | Self::MaxStamina => 8,
            _ => 0,
        }
    }

    /// Human-readable name with spaces between words ("Fire Resist").
    #[must_use]
    pub fn display_name(self) -> String {
        let raw = format!("{self:?}");
        let mut out = String::with_capacity(raw.len() + 4);
        for (i, ch) in raw.chars().enumerate() {
            if i > 0 && ch.is_ascii_uppercase() {
                out.push(' ');
            }
            out.push(ch);
        }
        out
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// One entry of the remote stat array, exactly as the game lays it out.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RawStat {
    /// Layer (skill id for skill-scoped stats, 0 for the base value).
    pub layer: u16,
    /// Stat id.
    pub id: u16,
    /// Raw value.
    pub value: i32,
}

/// Ordered mapping from stat to raw signed value for one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatTable {
    values: BTreeMap<Stat, i32>,
}

impl StatTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the remote stat array.
    ///
    /// Unknown ids are skipped. When an id appears several times the base
    /// layer (0) wins, otherwise the first occurrence is kept.
    #[must_use]
    pub fn from_raw(entries: &[RawStat]) -> Self {
        let mut values = BTreeMap::new();
        let mut base_layer_seen = Vec::new();

        for entry in entries {
            let Some(stat) = Stat::from_id(entry.id) else {
                trace!(id = entry.id, layer = entry.layer, "skipping unknown stat id");
                continue;
            };

            if entry.layer == 0 {
                if !base_layer_seen.contains(&stat) {
                    base_layer_seen.push(stat);
                    values.insert(stat, entry.value);
                }
            } else {
                values.entry(stat).or_insert(entry.value);
            }
        }

        Self { values }
    }

    /// Raw value of `stat`, or `None` when the unit carries no such stat.
    #[must_use]
    pub fn get(&self, stat: Stat) -> Option<i32> {
        self.values.get(&stat).copied()
    }

    /// Raw value of `stat`, with a missing stat counting as 0.
    #[must_use]
    pub fn value_or_zero(&self, stat: Stat) -> i32 {
        self.get(stat).unwrap_or(0)
    }

    /// Whether the unit carries `stat` at all.
    #[must_use]
    pub fn contains(&self, stat: Stat) -> bool {
        self.values.contains_key(&stat)
    }

    /// Number of stats present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(stat, raw value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Stat, i32)> + '_ {
        self.values.iter().map(|(stat, value)| (*stat, *value))
    }
}

impl FromIterator<(Stat, i32)> for StatTable {
    fn from_iter<I: IntoIterator<Item = (Stat, i32)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(layer: u16, id: u16, value: i32) -> RawStat {
        RawStat { layer, id, value }
    }

    #[test]
    fn from_id_round_trips_every_stat() {
        for stat in Stat::ALL {
            assert_eq!(Stat::from_id(stat.id()), Some(stat));
        }
        assert_eq!(Stat::from_id(999), None);
    }

    #[test]
    fn all_is_sorted_by_id() {
        assert!(Stat::ALL.windows(2).all(|w| w[0].id() < w[1].id()));
    }

    #[test]
    fn missing_stat_is_absent_not_zero() {
        let table = StatTable::from_raw(&[raw(0, 12, 42)]);
        assert_eq!(table.get(Stat::Level), Some(42));
        assert_eq!(table.get(Stat::Experience), None);
        assert_eq!(table.value_or_zero(Stat::Experience), 0);
        assert!(!table.contains(Stat::NumSockets));
    }

    #[test]
    fn base_layer_wins_over_skill_layers() {
        let table = StatTable::from_raw(&[raw(5, 39, 10), raw(0, 39, 30), raw(0, 39, 99)]);
        assert_eq!(table.get(Stat::FireResist), Some(30));
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let table = StatTable::from_raw(&[raw(0, 500, 1), raw(0, 0, 25)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(Stat::Strength), Some(25));
    }

    #[test]
    fn display_names_are_spaced() {
        assert_eq!(Stat::FireResist.display_name(), "Fire Resist");
        assert_eq!(Stat::Defense.to_string(), "Defense");
    }

    #[test]
    fn raw_stat_matches_remote_layout() {
        assert_eq!(std::mem::size_of::<RawStat>(), 8);
    }

    #[test]
    fn table_serializes_by_stat_name() {
        let table: StatTable = [(Stat::Level, 90), (Stat::Gold, 1000)].into_iter().collect();
        let json = serde_json::to_string(&table).expect("serialize");
        assert!(json.contains("\"Level\":90"));
        let back: StatTable = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, table);
    }
}
