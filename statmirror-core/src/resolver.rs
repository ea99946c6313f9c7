//! Derived gameplay quantities computed from a [`StatTable`].
//!
//! Every function here is pure: the same table always yields the same value,
//! and a missing stat counts as 0 rather than failing. Fixed-point stats are
//! shifted by the loaded [`StatMetadata`]; an empty one means the built-in
//! shifts.

use serde::{Deserialize, Serialize};

use crate::stats::{Stat, StatTable};
use crate::tables::{ExperienceTable, MAX_LEVEL, StatMetadata};
use crate::types::{Difficulty, Resist};

/// Base resistance cap before any maximum-resist bonus.
pub const BASE_RESIST_CAP: i32 = 75;

/// Raw value shifted down by the shift listed in `metadata` (or the built-in one).
#[must_use]
pub fn adjusted_value(stat: Stat, raw: i32, metadata: &StatMetadata) -> i32 {
    raw >> metadata.shift_for(stat).min(31)
}

/// Adjusted value of `stat` under `metadata`'s shifts, 0 when the table
/// lacks it.
#[must_use]
pub fn adjusted_or_zero(table: &StatTable, stat: Stat, metadata: &StatMetadata) -> f32 {
    table
        .get(stat)
        .map_or(0.0, |raw| adjusted_value(stat, raw, metadata) as f32)
}

/// Current life.
#[must_use]
pub fn life(table: &StatTable, metadata: &StatMetadata) -> f32 {
    adjusted_or_zero(table, Stat::Life, metadata)
}

/// Maximum life.
#[must_use]
pub fn max_life(table: &StatTable, metadata: &StatMetadata) -> f32 {
    adjusted_or_zero(table, Stat::MaxLife, metadata)
}

/// Current mana.
#[must_use]
pub fn mana(table: &StatTable, metadata: &StatMetadata) -> f32 {
    adjusted_or_zero(table, Stat::Mana, metadata)
}

/// Maximum mana.
#[must_use]
pub fn max_mana(table: &StatTable, metadata: &StatMetadata) -> f32 {
    adjusted_or_zero(table, Stat::MaxMana, metadata)
}

/// `100 × current / max`.
///
/// A zero `max` has no meaningful ratio; the result is then `f32::NAN`,
/// whatever `current` is. Callers check `is_finite()` before display.
#[must_use]
pub fn percentage(current: f32, max: f32) -> f32 {
    if max == 0.0 {
        return f32::NAN;
    }
    100.0 * current / max
}

/// Life as a percentage of maximum life (`NAN` when max life is 0).
#[must_use]
pub fn life_percentage(table: &StatTable, metadata: &StatMetadata) -> f32 {
    percentage(life(table, metadata), max_life(table, metadata))
}

/// Mana as a percentage of maximum mana (`NAN` when max mana is 0).
#[must_use]
pub fn mana_percentage(table: &StatTable, metadata: &StatMetadata) -> f32 {
    percentage(mana(table, metadata), max_mana(table, metadata))
}

/// Character level, 0 when absent.
#[must_use]
pub fn level(table: &StatTable) -> i32 {
    table.value_or_zero(Stat::Level)
}

/// True experience total.
///
/// The game stores experience in a signed 32-bit slot that wraps past
/// `i32::MAX`. A negative stored value `v` is reconstructed as
/// `2^31 + v + 2^31`; non-negative values are used as-is.
#[must_use]
pub fn experience(table: &StatTable) -> i64 {
    let max_int = i64::from(i32::MAX) + 1;
    let stored = i64::from(table.value_or_zero(Stat::Experience));
    if stored < 0 {
        max_int + stored + max_int
    } else {
        stored
    }
}

/// Progress through the current level, in percent.
///
/// * level ≤ 0 → 0
/// * level ≥ 99 → 100
/// * otherwise `100 × (exp − t[L−1]) / (t[L] − t[L−1])`
#[must_use]
pub fn level_progress(table: &StatTable, curve: &ExperienceTable) -> f32 {
    let level = level(table);
    if level <= 0 {
        return 0.0;
    }
    if level >= MAX_LEVEL {
        return 100.0;
    }

    // 1 <= level <= 98, so both indices are inside the 100-entry curve.
    let idx = level as usize;
    let (Some(floor), Some(ceiling)) = (curve.at(idx - 1), curve.at(idx)) else {
        return 0.0;
    };

    let numer = experience(table) - floor;
    let denom = ceiling - floor;
    if denom == 0 {
        return 100.0;
    }
    100.0 * numer as f32 / denom as f32
}

// ---------------------------------------------------------------------------
// Resistances
// ---------------------------------------------------------------------------

/// Effective elemental resistances of one unit at one difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resists {
    /// Fire.
    pub fire: i32,
    /// Lightning.
    pub lightning: i32,
    /// Cold.
    pub cold: i32,
    /// Poison.
    pub poison: i32,
}

impl Resists {
    /// Value for one element.
    #[must_use]
    pub fn get(&self, resist: Resist) -> i32 {
        match resist {
            Resist::Fire => self.fire,
            Resist::Lightning => self.lightning,
            Resist::Cold => self.cold,
            Resist::Poison => self.poison,
        }
    }

    /// Iterate `(element, value)` in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Resist, i32)> + '_ {
        Resist::ALL.into_iter().map(|r| (r, self.get(r)))
    }
}

/// Raw and max-bonus stats for one element.
#[must_use]
pub fn resist_stats(resist: Resist) -> (Stat, Stat) {
    match resist {
        Resist::Fire => (Stat::FireResist, Stat::MaxFireResist),
        Resist::Lightning => (Stat::LightningResist, Stat::MaxLightningResist),
        Resist::Cold => (Stat::ColdResist, Stat::MaxColdResist),
        Resist::Poison => (Stat::PoisonResist, Stat::MaxPoisonResist),
    }
}

/// `min(resist − penalty, 75 + max_bonus)`.
///
/// The penalty always applies; the ceiling ignores it.
#[must_use]
pub fn capped_resist(raw: i32, max_bonus: i32, penalty: i32) -> i32 {
    raw.saturating_sub(penalty)
        .min(BASE_RESIST_CAP.saturating_add(max_bonus))
}

/// Effective resistance for one element.
#[must_use]
pub fn resist(table: &StatTable, resist: Resist, difficulty: Difficulty) -> i32 {
    let (value_stat, bonus_stat) = resist_stats(resist);
    capped_resist(
        table.value_or_zero(value_stat),
        table.value_or_zero(bonus_stat),
        difficulty.resist_penalty(),
    )
}

/// Effective resistances for all four elements.
#[must_use]
pub fn resists(table: &StatTable, difficulty: Difficulty) -> Resists {
    Resists {
        fire: resist(table, Resist::Fire, difficulty),
        lightning: resist(table, Resist::Lightning, difficulty),
        cold: resist(table, Resist::Cold, difficulty),
        poison: resist(table, Resist::Poison, difficulty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(Stat, i32)]) -> StatTable {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_table_defaults() {
        let t = StatTable::new();
        let meta = StatMetadata::default();
        assert_eq!(life(&t, &meta), 0.0);
        assert_eq!(max_mana(&t, &meta), 0.0);
        assert_eq!(level(&t), 0);
        assert_eq!(experience(&t), 0);
        assert_eq!(level_progress(&t, &ExperienceTable::default()), 0.0);
        assert_eq!(resists(&t, Difficulty::Normal).fire, 0);
    }

    #[test]
    fn life_and_mana_are_unshifted() {
        let t = table(&[
            (Stat::Life, 300 << 8),
            (Stat::MaxLife, 600 << 8),
            (Stat::Mana, 50 << 8),
            (Stat::MaxMana, 200 << 8),
        ]);
        let meta = StatMetadata::default();
        assert_eq!(life(&t, &meta), 300.0);
        assert_eq!(max_life(&t, &meta), 600.0);
        assert!((life_percentage(&t, &meta) - 50.0).abs() < f32::EPSILON);
        assert!((mana_percentage(&t, &meta) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_max_gives_nan() {
        let t = table(&[(Stat::Life, 100 << 8)]);
        assert!(life_percentage(&t, &StatMetadata::default()).is_nan());
        assert!(percentage(0.0, 0.0).is_nan());
    }

    #[test]
    fn resist_hell_example() {
        let t = table(&[(Stat::FireResist, 120), (Stat::MaxFireResist, 10)]);
        assert_eq!(resist(&t, Resist::Fire, Difficulty::Hell), 20);
    }

    #[test]
    fn resist_cap_ignores_penalty() {
        let t = table(&[(Stat::ColdResist, 200), (Stat::MaxColdResist, 5)]);
        assert_eq!(resist(&t, Resist::Cold, Difficulty::Normal), 80);
        assert_eq!(resist(&t, Resist::Cold, Difficulty::Nightmare), 80);
        assert_eq!(resist(&t, Resist::Cold, Difficulty::Hell), 80);
    }

    #[test]
    fn resists_can_go_negative() {
        let t = table(&[(Stat::PoisonResist, 10)]);
        assert_eq!(resists(&t, Difficulty::Hell).poison, -90);
        assert_eq!(resists(&t, Difficulty::Nightmare).get(Resist::Poison), -30);
    }

    #[test]
    fn experience_unwraps_negative_storage() {
        let t = table(&[(Stat::Experience, i32::MIN)]);
        assert_eq!(experience(&t), 2_147_483_648);
        let t = table(&[(Stat::Experience, -1)]);
        assert_eq!(experience(&t), 4_294_967_295);
        let t = table(&[(Stat::Experience, 1_000)]);
        assert_eq!(experience(&t), 1_000);
    }

    #[test]
    fn level_progress_endpoints() {
        let curve = ExperienceTable::default();
        let at_floor = table(&[(Stat::Level, 5), (Stat::Experience, 7_875)]);
        assert_eq!(level_progress(&at_floor, &curve), 0.0);
        let at_ceiling = table(&[(Stat::Level, 5), (Stat::Experience, 14_175)]);
        assert_eq!(level_progress(&at_ceiling, &curve), 100.0);
    }

    #[test]
    fn level_progress_uses_unwrapped_experience() {
        let curve = ExperienceTable::default();
        // Level 94 starts at index 93, 2_286_478_756, past i32::MAX.
        let stored = (2_286_478_756_i64 - (1_i64 << 32)) as i32;
        let t = table(&[(Stat::Level, 94), (Stat::Experience, stored)]);
        assert_eq!(level_progress(&t, &curve), 0.0);
    }

    #[test]
    fn level_99_is_terminal() {
        let curve = ExperienceTable::default();
        let t = table(&[(Stat::Level, 99), (Stat::Experience, 0)]);
        assert_eq!(level_progress(&t, &curve), 100.0);
    }

    #[test]
    fn loaded_shift_drives_life_and_mana() {
        let records = crate::loader::parse_tsv(
            "Stat\tID\tValShift\nhitpoints\t6\t4\nmaxhp\t7\t4\nmana\t8\t0\n",
        )
        .expect("parse");
        let meta = StatMetadata::from_records(&records).expect("meta");
        let t = table(&[
            (Stat::Life, 300 << 4),
            (Stat::MaxLife, 600 << 4),
            (Stat::Mana, 50),
            (Stat::MaxMana, 200 << 8),
        ]);
        assert_eq!(life(&t, &meta), 300.0);
        assert_eq!(max_life(&t, &meta), 600.0);
        assert_eq!(mana(&t, &meta), 50.0);
        // Not in the file: built-in shift.
        assert_eq!(max_mana(&t, &meta), 200.0);
        assert!((life_percentage(&t, &meta) - 50.0).abs() < f32::EPSILON);
        assert!((mana_percentage(&t, &meta) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn metadata_shift_applies() {
        let meta = StatMetadata::default();
        assert_eq!(adjusted_value(Stat::Life, 256, &meta), 1);
        assert_eq!(adjusted_value(Stat::Strength, 256, &meta), 256);
    }
}
