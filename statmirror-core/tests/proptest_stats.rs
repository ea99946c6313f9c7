//! Property-based tests for the stat math and item classification.
//!
//! Uses `proptest` to check the invariants that must hold for any raw
//! stat values the remote process can hold.

use std::sync::Arc;

use proptest::prelude::*;

use statmirror_core::classify::{ClassificationContext, ItemCollectionView, matching_buckets};
use statmirror_core::entity::{
    BodyLoc, InvPage, ItemDetail, ItemFlags, ItemMode, ItemQuality, ItemSnapshot, Snapshot,
    UnitHeader,
};
use statmirror_core::resolver;
use statmirror_core::stats::{RawStat, Stat, StatTable};
use statmirror_core::tables::{ExperienceTable, StatMetadata};
use statmirror_core::types::{Difficulty, Position, Resist, UnitId, UnitType};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Normal),
        Just(Difficulty::Nightmare),
        Just(Difficulty::Hell),
    ]
}

fn arb_mode() -> impl Strategy<Value = ItemMode> {
    (0_u32..7).prop_map(|raw| ItemMode::from_raw(raw).unwrap_or(ItemMode::Stored))
}

fn arb_page() -> impl Strategy<Value = InvPage> {
    prop_oneof![
        (0_u8..6).prop_map(|raw| InvPage::from_raw(raw).unwrap_or(InvPage::None)),
        Just(InvPage::None),
    ]
}

fn arb_body_loc() -> impl Strategy<Value = BodyLoc> {
    (0_u8..13).prop_map(|raw| BodyLoc::from_raw(raw).unwrap_or(BodyLoc::None))
}

fn arb_item() -> impl Strategy<Value = Arc<ItemSnapshot>> {
    (1_u32..10_000, 0_u32..700, 1_u32..6, arb_mode(), arb_page(), arb_body_loc()).prop_map(
        |(id, txt, owner, mode, page, loc)| {
            Arc::new(Snapshot::assemble(
                UnitHeader::detached(UnitType::Item, UnitId(id), txt, 0),
                StatTable::new(),
                ItemDetail {
                    quality: ItemQuality::Normal,
                    owner_id: UnitId(owner),
                    flags: ItemFlags::empty(),
                    prefixes: [0; 3],
                    body_loc: loc,
                    inv_page: page,
                    mode,
                    position: Position::default(),
                },
            ))
        },
    )
}

/// Player 1, merc 2, shared tabs owned by 3, 4 and 5: all distinct.
fn disjoint_ctx() -> ClassificationContext {
    ClassificationContext {
        player_id: UnitId(1),
        mercenary_id: Some(UnitId(2)),
        shared_stash_owners: [Some(UnitId(3)), Some(UnitId(4)), Some(UnitId(5))],
    }
}

// ---------------------------------------------------------------------------
// Property: resistances never exceed their cap, and the penalty always applies
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn resist_bounded_by_cap(
        raw in -500_i32..500,
        bonus in 0_i32..30,
        difficulty in arb_difficulty(),
    ) {
        let table: StatTable = [(Stat::LightningResist, raw), (Stat::MaxLightningResist, bonus)]
            .into_iter()
            .collect();
        let value = resolver::resist(&table, Resist::Lightning, difficulty);
        prop_assert!(value <= 75 + bonus);
        prop_assert!(value <= raw - difficulty.resist_penalty());
        prop_assert_eq!(value, (raw - difficulty.resist_penalty()).min(75 + bonus));
    }

    #[test]
    fn missing_stats_never_fail(difficulty in arb_difficulty()) {
        let table = StatTable::new();
        let resists = resolver::resists(&table, difficulty);
        for (_, value) in resists.iter() {
            prop_assert_eq!(value, -difficulty.resist_penalty());
        }
        prop_assert_eq!(resolver::life(&table, &StatMetadata::default()), 0.0);
        prop_assert_eq!(resolver::experience(&table), 0);
    }
}

// ---------------------------------------------------------------------------
// Property: experience is the unsigned reinterpretation of the stored slot
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn experience_is_unsigned_view(stored in any::<i32>()) {
        let table: StatTable = std::iter::once((Stat::Experience, stored)).collect();
        let expected = i64::from(stored as u32);
        prop_assert_eq!(resolver::experience(&table), expected);
        prop_assert!(resolver::experience(&table) >= 0);
    }

    #[test]
    fn level_progress_in_range_inside_level(level in 1_i32..99, frac in 0.0_f64..1.0) {
        let curve = ExperienceTable::default();
        let idx = level as usize;
        let floor = curve.at(idx - 1).unwrap_or_default();
        let ceiling = curve.at(idx).unwrap_or_default();
        let exp = floor + ((ceiling - floor) as f64 * frac) as i64;
        let stored = exp as u32 as i32;

        let table: StatTable = [(Stat::Level, level), (Stat::Experience, stored)]
            .into_iter()
            .collect();
        let progress = resolver::level_progress(&table, &curve);
        prop_assert!(progress >= 0.0 && progress <= 100.001, "progress {progress}");
    }

    #[test]
    fn high_levels_are_complete(level in 99_i32..200, stored in any::<i32>()) {
        let table: StatTable = [(Stat::Level, level), (Stat::Experience, stored)]
            .into_iter()
            .collect();
        prop_assert_eq!(resolver::level_progress(&table, &ExperienceTable::default()), 100.0);
    }
}

// ---------------------------------------------------------------------------
// Property: stat tables built from raw arrays keep only known ids
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn raw_table_keeps_known_ids(entries in prop::collection::vec((0_u16..4, 0_u16..400, any::<i32>()), 0..64)) {
        let raw: Vec<RawStat> = entries
            .iter()
            .map(|&(layer, id, value)| RawStat { layer, id, value })
            .collect();
        let table = StatTable::from_raw(&raw);
        for (stat, _) in table.iter() {
            prop_assert!(raw.iter().any(|r| r.id == stat.id()));
        }
        for r in &raw {
            if let Some(stat) = Stat::from_id(r.id) {
                prop_assert!(table.contains(stat));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: with distinct owners, every item lands in at most one bucket
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn classification_is_disjoint_and_complete(items in prop::collection::vec(arb_item(), 0..40)) {
        let ctx = disjoint_ctx();
        let view = ItemCollectionView::classify(&items, &ctx).expect("distinct owners never conflict");

        let expected = items.iter().filter(|item| !matching_buckets(item, &ctx).is_empty()).count();
        prop_assert_eq!(view.len(), expected);

        for (kind, bucket) in view.iter_buckets() {
            for item in bucket {
                prop_assert_eq!(matching_buckets(item, &ctx), vec![kind]);
            }
        }
    }
}
