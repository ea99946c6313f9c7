//! Partition of a player's items into named buckets.
//!
//! Each bucket is a predicate over one item snapshot and the
//! [`ClassificationContext`]. The buckets are meant to be disjoint; an item
//! accepted by two of them means the remote data is inconsistent, and the
//! whole classification fails with
//! [`MirrorError::ClassificationConflict`]. Items accepted by none (ground,
//! belt, cursor, vendor) are simply left out.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug_span, error};

use crate::entity::{BodyLoc, InvPage, ItemMode, ItemSnapshot, ItemStorage};
use crate::error::{MirrorError, Result};
use crate::metrics::spans;
use crate::types::UnitId;

/// Who the buckets are computed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationContext {
    /// The player whose items are classified.
    pub player_id: UnitId,
    /// The player's mercenary, if hired.
    pub mercenary_id: Option<UnitId>,
    /// Owners of shared stash tabs 1 to 3.
    pub shared_stash_owners: [Option<UnitId>; 3],
}

/// The eight buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BucketKind {
    /// Worn by the player.
    Equipped,
    /// In the player's backpack.
    Inventory,
    /// Worn by the mercenary.
    Mercenary,
    /// In the player's cube.
    Cube,
    /// In the player's own stash tab.
    PersonalStash,
    /// Shared stash tab 1.
    SharedStash1,
    /// Shared stash tab 2.
    SharedStash2,
    /// Shared stash tab 3.
    SharedStash3,
}

impl BucketKind {
    /// Every bucket, in export order.
    pub const ALL: [Self; 8] = [
        Self::Equipped,
        Self::Inventory,
        Self::Mercenary,
        Self::Cube,
        Self::PersonalStash,
        Self::SharedStash1,
        Self::SharedStash2,
        Self::SharedStash3,
    ];

    /// Key used in export documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equipped => "equipped",
            Self::Inventory => "inventory",
            Self::Mercenary => "mercenary",
            Self::Cube => "cube",
            Self::PersonalStash => "personalStash",
            Self::SharedStash1 => "sharedStashTab1",
            Self::SharedStash2 => "sharedStashTab2",
            Self::SharedStash3 => "sharedStashTab3",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Whether `item` belongs in this bucket.
    #[must_use]
    pub fn accepts(self, item: &ItemSnapshot, ctx: &ClassificationContext) -> bool {
        let d = item.detail();
        let owned_by_player = d.owner_id == ctx.player_id;
        let stash_owned_by = |tab: usize| {
            d.storage() == ItemStorage::Stash
                && ctx.shared_stash_owners[tab].is_some_and(|owner| owner == d.owner_id)
        };

        match self {
            Self::Equipped => {
                owned_by_player && d.inv_page == InvPage::None && d.body_loc != BodyLoc::None
            }
            Self::Inventory => owned_by_player && d.inv_page == InvPage::Inventory,
            Self::Mercenary => {
                d.mode == ItemMode::Equip && ctx.mercenary_id.is_some_and(|m| m == d.owner_id)
            }
            Self::Cube => owned_by_player && d.storage() == ItemStorage::Cube,
            Self::PersonalStash => owned_by_player && d.storage() == ItemStorage::Stash,
            Self::SharedStash1 => stash_owned_by(0),
            Self::SharedStash2 => stash_owned_by(1),
            Self::SharedStash3 => stash_owned_by(2),
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every bucket that accepts `item`.
#[must_use]
pub fn matching_buckets(item: &ItemSnapshot, ctx: &ClassificationContext) -> Vec<BucketKind> {
    BucketKind::ALL
        .into_iter()
        .filter(|bucket| bucket.accepts(item, ctx))
        .collect()
}

/// A player's items split into the eight buckets.
///
/// Recomputed from scratch on each [`classify`](Self::classify); each
/// bucket keeps the order the items were supplied in.
#[derive(Debug, Clone, Default)]
pub struct ItemCollectionView {
    buckets: [Vec<Arc<ItemSnapshot>>; 8],
}

impl ItemCollectionView {
    /// Classify `items`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::ClassificationConflict`] for the first item
    /// accepted by more than one bucket.
    pub fn classify<'a, I>(items: I, ctx: &ClassificationContext) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Arc<ItemSnapshot>>,
    {
        let span = debug_span!(spans::CLASSIFY, player_id = %ctx.player_id);
        let _guard = span.enter();

        let mut view = Self::default();
        for item in items {
            match matching_buckets(item, ctx).as_slice() {
                [] => {}
                [bucket] => view.buckets[bucket.index()].push(Arc::clone(item)),
                several => {
                    let buckets: Vec<&'static str> = several.iter().map(|b| b.as_str()).collect();
                    error!(
                        unit_id = %item.unit_id(),
                        owner_id = %item.owner_id(),
                        ?buckets,
                        "item matches several buckets"
                    );
                    return Err(MirrorError::ClassificationConflict {
                        unit_id: item.unit_id(),
                        buckets,
                    });
                }
            }
        }
        Ok(view)
    }

    /// Items in one bucket.
    #[must_use]
    pub fn bucket(&self, kind: BucketKind) -> &[Arc<ItemSnapshot>] {
        &self.buckets[kind.index()]
    }

    /// Iterate `(bucket, items)` in export order.
    pub fn iter_buckets(&self) -> impl Iterator<Item = (BucketKind, &[Arc<ItemSnapshot>])> {
        BucketKind::ALL
            .into_iter()
            .map(|kind| (kind, self.bucket(kind)))
    }

    /// Copy with every bucket stably sorted by item type.
    #[must_use]
    pub fn sorted_by_type(&self) -> Self {
        let mut sorted = self.clone();
        for bucket in &mut sorted.buckets {
            bucket.sort_by_key(|item| item.txt_file_no());
        }
        sorted
    }

    /// Items across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Whether every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ItemDetail, ItemFlags, ItemQuality, Snapshot, UnitHeader};
    use crate::stats::StatTable;
    use crate::types::{Position, UnitType};

    const PLAYER: UnitId = UnitId(1);
    const MERC: UnitId = UnitId(2);
    const SHARED: [UnitId; 3] = [UnitId(10), UnitId(11), UnitId(12)];

    fn ctx() -> ClassificationContext {
        ClassificationContext {
            player_id: PLAYER,
            mercenary_id: Some(MERC),
            shared_stash_owners: SHARED.map(Some),
        }
    }

    fn item(id: u32, txt: u32, owner: UnitId, mode: ItemMode, page: InvPage, loc: BodyLoc) -> Arc<ItemSnapshot> {
        let raw_mode = match mode {
            ItemMode::Stored => 0,
            ItemMode::Equip => 1,
            _ => 3,
        };
        Arc::new(Snapshot::assemble(
            UnitHeader::detached(UnitType::Item, UnitId(id), txt, raw_mode),
            StatTable::new(),
            ItemDetail {
                quality: ItemQuality::Normal,
                owner_id: owner,
                flags: ItemFlags::IDENTIFIED,
                prefixes: [0; 3],
                body_loc: loc,
                inv_page: page,
                mode,
                position: Position::default(),
            },
        ))
    }

    #[test]
    fn each_bucket_receives_its_items() {
        let items = vec![
            item(100, 5, PLAYER, ItemMode::Equip, InvPage::None, BodyLoc::Head),
            item(101, 6, PLAYER, ItemMode::Stored, InvPage::Inventory, BodyLoc::None),
            item(102, 7, MERC, ItemMode::Equip, InvPage::None, BodyLoc::Armor),
            item(103, 8, PLAYER, ItemMode::Stored, InvPage::Cube, BodyLoc::None),
            item(104, 9, PLAYER, ItemMode::Stored, InvPage::Stash, BodyLoc::None),
            item(105, 10, SHARED[0], ItemMode::Stored, InvPage::Stash, BodyLoc::None),
            item(106, 11, SHARED[1], ItemMode::Stored, InvPage::Stash, BodyLoc::None),
            item(107, 12, SHARED[2], ItemMode::Stored, InvPage::Stash, BodyLoc::None),
            // On the ground: no bucket.
            item(108, 13, PLAYER, ItemMode::OnGround, InvPage::None, BodyLoc::None),
        ];

        let view = ItemCollectionView::classify(&items, &ctx()).expect("classify");
        assert_eq!(view.len(), 8);
        for (kind, bucket) in view.iter_buckets() {
            assert_eq!(bucket.len(), 1, "bucket {kind}");
        }
        assert_eq!(view.bucket(BucketKind::Mercenary)[0].unit_id(), UnitId(102));
        assert_eq!(view.bucket(BucketKind::SharedStash3)[0].unit_id(), UnitId(107));
    }

    #[test]
    fn merc_owning_player_id_is_a_conflict() {
        let ctx = ClassificationContext {
            mercenary_id: Some(PLAYER),
            ..ctx()
        };
        let items = vec![item(1, 1, PLAYER, ItemMode::Equip, InvPage::None, BodyLoc::Head)];
        let err = ItemCollectionView::classify(&items, &ctx).expect_err("conflict");
        match err {
            MirrorError::ClassificationConflict { unit_id, buckets } => {
                assert_eq!(unit_id, UnitId(1));
                assert_eq!(buckets, vec!["equipped", "mercenary"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn sorted_by_type_is_stable() {
        let items = vec![
            item(1, 30, PLAYER, ItemMode::Stored, InvPage::Inventory, BodyLoc::None),
            item(2, 10, PLAYER, ItemMode::Stored, InvPage::Inventory, BodyLoc::None),
            item(3, 30, PLAYER, ItemMode::Stored, InvPage::Inventory, BodyLoc::None),
            item(4, 20, PLAYER, ItemMode::Stored, InvPage::Inventory, BodyLoc::None),
        ];
        let view = ItemCollectionView::classify(&items, &ctx()).expect("classify");
        let ids = |v: &ItemCollectionView| {
            v.bucket(BucketKind::Inventory)
                .iter()
                .map(|i| i.unit_id().0)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&view), vec![1, 2, 3, 4]);
        assert_eq!(ids(&view.sorted_by_type()), vec![2, 4, 1, 3]);
    }

    #[test]
    fn empty_input_gives_empty_view() {
        let view = ItemCollectionView::classify(std::iter::empty(), &ctx()).expect("classify");
        assert!(view.is_empty());
    }
}
