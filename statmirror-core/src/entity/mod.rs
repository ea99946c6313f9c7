//! Mirrored entities and their update protocol.
//!
//! A [`MirroredEntity`] is a local copy of one remote unit. It is either
//! *Fresh* or *Stale*. [`MirroredEntity::update`] on a fresh entity
//! returns the current snapshot without touching the remote process; on a
//! stale one it re-reads the unit inside a single scoped context, builds a
//! complete [`Snapshot`] off to the side and publishes it with one `Arc`
//! swap. [`MirroredEntity::invalidate`] is the only way back to Stale.
//!
//! What gets read beyond the header and the stat table depends on the
//! [`EntityKind`]: [`Player`], [`Item`] or [`GenericUnit`].

mod item;
mod player;

pub use item::{BodyLoc, InvPage, Item, ItemDetail, ItemFlags, ItemMode, ItemQuality, ItemStorage};
pub use player::{ActInfo, Player, PlayerDetail, PlayerEntity, SkillEntry};

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, debug_span, trace};

use crate::error::{MirrorError, Result};
use crate::layout::{HeaderOffsets, StatListOffsets, UnitLayout};
use crate::metrics::spans;
use crate::reader::{Process, RemoteReader};
use crate::stats::{RawStat, StatTable};
use crate::types::{RemoteAddress, UnitId, UnitType};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Unit header
// ---------------------------------------------------------------------------

/// The fields every unit kind shares, decoded from one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader {
    /// Kind of unit.
    pub unit_type: UnitType,
    /// Row in the kind's txt table (item base, monster class, player class).
    pub txt_file_no: u32,
    /// Unit id.
    pub unit_id: UnitId,
    /// Raw mode.
    pub mode: u32,
    /// Kind-specific data.
    pub unit_data: RemoteAddress,
    /// Act.
    pub act: RemoteAddress,
    /// Path.
    pub path: RemoteAddress,
    /// Stat list.
    pub stat_list: RemoteAddress,
    /// Inventory.
    pub inventory: RemoteAddress,
    /// Skill list.
    pub skills: RemoteAddress,
}

impl UnitHeader {
    /// Read the header at `address`.
    ///
    /// # Errors
    ///
    /// Propagates read failures; an unknown unit type is a
    /// [`MirrorError::DataFormat`].
    pub fn read<R: RemoteReader>(
        reader: &R,
        address: RemoteAddress,
        offsets: &HeaderOffsets,
    ) -> Result<Self> {
        let block = reader.read_block(address, offsets.block_len()?)?;
        let raw_type = block.u32_at(offsets.unit_type)?;
        let unit_type = UnitType::from_raw(raw_type).ok_or_else(|| {
            MirrorError::DataFormat(format!("unknown unit type {raw_type} at {address}"))
        })?;

        Ok(Self {
            unit_type,
            txt_file_no: block.u32_at(offsets.txt_file_no)?,
            unit_id: UnitId(block.u32_at(offsets.unit_id)?),
            mode: block.u32_at(offsets.mode)?,
            unit_data: block.ptr_at(offsets.unit_data)?,
            act: block.ptr_at(offsets.act)?,
            path: block.ptr_at(offsets.path)?,
            stat_list: block.ptr_at(offsets.stat_list)?,
            inventory: block.ptr_at(offsets.inventory)?,
            skills: block.ptr_at(offsets.skills)?,
        })
    }

    /// A header for a unit built locally rather than read.
    #[must_use]
    pub fn detached(unit_type: UnitType, unit_id: UnitId, txt_file_no: u32, mode: u32) -> Self {
        Self {
            unit_type,
            txt_file_no,
            unit_id,
            mode,
            unit_data: RemoteAddress::NULL,
            act: RemoteAddress::NULL,
            path: RemoteAddress::NULL,
            stat_list: RemoteAddress::NULL,
            inventory: RemoteAddress::NULL,
            skills: RemoteAddress::NULL,
        }
    }
}

/// Read the stat table behind a stat-list pointer. A null list is empty.
///
/// # Errors
///
/// Propagates read failures and oversized counts.
pub fn read_stat_table<R: RemoteReader>(
    reader: &R,
    stat_list: RemoteAddress,
    offsets: &StatListOffsets,
) -> Result<StatTable> {
    if stat_list.is_null() {
        return Ok(StatTable::new());
    }
    let block = reader.read_block(stat_list, offsets.block_len()?)?;
    let array = block.ptr_at(offsets.stats)?;
    let count = usize::try_from(block.u64_at(offsets.count)?)
        .map_err(|_| MirrorError::DataFormat(format!("stat count overflow at {stat_list}")))?;

    if array.is_null() || count == 0 {
        return Ok(StatTable::new());
    }
    let raw: Vec<RawStat> = reader.read_array(array, count)?;
    Ok(StatTable::from_raw(&raw))
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One consistent view of a unit: header, stats and kind-specific detail,
/// all read inside the same context.
///
/// Snapshots are immutable. A refresh never mutates one; it publishes a new
/// one, so holders of an older `Arc<Snapshot>` keep seeing old values.
#[derive(Debug, Clone)]
pub struct Snapshot<D> {
    generation: u64,
    header: UnitHeader,
    stats: StatTable,
    detail: D,
}

impl<D> Snapshot<D> {
    /// Bundle freshly read parts under a new generation number.
    pub fn assemble(header: UnitHeader, stats: StatTable, detail: D) -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            header,
            stats,
            detail,
        }
    }

    /// Monotonically increasing, process-wide.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Unit header.
    #[must_use]
    pub fn header(&self) -> &UnitHeader {
        &self.header
    }

    /// Unit id.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.header.unit_id
    }

    /// Row in the kind's txt table.
    #[must_use]
    pub fn txt_file_no(&self) -> u32 {
        self.header.txt_file_no
    }

    /// Stat table.
    #[must_use]
    pub fn stats(&self) -> &StatTable {
        &self.stats
    }

    /// Kind-specific detail.
    #[must_use]
    pub fn detail(&self) -> &D {
        &self.detail
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// What a refresh reads beyond the header and stat table.
pub trait EntityKind: Send + Sync + 'static {
    /// Kind-specific data carried by each snapshot.
    type Detail: fmt::Debug + Send + Sync + 'static;

    /// Name used in logs.
    const NAME: &'static str;

    /// Read the kind-specific detail of the unit described by `header`.
    ///
    /// # Errors
    ///
    /// Propagates read failures and malformed data.
    fn read_detail<R: RemoteReader>(
        reader: &R,
        header: &UnitHeader,
        layout: &UnitLayout,
    ) -> Result<Self::Detail>;
}

/// Any unit mirrored for its header and stats alone (monsters, objects).
#[derive(Debug, Clone, Copy)]
pub struct GenericUnit;

impl EntityKind for GenericUnit {
    type Detail = ();
    const NAME: &'static str = "unit";

    fn read_detail<R: RemoteReader>(_: &R, _: &UnitHeader, _: &UnitLayout) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MirroredEntity
// ---------------------------------------------------------------------------

/// Local mirror of one remote unit.
pub struct MirroredEntity<K: EntityKind> {
    unit_id: UnitId,
    address: RemoteAddress,
    layout: Arc<UnitLayout>,
    /// Bumped by every `invalidate`.
    epoch: AtomicU64,
    /// Epoch the published snapshot was read in. Fresh while it equals `epoch`.
    fresh_epoch: AtomicU64,
    current: RwLock<Option<Arc<Snapshot<K::Detail>>>>,
    _kind: PhantomData<fn() -> K>,
}

/// A generic unit mirror.
pub type UnitEntity = MirroredEntity<GenericUnit>;
/// An item mirror.
pub type ItemEntity = MirroredEntity<Item>;
/// Snapshot of an item.
pub type ItemSnapshot = Snapshot<ItemDetail>;
/// Snapshot of a player.
pub type PlayerSnapshot = Snapshot<PlayerDetail>;

impl<K: EntityKind> fmt::Debug for MirroredEntity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirroredEntity")
            .field("kind", &K::NAME)
            .field("unit_id", &self.unit_id)
            .field("address", &self.address)
            .field("cached", &self.is_cached())
            .finish_non_exhaustive()
    }
}

impl<K: EntityKind> MirroredEntity<K> {
    /// Mirror for a unit the enumeration just discovered. Starts Stale with
    /// no snapshot.
    #[must_use]
    pub fn new(unit_id: UnitId, address: RemoteAddress, layout: Arc<UnitLayout>) -> Self {
        Self {
            unit_id,
            address,
            layout,
            epoch: AtomicU64::new(1),
            fresh_epoch: AtomicU64::new(0),
            current: RwLock::new(None),
            _kind: PhantomData,
        }
    }

    /// Unit id this entity was created for.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    /// Address of the unit header.
    #[must_use]
    pub fn address(&self) -> RemoteAddress {
        self.address
    }

    /// Whether the entity is Fresh.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.fresh_epoch.load(Ordering::Acquire) == self.epoch.load(Ordering::Acquire)
    }

    /// Mark the entity Stale so the next `update` re-reads it. A refresh
    /// already in flight publishes its snapshot but leaves the entity Stale.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Last published snapshot, without reading.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot<K::Detail>>> {
        self.current.read().clone()
    }

    /// Refresh if Stale and return the current snapshot.
    ///
    /// Returns `None` when the refresh fails; the entity then stays Stale and
    /// the previous snapshot is left untouched.
    pub fn update(&self, process: &Process) -> Option<Arc<Snapshot<K::Detail>>> {
        self.try_update(process).ok()
    }

    /// Like [`update`](Self::update), reporting why a refresh failed.
    ///
    /// # Errors
    ///
    /// Returns the read or identity failure that aborted the refresh.
    pub fn try_update(&self, process: &Process) -> Result<Arc<Snapshot<K::Detail>>> {
        let counters = process.counters();
        counters.updates_attempted.fetch_add(1, Ordering::Relaxed);

        if self.is_cached() {
            if let Some(current) = self.snapshot() {
                counters.updates_skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(current);
            }
        }

        let span = debug_span!(spans::ENTITY_UPDATE, kind = K::NAME, unit_id = %self.unit_id);
        let _guard = span.enter();

        let epoch = self.epoch.load(Ordering::Acquire);
        match self.refresh(process) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.current.write() = Some(Arc::clone(&snapshot));
                self.fresh_epoch.fetch_max(epoch, Ordering::AcqRel);
                counters.updates_succeeded.fetch_add(1, Ordering::Relaxed);
                trace!(generation = snapshot.generation(), "snapshot published");
                Ok(snapshot)
            }
            Err(err) => {
                counters.updates_failed.fetch_add(1, Ordering::Relaxed);
                debug!(address = %self.address, error = %err, "refresh failed");
                Err(err)
            }
        }
    }

    fn refresh(&self, process: &Process) -> Result<Snapshot<K::Detail>> {
        let ctx = process.context()?;
        let header = UnitHeader::read(&ctx, self.address, &self.layout.header)?;
        if header.unit_id != self.unit_id {
            return Err(MirrorError::IdentityMismatch {
                expected: self.unit_id,
                found: header.unit_id,
            });
        }

        let stats = read_stat_table(&ctx, header.stat_list, &self.layout.stat_list)?;
        let detail = K::read_detail(&ctx, &header, &self.layout)?;
        Ok(Snapshot::assemble(header, stats, detail))
    }
}
