//! The polling owner.
//!
//! A [`MirrorSession`] holds one mirror per discovered unit. Each
//! [`tick`](MirrorSession::tick) reconciles the tracked set against what
//! the enumeration reported, invalidates every mirror once and refreshes
//! it. Units that keep failing are dropped.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, info_span, warn};

use statmirror_core::classify::{ClassificationContext, ItemCollectionView};
use statmirror_core::entity::{ItemEntity, ItemSnapshot, PlayerEntity, UnitEntity};
use statmirror_core::metrics::spans;
use statmirror_core::reader::Process;
use statmirror_core::roster::Roster;
use statmirror_core::tables::GameTables;
use statmirror_core::types::{RemoteAddress, UnitId, UnitType};
use statmirror_core::{MirrorError, UnitLayout};
use statmirror_export::{ExportOutcome, InventoryExporter, ItemDescriber};

use crate::config::{PollingConfig, SessionConfig};
use crate::error::{Result, SessionError};

// ---------------------------------------------------------------------------
// Discovery input and tick output
// ---------------------------------------------------------------------------

/// A unit reported by the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveredUnit {
    /// Unit kind.
    pub unit_type: UnitType,
    /// Unit id.
    pub unit_id: UnitId,
    /// Address of the unit header.
    pub address: RemoteAddress,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Mirrors created for newly reported units.
    pub added: usize,
    /// Mirrors dropped because the unit was no longer reported.
    pub removed: usize,
    /// Mirrors refreshed successfully.
    pub refreshed: usize,
    /// Mirrors whose refresh failed this tick.
    pub failed: usize,
    /// Mirrors dropped for failing too often or for a reused slot.
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// Tracked mirrors
// ---------------------------------------------------------------------------

trait Tracked: Sized {
    fn create(unit_id: UnitId, address: RemoteAddress, layout: Arc<UnitLayout>) -> Self;
    fn address(&self) -> RemoteAddress;
    fn invalidate(&self);
    fn refresh(&self, process: &Process) -> statmirror_core::Result<()>;
}

impl Tracked for PlayerEntity {
    fn create(unit_id: UnitId, address: RemoteAddress, layout: Arc<UnitLayout>) -> Self {
        Self::new(unit_id, address, layout)
    }

    fn address(&self) -> RemoteAddress {
        self.entity().address()
    }

    fn invalidate(&self) {
        PlayerEntity::invalidate(self);
    }

    fn refresh(&self, process: &Process) -> statmirror_core::Result<()> {
        self.try_update(process).map(drop)
    }
}

impl<K: statmirror_core::EntityKind> Tracked for statmirror_core::MirroredEntity<K> {
    fn create(unit_id: UnitId, address: RemoteAddress, layout: Arc<UnitLayout>) -> Self {
        Self::new(unit_id, address, layout)
    }

    fn address(&self) -> RemoteAddress {
        statmirror_core::MirroredEntity::address(self)
    }

    fn invalidate(&self) {
        statmirror_core::MirroredEntity::invalidate(self);
    }

    fn refresh(&self, process: &Process) -> statmirror_core::Result<()> {
        self.try_update(process).map(drop)
    }
}

struct Slot<E> {
    entity: E,
    failures: u32,
}

/// Reconcile `slots` against `reported`, then invalidate and refresh every
/// remaining mirror. Slots keep the order their units were first reported.
fn sync<Key, E>(
    slots: &mut IndexMap<Key, Slot<E>>,
    reported: &IndexMap<Key, (UnitId, RemoteAddress)>,
    ctx: &SyncContext<'_>,
    report: &mut TickReport,
) where
    Key: Hash + Eq + Copy + std::fmt::Debug,
    E: Tracked,
{
    let before = slots.len();
    slots.retain(|key, slot| {
        reported
            .get(key)
            .is_some_and(|(_, address)| *address == slot.entity.address())
    });
    report.removed += before - slots.len();

    for (key, (unit_id, address)) in reported {
        slots.entry(*key).or_insert_with(|| {
            report.added += 1;
            debug!(?key, address = %address, "tracking unit");
            Slot {
                entity: E::create(*unit_id, *address, Arc::clone(ctx.layout)),
                failures: 0,
            }
        });
    }

    for slot in slots.values() {
        slot.entity.invalidate();
    }

    slots.retain(|key, slot| match slot.entity.refresh(ctx.process) {
        Ok(()) => {
            slot.failures = 0;
            report.refreshed += 1;
            true
        }
        Err(MirrorError::IdentityMismatch { expected, found }) => {
            report.failed += 1;
            report.dropped += 1;
            debug!(?key, %expected, %found, "slot reused, dropping unit");
            false
        }
        Err(err) => {
            report.failed += 1;
            slot.failures += 1;
            if slot.failures >= ctx.polling.max_consecutive_failures {
                report.dropped += 1;
                warn!(?key, failures = slot.failures, error = %err, "dropping unit after repeated failures");
                false
            } else {
                true
            }
        }
    });
}

struct SyncContext<'a> {
    process: &'a Process,
    layout: &'a Arc<UnitLayout>,
    polling: &'a PollingConfig,
}

// ---------------------------------------------------------------------------
// MirrorSession
// ---------------------------------------------------------------------------

/// Owns every mirror of one game process.
pub struct MirrorSession {
    process: Process,
    layout: Arc<UnitLayout>,
    tables: Arc<GameTables>,
    polling: PollingConfig,
    exporter: InventoryExporter,
    players: IndexMap<UnitId, Slot<PlayerEntity>>,
    items: IndexMap<UnitId, Slot<ItemEntity>>,
    others: IndexMap<(UnitType, UnitId), Slot<UnitEntity>>,
    roster: RwLock<Arc<Roster>>,
    mercenary: Option<UnitId>,
    shared_stash_owners: [Option<UnitId>; 3],
    ticks: u64,
}

impl std::fmt::Debug for MirrorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSession")
            .field("players", &self.players.len())
            .field("items", &self.items.len())
            .field("others", &self.others.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl MirrorSession {
    /// Session over `process`, loading the configured game tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is unusable or a configured table
    /// file cannot be loaded.
    pub fn new(config: &SessionConfig, process: Process) -> Result<Self> {
        config.mirror.layout.validate()?;
        let tables = GameTables::load(&config.mirror.tables)?;
        let exporter = InventoryExporter::new(config.mirror.export.clone())
            .with_counters(Arc::clone(process.counters()));

        info!(
            interval_ms = config.polling.interval_ms,
            max_failures = config.polling.max_consecutive_failures,
            "mirror session created"
        );

        Ok(Self {
            process,
            layout: Arc::new(config.mirror.layout.clone()),
            tables,
            polling: config.polling.clone(),
            exporter,
            players: IndexMap::new(),
            items: IndexMap::new(),
            others: IndexMap::new(),
            roster: RwLock::new(Arc::new(Roster::default())),
            mercenary: None,
            shared_stash_owners: [None; 3],
            ticks: 0,
        })
    }

    /// Replace the exporter.
    #[must_use]
    pub fn with_exporter(mut self, exporter: InventoryExporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// The process every mirror reads through.
    #[must_use]
    pub fn process(&self) -> &Process {
        &self.process
    }

    /// Static game tables.
    #[must_use]
    pub fn tables(&self) -> &Arc<GameTables> {
        &self.tables
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Poll cadence and drop policy.
    #[must_use]
    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// A tracked player.
    #[must_use]
    pub fn player(&self, unit_id: UnitId) -> Option<&PlayerEntity> {
        self.players.get(&unit_id).map(|slot| &slot.entity)
    }

    /// Tracked players.
    pub fn players(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.players.values().map(|slot| &slot.entity)
    }

    /// A tracked item.
    #[must_use]
    pub fn item(&self, unit_id: UnitId) -> Option<&ItemEntity> {
        self.items.get(&unit_id).map(|slot| &slot.entity)
    }

    /// Latest snapshot of every tracked item, in discovery order.
    #[must_use]
    pub fn item_snapshots(&self) -> Vec<Arc<ItemSnapshot>> {
        self.items.values().filter_map(|slot| slot.entity.snapshot()).collect()
    }

    /// A tracked unit that is neither player nor item.
    #[must_use]
    pub fn unit(&self, unit_type: UnitType, unit_id: UnitId) -> Option<&UnitEntity> {
        self.others.get(&(unit_type, unit_id)).map(|slot| &slot.entity)
    }

    /// Number of tracked mirrors of every kind.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.players.len() + self.items.len() + self.others.len()
    }

    // -----------------------------------------------------------------------
    // Roster and ownership context
    // -----------------------------------------------------------------------

    /// Publish a new roster and relink every tracked player.
    pub fn set_roster(&self, roster: Roster) {
        let roster = Arc::new(roster);
        for slot in self.players.values() {
            slot.entity.update_roster_entry(&roster);
        }
        debug!(entries = roster.len(), "roster published");
        *self.roster.write() = roster;
    }

    /// The current roster.
    #[must_use]
    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.roster.read())
    }

    /// The player's mercenary, used when classifying items.
    pub fn set_mercenary(&mut self, mercenary: Option<UnitId>) {
        self.mercenary = mercenary;
    }

    /// Owners of shared stash tabs 1 to 3.
    pub fn set_shared_stash_owners(&mut self, owners: [Option<UnitId>; 3]) {
        self.shared_stash_owners = owners;
    }

    /// Classification context for `player_id`.
    #[must_use]
    pub fn classification_context(&self, player_id: UnitId) -> ClassificationContext {
        ClassificationContext {
            player_id,
            mercenary_id: self.mercenary,
            shared_stash_owners: self.shared_stash_owners,
        }
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    /// Run one poll over the units reported by the enumeration.
    ///
    /// A unit reported at a new address is treated as a new unit. A
    /// duplicate report keeps the last address. New units are tracked in the
    /// order they are reported, after every unit already tracked.
    pub fn tick(&mut self, discovered: &[DiscoveredUnit]) -> TickReport {
        self.ticks += 1;
        let _span = info_span!(spans::SESSION_TICK, tick = self.ticks).entered();

        let mut players = IndexMap::new();
        let mut items = IndexMap::new();
        let mut others = IndexMap::new();
        for unit in discovered {
            let value = (unit.unit_id, unit.address);
            match unit.unit_type {
                UnitType::Player => {
                    players.insert(unit.unit_id, value);
                }
                UnitType::Item => {
                    items.insert(unit.unit_id, value);
                }
                other => {
                    others.insert((other, unit.unit_id), value);
                }
            }
        }

        let known_players: HashSet<UnitId> = self.players.keys().copied().collect();
        let ctx = SyncContext {
            process: &self.process,
            layout: &self.layout,
            polling: &self.polling,
        };
        let mut report = TickReport::default();
        sync(&mut self.players, &players, &ctx, &mut report);
        sync(&mut self.items, &items, &ctx, &mut report);
        sync(&mut self.others, &others, &ctx, &mut report);

        let roster = self.roster();
        for (unit_id, slot) in &self.players {
            if !known_players.contains(unit_id) {
                slot.entity.update_roster_entry(&roster);
            }
        }

        debug!(
            added = report.added,
            removed = report.removed,
            refreshed = report.refreshed,
            failed = report.failed,
            dropped = report.dropped,
            "tick complete"
        );
        report
    }

    /// Tick until `enumerate` returns `None`, sleeping the configured
    /// interval between ticks. Returns the number of ticks run.
    pub fn run<F>(&mut self, mut enumerate: F) -> u64
    where
        F: FnMut() -> Option<Vec<DiscoveredUnit>>,
    {
        let mut ran = 0;
        while let Some(discovered) = enumerate() {
            self.tick(&discovered);
            ran += 1;
            std::thread::sleep(self.polling.interval());
        }
        info!(ticks = ran, "polling stopped");
        ran
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Re-read the player and every tracked item, classify the items and
    /// write the export documents. Items keep their discovery order inside
    /// each bucket.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PlayerUnavailable`] if the player is not
    /// tracked or cannot be read, a classification conflict, or the
    /// exporter's failure.
    pub fn export_inventory(
        &self,
        player_id: UnitId,
        describer: &dyn ItemDescriber,
    ) -> Result<ExportOutcome> {
        let player = self
            .player(player_id)
            .ok_or(SessionError::PlayerUnavailable(player_id))?;
        player.invalidate();
        let snapshot = player
            .update(&self.process)
            .ok_or(SessionError::PlayerUnavailable(player_id))?;

        let items: Vec<Arc<ItemSnapshot>> = self
            .items
            .values()
            .filter_map(|slot| {
                slot.entity.invalidate();
                slot.entity.update(&self.process)
            })
            .collect();

        let view = ItemCollectionView::classify(&items, &self.classification_context(player_id))
            .inspect_err(|err| {
                if matches!(err, MirrorError::ClassificationConflict { .. }) {
                    self.process
                        .counters()
                        .classification_faults
                        .fetch_add(1, Ordering::Relaxed);
                }
            })?;

        Ok(self.exporter.export(&snapshot, &view, describer)?)
    }
}
