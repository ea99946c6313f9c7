//! # statmirror core library
//!
//! Strongly typed, locally consistent mirror of game units living in the
//! memory of another process, and the stat math derived from them.
//!
//! - [`reader`]: scoped remote reads ([`Process`], [`ProcessContext`])
//! - [`entity`]: the cached/stale update protocol for players, items and
//!   generic units
//! - [`resolver`]: pure functions from a [`StatTable`] to life, mana,
//!   experience, level progress and resistances
//! - [`classify`]: partition of a player's items into eight buckets
//! - [`tables`] / [`loader`]: static game tables, built in or loaded from
//!   tab-separated data files
//!
//! ## Failure model
//!
//! Remote reads fail routinely (the game frees and reuses units at will).
//! Such failures never escape [`MirroredEntity::update`]: it returns `None`
//! and keeps the last good snapshot. Inconsistent data that cannot be
//! tolerated, such as an item in two buckets, is reported as an error.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod entity;
pub mod error;
pub mod layout;
pub mod loader;
pub mod metrics;
pub mod reader;
pub mod resolver;
pub mod roster;
pub mod stats;
pub mod tables;
pub mod types;

pub use classify::{BucketKind, ClassificationContext, ItemCollectionView};
pub use config::MirrorConfig;
pub use entity::{
    EntityKind, ItemEntity, ItemSnapshot, MirroredEntity, PlayerEntity, PlayerSnapshot, Snapshot,
    UnitEntity,
};
pub use error::{MirrorError, Result};
pub use layout::UnitLayout;
pub use metrics::MirrorCounters;
pub use reader::{MemorySource, Process, ProcessContext, RemoteReader};
pub use roster::{Roster, RosterEntry};
pub use stats::{Stat, StatTable};
pub use tables::{ExperienceTable, GameTables};
pub use types::*;
