//! # statmirror session
//!
//! The single-threaded polling owner of a mirror:
//!
//! - [`session`]: [`MirrorSession`] tracks one mirror per discovered unit,
//!   refreshes them once per tick and drives inventory exports
//! - [`config`]: [`SessionConfig`], the mirror sections plus `[polling]`
//! - [`telemetry`]: global `tracing` subscriber setup

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;

pub use config::{PollingConfig, SessionConfig};
pub use error::{Result, SessionError};
pub use session::{DiscoveredUnit, MirrorSession, TickReport};
pub use telemetry::init_tracing;
