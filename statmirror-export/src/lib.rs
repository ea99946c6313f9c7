//! # statmirror export
//!
//! Turns a player's classified items into documents:
//!
//! - [`json`]: [`InventoryDocument`], one array per bucket, parseable back
//! - [`html`]: a templated page with one section per bucket
//! - [`exporter`]: writes `<name>.json` and `<name>.html` to the configured
//!   output directory
//!
//! Item names, colours and stat text come from an [`ItemDescriber`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod describe;
pub mod error;
pub mod exporter;
pub mod html;
pub mod json;
pub mod record;

pub use describe::{BasicDescriber, ItemDescriber};
pub use error::{ExportError, Result};
pub use exporter::{ExportOutcome, InventoryExporter};
pub use html::HtmlTemplate;
pub use json::{InventoryDocument, InventoryItems};
pub use record::ExportedItem;
