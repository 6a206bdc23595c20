//! # quire-core
//!
//! Core types and abstractions for the quire note editor: the structured
//! document model with its JSON and HTML codecs, chip attribute types, label
//! normalization, the typed event bus, and the shared error, logging and
//! defaults modules the other quire crates depend on.

pub mod chips;
pub mod defaults;
pub mod document;
pub mod error;
pub mod events;
pub mod labels;
pub mod logging;

// Re-export commonly used types at crate root
pub use chips::{format_date_label, parse_chip_date, ChipColor};
pub use document::{Document, Node, NodeKind, ResolvedPos, Selection, OBJECT_CHAR};
pub use error::{Error, Result};
pub use events::{BusEvent, EventBus, EventEnvelope};
