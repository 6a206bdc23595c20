//! # quire-sync
//!
//! Keeps an open note consistent with a remote document store. Local edits
//! bump a change counter and are written after a quiet period; snapshots
//! pushed by the store replace the editor content only when no local change
//! is waiting to be saved. A note that disappears redirects the session to
//! the owner's fallback note.

pub mod coalesce;
pub mod config;
pub mod memory;
pub mod reconcile;
pub mod recovery;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod versions;

pub use coalesce::RequestCoalescer;
pub use config::SyncConfig;
pub use memory::InMemoryStore;
pub use reconcile::{NoteMeta, SaveCompletion, SaveTicket, SnapshotDecision, SyncController};
pub use recovery::RecoveryFlow;
pub use scheduler::{PendingSave, SaveField, SaveScheduler};
pub use session::{NoteSession, SessionEvent};
pub use store::{DocumentStore, NotePatch, NoteSnapshot, StoreEvent};
pub use versions::{SyncStatus, VersionCounters};
