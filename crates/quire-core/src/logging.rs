//! Structured logging schema and field name constants for quire.
//!
//! All crates use these constants for consistent structured logging fields,
//! so editor, classifier and sync events can be filtered by the same names.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Session can no longer make progress |
//! | WARN  | Recoverable issue (failed save, lost subscription, recovery redirect) |
//! | INFO  | Lifecycle events (note opened, hydration, save completed) |
//! | DEBUG | Decision points (remote apply vs defer, auto-correct, expansion) |
//! | TRACE | Per-keystroke data (menu filtering, rule matching) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "editor", "code", "sync"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "slash_menu", "abbreviation", "classifier", "scheduler"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being edited or synchronized.
pub const NOTE_ID: &str = "note_id";

/// Owner (user) identifier.
pub const OWNER_ID: &str = "owner_id";

/// Saved field ("content" or "title").
pub const FIELD: &str = "field";

// ─── Sync fields ───────────────────────────────────────────────────────────

/// Local change counter.
pub const CHANGE_VERSION: &str = "change_version";

/// Highest persisted change counter.
pub const SAVED_VERSION: &str = "saved_version";

/// Change counter captured when a save was scheduled.
pub const SAVE_VERSION: &str = "save_version";

/// Sync status ("loading", "syncing", "synced", "error").
pub const SYNC_STATUS: &str = "sync_status";

// ─── Code fields ───────────────────────────────────────────────────────────

/// Language name (canonical).
pub const LANGUAGE: &str = "language";

/// Detection strategy ("deterministic", "relevance").
pub const STRATEGY: &str = "strategy";

/// Relevance score of the winning grammar.
pub const RELEVANCE: &str = "relevance";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of items (menu entries, labels, nodes).
pub const ITEM_COUNT: &str = "item_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
