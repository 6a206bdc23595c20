//! Centralized default constants for quire.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// LABELS
// =============================================================================

/// Maximum number of labels persisted on a note.
pub const MAX_NOTE_LABELS: usize = 10;

/// Maximum characters in a single normalized label.
pub const MAX_LABEL_LENGTH: usize = 32;

// =============================================================================
// SYNC
// =============================================================================

/// Quiet period before a content change is written to the store.
pub const CONTENT_SAVE_DEBOUNCE_MS: u64 = 800;

/// Quiet period before a title change is written to the store.
pub const TITLE_SAVE_DEBOUNCE_MS: u64 = 600;

/// Title used when the recovery flow has to create a fresh note.
pub const UNTITLED_NOTE_TITLE: &str = "Untitled";

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast buffer capacity for editor and sync event buses.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// CODE BLOCKS
// =============================================================================

/// Snippets shorter than this are never relabeled in passive mode.
pub const AUTOCORRECT_MIN_SNIPPET_LEN: usize = 24;

/// Minimum winning relevance for an aggressive relabel.
pub const AUTOCORRECT_AGGRESSIVE_MIN_RELEVANCE: f64 = 2.0;

/// Minimum margin over the current language for an aggressive relabel.
pub const AUTOCORRECT_AGGRESSIVE_MARGIN: f64 = 1.0;

/// Minimum winning relevance for a passive relabel.
pub const AUTOCORRECT_PASSIVE_MIN_RELEVANCE: f64 = 4.0;

/// Minimum margin over the runner-up and the current language for a passive relabel.
pub const AUTOCORRECT_PASSIVE_MARGIN: f64 = 2.0;

/// Indent width used by every formatter backend.
pub const FORMAT_INDENT_WIDTH: usize = 2;

// =============================================================================
// EDITOR
// =============================================================================

/// Character that opens the slash command menu.
pub const SLASH_TRIGGER: char = '/';

/// Key that triggers abbreviation expansion.
pub const ABBREVIATION_KEY: &str = "Tab";

/// Upper bound on `>N` / `*N` repeat counts in abbreviations.
pub const ABBREVIATION_MAX_ITEMS: usize = 50;

/// Display text for a date chip whose attribute cannot be parsed.
pub const INVALID_DATE_LABEL: &str = "Invalid Date";
