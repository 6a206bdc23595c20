//! Version counters and sync status.

use serde::{Deserialize, Serialize};

/// Sync state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Waiting for the first snapshot of the open note.
    #[default]
    Loading,
    /// Local changes not yet persisted.
    Syncing,
    /// Everything the user typed has been written.
    Synced,
    /// The last write failed.
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local change counter and the highest counter known to be persisted.
///
/// `saved <= change` always holds. The document has unsaved edits exactly
/// when `saved < change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionCounters {
    change: u64,
    saved: u64,
}

impl VersionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change_version(&self) -> u64 {
        self.change
    }

    pub fn saved_version(&self) -> u64 {
        self.saved
    }

    /// Count `n` local changes and return the new change version.
    pub fn record_changes(&mut self, n: u64) -> u64 {
        self.change = self.change.saturating_add(n);
        self.change
    }

    /// Raise the saved version to `version`. Never lowers it and never
    /// passes the change version.
    pub fn mark_saved(&mut self, version: u64) {
        self.saved = self.saved.max(version.min(self.change));
    }

    pub fn is_dirty(&self) -> bool {
        self.saved < self.change
    }

    /// Status after a successful write.
    pub fn settled_status(&self) -> SyncStatus {
        if self.is_dirty() {
            SyncStatus::Syncing
        } else {
            SyncStatus::Synced
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
