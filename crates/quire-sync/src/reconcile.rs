//! Reconciliation policy.
//!
//! [`SyncController`] decides, for one open note at a time, when local edits
//! are written and whether an incoming snapshot may replace the editor
//! content. It performs no I/O: the session feeds it edits, due times,
//! write completions and snapshots, and carries out what it returns.
//!
//! Snapshot content is applied only on first hydration or when every local
//! change has been persisted (`saved_version == change_version`). Scalar
//! fields are always taken from the latest snapshot.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use quire_core::Error;

use crate::config::SyncConfig;
use crate::scheduler::{PendingSave, SaveField, SaveScheduler};
use crate::store::{NotePatch, NoteSnapshot};
use crate::versions::{SyncStatus, VersionCounters};

/// Scalar note fields, last remote write wins.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMeta {
    pub title: String,
    pub labels: Vec<String>,
    pub pinned: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&NoteSnapshot> for NoteMeta {
    fn from(snapshot: &NoteSnapshot) -> Self {
        Self {
            title: snapshot.title.clone(),
            labels: snapshot.labels.clone(),
            pinned: snapshot.pinned,
            updated_at: snapshot.updated_at,
        }
    }
}

/// A save ready to be written, bound to the note and open epoch it was
/// scheduled under.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub note_id: Uuid,
    pub epoch: u64,
    pub field: SaveField,
    pub version: u64,
    pub patch: NotePatch,
}

/// What to do with an incoming snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// First snapshot of the note: load it.
    Hydrate,
    /// No unsaved local edits: replace the content.
    Apply,
    /// Equal to the content this client last wrote.
    Echo,
    /// Unsaved local edits outstanding: keep the local content.
    Defer,
    /// The note is gone or soft-deleted.
    Missing,
    /// Snapshot for a note that is no longer open.
    Stale,
}

/// Result of a finished write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveCompletion {
    Saved(SyncStatus),
    Failed(SyncStatus),
    /// Completion for a note that is no longer open.
    Stale,
}

#[derive(Debug)]
pub struct SyncController {
    note_id: Option<Uuid>,
    epoch: u64,
    versions: VersionCounters,
    hydrated: bool,
    missing: bool,
    status: SyncStatus,
    scheduler: SaveScheduler,
    meta: Option<NoteMeta>,
    last_submitted: Option<JsonValue>,
    echo_detection: bool,
}

impl SyncController {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            note_id: None,
            epoch: 0,
            versions: VersionCounters::new(),
            hydrated: false,
            missing: false,
            status: SyncStatus::Loading,
            scheduler: SaveScheduler::from_config(config),
            meta: None,
            last_submitted: None,
            echo_detection: config.echo_detection,
        }
    }

    pub fn note_id(&self) -> Option<Uuid> {
        self.note_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn versions(&self) -> VersionCounters {
        self.versions
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn is_missing(&self) -> bool {
        self.missing
    }

    pub fn meta(&self) -> Option<&NoteMeta> {
        self.meta.as_ref()
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Switch to `note_id`. Pending saves of the previous note are dropped
    /// and every counter starts over; writes already in flight complete
    /// under the old epoch and are ignored.
    pub fn open(&mut self, note_id: Uuid) -> usize {
        let cancelled = self.scheduler.cancel_all();
        let previous = self.note_id.replace(note_id);
        self.epoch += 1;
        self.versions.reset();
        self.hydrated = false;
        self.missing = false;
        self.status = SyncStatus::Loading;
        self.meta = None;
        self.last_submitted = None;
        info!(
            subsystem = "sync",
            component = "controller",
            note_id = %note_id,
            previous = ?previous,
            cancelled,
            "Note opened"
        );
        cancelled
    }

    /// Count `changes` local edits of `field` and schedule `patch` in place
    /// of any pending save for that field. Returns the new change version,
    /// or `None` when no writable, hydrated note is open.
    pub fn record_edit(
        &mut self,
        field: SaveField,
        patch: NotePatch,
        changes: u64,
        now: Instant,
    ) -> Option<u64> {
        if self.note_id.is_none() || self.missing || !self.hydrated || changes == 0 {
            return None;
        }
        let version = self.versions.record_changes(changes);
        if field == SaveField::Title {
            if let (Some(meta), Some(title)) = (self.meta.as_mut(), patch.title.as_ref()) {
                meta.title = title.clone();
            }
        }
        self.scheduler.schedule(field, patch, version, now);
        self.status = SyncStatus::Syncing;
        debug!(
            subsystem = "sync",
            component = "controller",
            field = field.as_str(),
            change_version = version,
            saved_version = self.versions.saved_version(),
            "Local edit recorded"
        );
        Some(version)
    }

    fn ticket(&mut self, note_id: Uuid, save: PendingSave) -> SaveTicket {
        if save.field == SaveField::Content {
            self.last_submitted = save.patch.content.clone();
        }
        SaveTicket {
            note_id,
            epoch: self.epoch,
            field: save.field,
            version: save.version,
            patch: save.patch,
        }
    }

    /// Saves whose quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Vec<SaveTicket> {
        let Some(note_id) = self.note_id else {
            return Vec::new();
        };
        let due = self.scheduler.take_due(now);
        due.into_iter().map(|s| self.ticket(note_id, s)).collect()
    }

    /// Every pending save, without waiting for its quiet period.
    pub fn take_all(&mut self) -> Vec<SaveTicket> {
        let Some(note_id) = self.note_id else {
            return Vec::new();
        };
        let all = self.scheduler.take_all();
        all.into_iter().map(|s| self.ticket(note_id, s)).collect()
    }

    /// Record the outcome of a write. Counters only move on success.
    pub fn complete_save(
        &mut self,
        ticket: &SaveTicket,
        result: &Result<(), Error>,
    ) -> SaveCompletion {
        if ticket.epoch != self.epoch || Some(ticket.note_id) != self.note_id {
            debug!(
                subsystem = "sync",
                component = "controller",
                note_id = %ticket.note_id,
                save_version = ticket.version,
                "Ignoring completion for a previously open note"
            );
            return SaveCompletion::Stale;
        }
        match result {
            Ok(()) => {
                self.versions.mark_saved(ticket.version);
                self.status = self.versions.settled_status();
                info!(
                    subsystem = "sync",
                    component = "controller",
                    note_id = %ticket.note_id,
                    field = ticket.field.as_str(),
                    save_version = ticket.version,
                    change_version = self.versions.change_version(),
                    saved_version = self.versions.saved_version(),
                    sync_status = self.status.as_str(),
                    "Save completed"
                );
                SaveCompletion::Saved(self.status)
            }
            Err(e) => {
                self.status = SyncStatus::Error;
                warn!(
                    subsystem = "sync",
                    component = "controller",
                    note_id = %ticket.note_id,
                    field = ticket.field.as_str(),
                    save_version = ticket.version,
                    error = %e,
                    "Save failed"
                );
                SaveCompletion::Failed(self.status)
            }
        }
    }

    /// Classify a snapshot and update scalar fields from it.
    pub fn on_snapshot(&mut self, snapshot: &NoteSnapshot) -> SnapshotDecision {
        if Some(snapshot.id) != self.note_id {
            return SnapshotDecision::Stale;
        }
        if snapshot.deleted {
            self.mark_missing();
            return SnapshotDecision::Missing;
        }
        self.meta = Some(NoteMeta::from(snapshot));

        let decision = if !self.hydrated {
            self.hydrated = true;
            self.last_submitted = None;
            self.status = self.versions.settled_status();
            SnapshotDecision::Hydrate
        } else if self.versions.is_dirty() {
            SnapshotDecision::Defer
        } else if self.echo_detection && self.last_submitted.as_ref() == Some(&snapshot.content) {
            SnapshotDecision::Echo
        } else {
            // Once someone else's body is shown, matching our old submission is no longer an echo.
            self.last_submitted = None;
            SnapshotDecision::Apply
        };
        debug!(
            subsystem = "sync",
            component = "controller",
            note_id = %snapshot.id,
            decision = ?decision,
            change_version = self.versions.change_version(),
            saved_version = self.versions.saved_version(),
            "Snapshot reconciled"
        );
        decision
    }

    /// The open note no longer exists or is no longer accessible. Pending
    /// saves are dropped.
    pub fn mark_missing(&mut self) {
        if self.missing {
            return;
        }
        self.missing = true;
        let cancelled = self.scheduler.cancel_all();
        self.status = SyncStatus::Error;
        warn!(
            subsystem = "sync",
            component = "controller",
            note_id = ?self.note_id,
            cancelled,
            "Open note is missing or inaccessible"
        );
    }

    /// The subscription reported an error unrelated to access.
    pub fn mark_error(&mut self) {
        self.status = SyncStatus::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::{Document, Node};
    use std::time::Duration;

    fn doc(text: &str) -> Document {
        Document::new(vec![Node::paragraph(vec![Node::text(text)])])
    }

    fn snapshot(id: Uuid, text: &str) -> NoteSnapshot {
        let doc = doc(text);
        NoteSnapshot {
            id,
            owner_id: "ada".into(),
            title: "Notes".into(),
            content: doc.to_json(),
            plain_text: doc.plain_text(),
            labels: vec![],
            pinned: false,
            deleted: false,
            deleted_at: None,
            updated_at: Utc::now(),
        }
    }

    fn opened() -> (SyncController, Uuid) {
        let mut controller = SyncController::new(&SyncConfig::default());
        let id = Uuid::now_v7();
        controller.open(id);
        assert_eq!(
            controller.on_snapshot(&snapshot(id, "initial")),
            SnapshotDecision::Hydrate
        );
        (controller, id)
    }

    fn edit(controller: &mut SyncController, text: &str, changes: u64, now: Instant) -> u64 {
        controller
            .record_edit(SaveField::Content, NotePatch::content(&doc(text)), changes, now)
            .unwrap()
    }

    fn due(controller: &mut SyncController, now: Instant) -> SaveTicket {
        let mut tickets = controller.take_due(now + Duration::from_secs(1));
        assert_eq!(tickets.len(), 1);
        tickets.remove(0)
    }

    #[test]
    fn test_hydration_then_synced() {
        let (controller, _) = opened();
        assert!(controller.is_hydrated());
        assert_eq!(controller.status(), SyncStatus::Synced);
        assert_eq!(controller.meta().unwrap().title, "Notes");
    }

    #[test]
    fn test_fully_synced_snapshot_is_applied() {
        let (mut c, id) = opened();
        let now = Instant::now();
        edit(&mut c, "local", 5, now);
        let ticket = due(&mut c, now);
        assert_eq!(ticket.version, 5);
        c.complete_save(&ticket, &Ok(()));

        assert_eq!(c.versions().change_version(), 5);
        assert_eq!(c.versions().saved_version(), 5);
        assert_eq!(c.on_snapshot(&snapshot(id, "remote")), SnapshotDecision::Apply);
    }

    #[test]
    fn test_unsaved_edits_defer_snapshot_until_caught_up() {
        let (mut c, id) = opened();
        let now = Instant::now();
        edit(&mut c, "abc", 3, now);
        let first = due(&mut c, now);
        edit(&mut c, "abcde", 2, now);
        assert_eq!(
            c.complete_save(&first, &Ok(())),
            SaveCompletion::Saved(SyncStatus::Syncing)
        );

        assert_eq!(c.versions().change_version(), 5);
        assert_eq!(c.versions().saved_version(), 3);
        assert_eq!(c.on_snapshot(&snapshot(id, "remote")), SnapshotDecision::Defer);

        let second = due(&mut c, now);
        assert_eq!(
            c.complete_save(&second, &Ok(())),
            SaveCompletion::Saved(SyncStatus::Synced)
        );
        assert_eq!(c.on_snapshot(&snapshot(id, "remote")), SnapshotDecision::Apply);
    }

    #[test]
    fn test_echo_of_own_write() {
        let (mut c, id) = opened();
        let now = Instant::now();
        edit(&mut c, "mine", 1, now);
        let ticket = due(&mut c, now);
        c.complete_save(&ticket, &Ok(()));
        assert_eq!(c.on_snapshot(&snapshot(id, "mine")), SnapshotDecision::Echo);

        let mut plain = SyncController::new(&SyncConfig::default().with_echo_detection(false));
        plain.open(id);
        plain.on_snapshot(&snapshot(id, "initial"));
        edit(&mut plain, "mine", 1, now);
        let ticket = due(&mut plain, now);
        plain.complete_save(&ticket, &Ok(()));
        assert_eq!(
            plain.on_snapshot(&snapshot(id, "mine")),
            SnapshotDecision::Apply
        );
    }

    #[test]
    fn test_reverting_to_an_earlier_write_is_applied() {
        let (mut c, id) = opened();
        let now = Instant::now();
        edit(&mut c, "mine", 1, now);
        let ticket = due(&mut c, now);
        c.complete_save(&ticket, &Ok(()));

        assert_eq!(c.on_snapshot(&snapshot(id, "mine")), SnapshotDecision::Echo);
        assert_eq!(c.on_snapshot(&snapshot(id, "theirs")), SnapshotDecision::Apply);
        assert_eq!(c.on_snapshot(&snapshot(id, "mine")), SnapshotDecision::Apply);
    }

    #[test]
    fn test_edits_before_hydration_are_not_scheduled() {
        let mut c = SyncController::new(&SyncConfig::default());
        let id = Uuid::now_v7();
        c.open(id);
        let now = Instant::now();

        assert_eq!(
            c.record_edit(SaveField::Content, NotePatch::content(&doc("early")), 1, now),
            None
        );
        assert_eq!(
            c.record_edit(SaveField::Title, NotePatch::title("early"), 1, now),
            None
        );
        assert!(c.scheduler().is_idle());
        assert_eq!(c.versions(), VersionCounters::new());
        assert_eq!(c.status(), SyncStatus::Loading);

        assert_eq!(c.on_snapshot(&snapshot(id, "remote")), SnapshotDecision::Hydrate);
        assert_eq!(c.status(), SyncStatus::Synced);
        assert_eq!(edit(&mut c, "remote!", 1, now), 1);
    }

    #[test]
    fn test_failed_write_keeps_counters() {
        let (mut c, _) = opened();
        let now = Instant::now();
        edit(&mut c, "x", 1, now);
        let ticket = due(&mut c, now);
        let result = Err(Error::Store("down".into()));
        assert_eq!(
            c.complete_save(&ticket, &result),
            SaveCompletion::Failed(SyncStatus::Error)
        );
        assert_eq!(c.versions().saved_version(), 0);
        assert_eq!(c.versions().change_version(), 1);

        edit(&mut c, "xy", 1, now);
        assert_eq!(c.status(), SyncStatus::Syncing);
        let retry = due(&mut c, now);
        assert_eq!(
            c.complete_save(&retry, &Ok(())),
            SaveCompletion::Saved(SyncStatus::Synced)
        );
    }

    #[test]
    fn test_switch_cancels_and_ignores_old_completions() {
        let (mut c, a) = opened();
        let now = Instant::now();
        edit(&mut c, "for a", 1, now);
        let in_flight = due(&mut c, now);
        edit(&mut c, "for a again", 1, now);

        let b = Uuid::now_v7();
        assert_eq!(c.open(b), 1);
        assert_eq!(c.status(), SyncStatus::Loading);
        assert_eq!(c.versions(), VersionCounters::new());
        assert!(c.take_due(now + Duration::from_secs(5)).is_empty());

        assert_eq!(c.complete_save(&in_flight, &Ok(())), SaveCompletion::Stale);
        assert_eq!(c.versions().saved_version(), 0);
        assert_eq!(c.on_snapshot(&snapshot(a, "late")), SnapshotDecision::Stale);
        assert_eq!(c.on_snapshot(&snapshot(b, "b")), SnapshotDecision::Hydrate);
    }

    #[test]
    fn test_title_applies_even_when_content_deferred() {
        let (mut c, id) = opened();
        edit(&mut c, "dirty", 1, Instant::now());
        let mut remote = snapshot(id, "remote");
        remote.title = "Renamed".into();
        assert_eq!(c.on_snapshot(&remote), SnapshotDecision::Defer);
        assert_eq!(c.meta().unwrap().title, "Renamed");
    }

    #[test]
    fn test_soft_deleted_snapshot_is_missing() {
        let (mut c, id) = opened();
        edit(&mut c, "x", 1, Instant::now());
        let mut remote = snapshot(id, "x");
        remote.deleted = true;
        assert_eq!(c.on_snapshot(&remote), SnapshotDecision::Missing);
        assert!(c.is_missing());
        assert!(c.scheduler().is_idle());
        assert_eq!(
            c.record_edit(SaveField::Title, NotePatch::title("t"), 1, Instant::now()),
            None
        );
    }
}
