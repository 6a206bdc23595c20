//! Async driver for one open note.
//!
//! A [`NoteSession`] owns the editor, the reconciliation controller, the
//! store subscription and the in-flight writes. Everything runs on the
//! caller's task: [`NoteSession::tick`] waits for the next thing to happen
//! (a write finishing, a snapshot arriving, a debounce deadline passing),
//! handles it and reports it. Local edits made through
//! [`NoteSession::editor_mut`] are picked up at the start of every tick.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use quire_core::{Document, Error, EventEnvelope, Result, Selection};
use quire_editor::{Editor, EditorEvent};

use crate::config::SyncConfig;
use crate::reconcile::{NoteMeta, SaveCompletion, SaveTicket, SnapshotDecision, SyncController};
use crate::recovery::RecoveryFlow;
use crate::scheduler::SaveField;
use crate::store::{DocumentStore, NotePatch, NoteSnapshot, StoreEvent};
use crate::versions::{SyncStatus, VersionCounters};

/// What a call to [`NoteSession::tick`] handled.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Local edits were counted and a save scheduled.
    LocalChange { field: SaveField, version: u64 },
    /// First snapshot loaded into the editor.
    Hydrated,
    /// Remote content replaced the editor content.
    RemoteApplied,
    /// Remote content held back because of unsaved local edits.
    RemoteDeferred {
        change_version: u64,
        saved_version: u64,
    },
    /// Snapshot was the echo of our own write.
    EchoIgnored,
    /// Snapshot content could not be parsed.
    RemoteInvalid { error: String },
    /// Snapshot for a note that is no longer open.
    StaleSnapshot,
    /// Debounced saves handed to the store.
    SavesDispatched { fields: Vec<SaveField> },
    SaveCompleted {
        field: SaveField,
        version: u64,
        status: SyncStatus,
    },
    SaveFailed {
        field: SaveField,
        version: u64,
        error: String,
    },
    /// A write task ended without reporting back.
    SaveAborted { error: String },
    /// Write finished after the session moved to another note.
    StaleCompletion { field: SaveField, version: u64 },
    /// The open note went missing and the session moved to `to`.
    Recovered { from: Option<Uuid>, to: Uuid },
    SubscriptionFailed { error: String },
    SubscriptionClosed,
    /// Nothing left to wait for.
    Idle,
}

struct WriteOutcome {
    ticket: SaveTicket,
    result: Result<()>,
}

enum Wake {
    Write(std::result::Result<WriteOutcome, JoinError>),
    Store(Option<StoreEvent>),
    Due,
    Idle,
}

async fn next_store_event(
    rx: &mut Option<mpsc::UnboundedReceiver<StoreEvent>>,
) -> Option<StoreEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Editing session bound to one note of one owner at a time.
pub struct NoteSession<S: DocumentStore> {
    store: Arc<S>,
    owner: String,
    editor: Editor,
    editor_events: broadcast::Receiver<EventEnvelope<EditorEvent>>,
    controller: SyncController,
    subscription: Option<mpsc::UnboundedReceiver<StoreEvent>>,
    writes: JoinSet<WriteOutcome>,
    recovery: RecoveryFlow<S>,
    status_tx: watch::Sender<SyncStatus>,
}

impl<S: DocumentStore> NoteSession<S> {
    pub fn new(
        store: Arc<S>,
        owner: impl Into<String>,
        editor: Editor,
        config: &SyncConfig,
    ) -> Self {
        let editor_events = editor.subscribe();
        let controller = SyncController::new(config);
        let (status_tx, _) = watch::channel(controller.status());
        Self {
            recovery: RecoveryFlow::new(Arc::clone(&store)),
            store,
            owner: owner.into(),
            editor,
            editor_events,
            controller,
            subscription: None,
            writes: JoinSet::new(),
            status_tx,
        }
    }

    /// Share a recovery flow (and its request coalescing) with other
    /// sessions of the same store.
    pub fn with_recovery(mut self, recovery: RecoveryFlow<S>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn note_id(&self) -> Option<Uuid> {
        self.controller.note_id()
    }

    pub fn status(&self) -> SyncStatus {
        self.controller.status()
    }

    /// Observe sync status changes.
    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn versions(&self) -> VersionCounters {
        self.controller.versions()
    }

    pub fn meta(&self) -> Option<&NoteMeta> {
        self.controller.meta()
    }

    pub fn title(&self) -> Option<&str> {
        self.controller.meta().map(|m| m.title.as_str())
    }

    /// Number of writes handed to the store and not yet finished.
    pub fn writes_in_flight(&self) -> usize {
        self.writes.len()
    }

    /// Open `note_id`, redirecting to the owner's fallback note when it
    /// cannot be subscribed to.
    pub async fn open(&mut self, note_id: Uuid) -> Result<()> {
        if self.attach(note_id).await? {
            return Ok(());
        }
        let fallback = self.recovery.ensure_note(&self.owner).await?;
        if fallback != note_id && self.attach(fallback).await? {
            return Ok(());
        }
        Err(Error::Forbidden(format!(
            "no accessible note for owner {}",
            self.owner
        )))
    }

    /// Rename the open note. Returns the new change version.
    pub fn set_title(&mut self, title: impl Into<String>) -> Option<u64> {
        let version = self.controller.record_edit(
            SaveField::Title,
            NotePatch::title(title),
            1,
            Instant::now(),
        );
        self.publish_status();
        version
    }

    /// Count content edits made since the last call and schedule a save of
    /// the current document.
    pub fn collect_local_changes(&mut self) -> Option<SessionEvent> {
        let mut changes = 0u64;
        loop {
            match self.editor_events.try_recv() {
                Ok(envelope) => {
                    if matches!(envelope.payload, EditorEvent::ContentChanged) {
                        changes += 1;
                    }
                }
                // Dropped messages may have been edits.
                Err(TryRecvError::Lagged(missed)) => changes += missed,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if changes == 0 {
            return None;
        }
        let patch = NotePatch::content(self.editor.document());
        let version =
            self.controller
                .record_edit(SaveField::Content, patch, changes, Instant::now())?;
        self.publish_status();
        Some(SessionEvent::LocalChange {
            field: SaveField::Content,
            version,
        })
    }

    /// Wait for and handle the next event.
    pub async fn tick(&mut self) -> Result<SessionEvent> {
        if let Some(event) = self.collect_local_changes() {
            return Ok(event);
        }

        let deadline = self.controller.next_deadline();
        let sleep = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));
        let wake = tokio::select! {
            biased;
            Some(joined) = self.writes.join_next() => Wake::Write(joined),
            event = next_store_event(&mut self.subscription), if self.subscription.is_some() => {
                Wake::Store(event)
            }
            () = sleep, if deadline.is_some() => Wake::Due,
            else => Wake::Idle,
        };

        let event = match wake {
            Wake::Write(joined) => self.on_write_joined(joined),
            Wake::Store(Some(event)) => self.on_store_event(event).await?,
            Wake::Store(None) => {
                warn!(
                    subsystem = "sync",
                    component = "session",
                    note_id = ?self.controller.note_id(),
                    "Subscription closed"
                );
                self.subscription = None;
                SessionEvent::SubscriptionClosed
            }
            Wake::Due => {
                let tickets = self.controller.take_due(Instant::now());
                SessionEvent::SavesDispatched {
                    fields: self.spawn_writes(tickets),
                }
            }
            Wake::Idle => SessionEvent::Idle,
        };
        self.publish_status();
        Ok(event)
    }

    /// Write every pending save now and wait until all writes finish.
    pub async fn flush(&mut self) -> Vec<SessionEvent> {
        self.collect_local_changes();
        let tickets = self.controller.take_all();
        self.spawn_writes(tickets);

        let mut events = Vec::new();
        while let Some(joined) = self.writes.join_next().await {
            events.push(self.on_write_joined(joined));
        }
        self.publish_status();
        events
    }

    async fn attach(&mut self, note_id: Uuid) -> Result<bool> {
        // Edits not yet collected belong to the previous note.
        self.discard_editor_events();
        self.subscription = None;
        self.controller.open(note_id);
        self.editor.set_content(Document::empty(), false);
        self.publish_status();

        match self.store.subscribe(note_id).await {
            Ok(rx) => {
                self.subscription = Some(rx);
                Ok(true)
            }
            Err(Error::Forbidden(_) | Error::NoteNotFound(_)) => {
                self.controller.mark_missing();
                self.publish_status();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn recover(&mut self) -> Result<SessionEvent> {
        let from = self.controller.note_id();
        self.controller.mark_missing();
        self.subscription = None;
        self.publish_status();

        let to = self.recovery.ensure_note(&self.owner).await?;
        if Some(to) == from || !self.attach(to).await? {
            return Err(Error::Forbidden(format!(
                "fallback note {} is not accessible",
                to
            )));
        }
        info!(
            subsystem = "sync",
            component = "session",
            owner_id = %self.owner,
            from = ?from,
            to = %to,
            "Recovered from missing note"
        );
        Ok(SessionEvent::Recovered { from, to })
    }

    async fn on_store_event(&mut self, event: StoreEvent) -> Result<SessionEvent> {
        match event {
            StoreEvent::Snapshot(snapshot) => self.on_snapshot(snapshot).await,
            StoreEvent::Missing | StoreEvent::Revoked => self.recover().await,
            StoreEvent::Failed(error) => {
                self.controller.mark_error();
                warn!(
                    subsystem = "sync",
                    component = "session",
                    note_id = ?self.controller.note_id(),
                    error = %error,
                    "Subscription error"
                );
                Ok(SessionEvent::SubscriptionFailed { error })
            }
        }
    }

    async fn on_snapshot(&mut self, snapshot: NoteSnapshot) -> Result<SessionEvent> {
        let decision = self.controller.on_snapshot(&snapshot);
        Ok(match decision {
            SnapshotDecision::Hydrate | SnapshotDecision::Apply => {
                if let Err(e) = self.apply_remote(&snapshot) {
                    warn!(
                        subsystem = "sync",
                        component = "session",
                        note_id = %snapshot.id,
                        error = %e,
                        "Remote content rejected"
                    );
                    return Ok(SessionEvent::RemoteInvalid {
                        error: e.to_string(),
                    });
                }
                if decision == SnapshotDecision::Hydrate {
                    info!(
                        subsystem = "sync",
                        component = "session",
                        note_id = %snapshot.id,
                        "Note hydrated"
                    );
                    SessionEvent::Hydrated
                } else {
                    SessionEvent::RemoteApplied
                }
            }
            SnapshotDecision::Echo => SessionEvent::EchoIgnored,
            SnapshotDecision::Defer => {
                let versions = self.controller.versions();
                SessionEvent::RemoteDeferred {
                    change_version: versions.change_version(),
                    saved_version: versions.saved_version(),
                }
            }
            SnapshotDecision::Missing => return self.recover().await,
            SnapshotDecision::Stale => SessionEvent::StaleSnapshot,
        })
    }

    /// Replace the editor content without counting it as a local edit.
    /// A focused editor keeps its selection, clamped into the new content;
    /// an unfocused one starts at the top.
    fn apply_remote(&mut self, snapshot: &NoteSnapshot) -> Result<()> {
        let doc = Document::from_json(&snapshot.content)?;
        let focused = self.editor.is_focused();
        self.editor.set_content(doc, false);
        if !focused {
            self.editor.set_selection(Selection::cursor(0));
        }
        Ok(())
    }

    fn spawn_writes(&mut self, tickets: Vec<SaveTicket>) -> Vec<SaveField> {
        let mut fields = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            fields.push(ticket.field);
            let store = Arc::clone(&self.store);
            self.writes.spawn(async move {
                let result = store.write(ticket.note_id, ticket.patch.clone()).await;
                WriteOutcome { ticket, result }
            });
        }
        fields
    }

    fn on_write_joined(
        &mut self,
        joined: std::result::Result<WriteOutcome, JoinError>,
    ) -> SessionEvent {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                self.controller.mark_error();
                warn!(
                    subsystem = "sync",
                    component = "session",
                    error = %e,
                    "Save task ended abnormally"
                );
                return SessionEvent::SaveAborted {
                    error: e.to_string(),
                };
            }
        };
        let WriteOutcome { ticket, result } = outcome;
        match self.controller.complete_save(&ticket, &result) {
            SaveCompletion::Saved(status) => SessionEvent::SaveCompleted {
                field: ticket.field,
                version: ticket.version,
                status,
            },
            SaveCompletion::Failed(_) => SessionEvent::SaveFailed {
                field: ticket.field,
                version: ticket.version,
                error: result.err().map(|e| e.to_string()).unwrap_or_default(),
            },
            SaveCompletion::Stale => SessionEvent::StaleCompletion {
                field: ticket.field,
                version: ticket.version,
            },
        }
    }

    fn discard_editor_events(&mut self) {
        while !matches!(
            self.editor_events.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ) {}
    }

    fn publish_status(&self) {
        let status = self.controller.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
