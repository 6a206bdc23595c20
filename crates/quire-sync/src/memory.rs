//! In-memory [`DocumentStore`].
//!
//! Behaves like a hosted document database for a single process: the store
//! assigns `updated_at`, every committed write is pushed to all subscribers
//! of the note (the writer included), and deletions and access revocations
//! are announced on open subscriptions. Write failures and latency can be
//! injected for tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use quire_core::defaults::UNTITLED_NOTE_TITLE;
use quire_core::{Document, Error, Result};

use crate::store::{DocumentStore, NotePatch, NoteSnapshot, StoreEvent};

#[derive(Debug, Default)]
struct Inner {
    notes: HashMap<Uuid, NoteSnapshot>,
    subscribers: HashMap<Uuid, Vec<mpsc::UnboundedSender<StoreEvent>>>,
    revoked: HashSet<Uuid>,
    failing_writes: usize,
    write_delay: Option<Duration>,
    write_log: Vec<(Uuid, NotePatch)>,
}

impl Inner {
    fn notify(&mut self, id: Uuid, event: StoreEvent) {
        if let Some(senders) = self.subscribers.get_mut(&id) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a note as-is and notify its subscribers.
    pub async fn insert(&self, note: NoteSnapshot) {
        let mut inner = self.inner.lock().await;
        let id = note.id;
        inner.notes.insert(id, note.clone());
        inner.notify(id, StoreEvent::Snapshot(note));
    }

    pub async fn get(&self, id: Uuid) -> Option<NoteSnapshot> {
        self.inner.lock().await.notes.get(&id).cloned()
    }

    /// Make the next `n` writes fail with [`Error::Store`].
    pub async fn fail_next_writes(&self, n: usize) {
        self.inner.lock().await.failing_writes = n;
    }

    /// Delay every write by `delay` before it commits.
    pub async fn set_write_delay(&self, delay: Option<Duration>) {
        self.inner.lock().await.write_delay = delay;
    }

    /// Revoke access to a note. Open subscriptions receive
    /// [`StoreEvent::Revoked`] and are closed.
    pub async fn revoke(&self, id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner.revoked.insert(id);
        inner.notify(id, StoreEvent::Revoked);
        inner.subscribers.remove(&id);
        info!(subsystem = "sync", component = "memory_store", note_id = %id, "Access revoked");
    }

    /// Every committed write in commit order.
    pub async fn writes(&self) -> Vec<(Uuid, NotePatch)> {
        self.inner.lock().await.write_log.clone()
    }

    /// Number of live subscriptions on a note.
    pub async fn subscriber_count(&self, id: Uuid) -> usize {
        let mut inner = self.inner.lock().await;
        match inner.subscribers.get_mut(&id) {
            Some(senders) => {
                senders.retain(|tx| !tx.is_closed());
                senders.len()
            }
            None => 0,
        }
    }

    /// Notes belonging to `owner`, soft-deleted ones included.
    pub async fn notes_of(&self, owner: &str) -> Vec<NoteSnapshot> {
        self.inner
            .lock()
            .await
            .notes
            .values()
            .filter(|n| n.owner_id == owner)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn subscribe(&self, id: Uuid) -> Result<mpsc::UnboundedReceiver<StoreEvent>> {
        let mut inner = self.inner.lock().await;
        if inner.revoked.contains(&id) {
            return Err(Error::Forbidden(format!("no access to note {}", id)));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let initial = match inner.notes.get(&id) {
            Some(note) => StoreEvent::Snapshot(note.clone()),
            None => StoreEvent::Missing,
        };
        // The receiver is still in hand, so this send cannot fail.
        let _ = tx.send(initial);
        inner.subscribers.entry(id).or_default().push(tx);
        debug!(subsystem = "sync", component = "memory_store", note_id = %id, "Subscribed");
        Ok(rx)
    }

    async fn write(&self, id: Uuid, patch: NotePatch) -> Result<()> {
        let delay = self.inner.lock().await.write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().await;
        if inner.revoked.contains(&id) {
            return Err(Error::Forbidden(format!("no access to note {}", id)));
        }
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(Error::Store("write rejected".to_string()));
        }
        let note = inner.notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;

        let was_deleted = note.deleted;
        patch.apply_to(note);
        let now = Utc::now();
        note.updated_at = now;
        if note.deleted && !was_deleted {
            note.deleted_at = Some(now);
        } else if !note.deleted {
            note.deleted_at = None;
        }
        let snapshot = note.clone();

        inner.write_log.push((id, patch));
        inner.notify(id, StoreEvent::Snapshot(snapshot));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.notes.remove(&id).is_none() {
            return Err(Error::NoteNotFound(id));
        }
        inner.notify(id, StoreEvent::Missing);
        info!(subsystem = "sync", component = "memory_store", note_id = %id, "Note deleted");
        Ok(())
    }

    async fn create_note(&self, owner: &str) -> Result<NoteSnapshot> {
        let doc = Document::empty();
        let now = Utc::now();
        let note = NoteSnapshot {
            id: Uuid::now_v7(),
            owner_id: owner.to_string(),
            title: UNTITLED_NOTE_TITLE.to_string(),
            content: doc.to_json(),
            plain_text: doc.plain_text(),
            labels: Vec::new(),
            pinned: false,
            deleted: false,
            deleted_at: None,
            updated_at: now,
        };
        self.inner.lock().await.notes.insert(note.id, note.clone());
        info!(
            subsystem = "sync",
            component = "memory_store",
            note_id = %note.id,
            owner_id = owner,
            "Note created"
        );
        Ok(note)
    }

    async fn latest_note(&self, owner: &str) -> Result<Option<NoteSnapshot>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notes
            .values()
            .filter(|n| n.owner_id == owner && !n.deleted && !inner.revoked.contains(&n.id))
            .max_by_key(|n| n.updated_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_delivers_current_state_first() {
        let store = InMemoryStore::new();
        let note = store.create_note("ada").await.unwrap();

        let mut rx = store.subscribe(note.id).await.unwrap();
        assert_eq!(rx.recv().await, Some(StoreEvent::Snapshot(note)));

        let mut missing = store.subscribe(Uuid::now_v7()).await.unwrap();
        assert_eq!(missing.recv().await, Some(StoreEvent::Missing));
    }

    #[tokio::test]
    async fn test_write_echoes_to_subscribers() {
        let store = InMemoryStore::new();
        let note = store.create_note("ada").await.unwrap();
        let mut rx = store.subscribe(note.id).await.unwrap();
        rx.recv().await.unwrap();

        store.write(note.id, NotePatch::title("Plans")).await.unwrap();
        match rx.recv().await {
            Some(StoreEvent::Snapshot(snapshot)) => {
                assert_eq!(snapshot.title, "Plans");
                assert!(snapshot.updated_at >= note.updated_at);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert_eq!(store.writes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_note_unchanged() {
        let store = InMemoryStore::new();
        let note = store.create_note("ada").await.unwrap();
        store.fail_next_writes(1).await;

        let err = store.write(note.id, NotePatch::title("x")).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.get(note.id).await.unwrap().title, UNTITLED_NOTE_TITLE);

        store.write(note.id, NotePatch::title("x")).await.unwrap();
        assert_eq!(store.get(note.id).await.unwrap().title, "x");
    }

    #[tokio::test]
    async fn test_soft_delete_sets_timestamp_and_hides_from_latest() {
        let store = InMemoryStore::new();
        let note = store.create_note("ada").await.unwrap();
        let patch = NotePatch {
            deleted: Some(true),
            ..Default::default()
        };
        store.write(note.id, patch).await.unwrap();

        let stored = store.get(note.id).await.unwrap();
        assert!(stored.deleted);
        assert!(stored.deleted_at.is_some());
        assert_eq!(store.latest_note("ada").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revoke_and_delete_notify_subscribers() {
        let store = InMemoryStore::new();
        let a = store.create_note("ada").await.unwrap();
        let b = store.create_note("ada").await.unwrap();
        let mut rx_a = store.subscribe(a.id).await.unwrap();
        let mut rx_b = store.subscribe(b.id).await.unwrap();
        rx_a.recv().await.unwrap();
        rx_b.recv().await.unwrap();

        store.revoke(a.id).await;
        assert_eq!(rx_a.recv().await, Some(StoreEvent::Revoked));
        assert_eq!(rx_a.recv().await, None);
        assert!(matches!(
            store.subscribe(a.id).await,
            Err(Error::Forbidden(_))
        ));

        store.delete(b.id).await.unwrap();
        assert_eq!(rx_b.recv().await, Some(StoreEvent::Missing));
        assert!(matches!(
            store.write(b.id, NotePatch::title("x")).await,
            Err(Error::NoteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dropping_receiver_unsubscribes() {
        let store = InMemoryStore::new();
        let note = store.create_note("ada").await.unwrap();
        let rx = store.subscribe(note.id).await.unwrap();
        assert_eq!(store.subscriber_count(note.id).await, 1);
        drop(rx);
        assert_eq!(store.subscriber_count(note.id).await, 0);
    }
}
