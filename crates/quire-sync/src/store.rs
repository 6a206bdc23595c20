//! Document store interface.
//!
//! The store owns persisted notes. Clients subscribe to a note and receive
//! every committed state as a [`StoreEvent`], including the echo of their
//! own writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use uuid::Uuid;

use quire_core::labels::labels_from_document;
use quire_core::{Document, Result};

/// A committed note state as delivered by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSnapshot {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    /// Structured content as a JSON document tree.
    pub content: JsonValue,
    /// Plain-text mirror of `content` for search previews.
    pub plain_text: String,
    pub labels: Vec<String>,
    pub pinned: bool,
    /// Soft-delete flag.
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Assigned by the store on every write.
    pub updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl NotePatch {
    /// Content save payload: the JSON tree, its plain-text mirror and the
    /// normalized tag chip labels.
    pub fn content(doc: &Document) -> Self {
        Self {
            content: Some(doc.to_json()),
            plain_text: Some(doc.plain_text()),
            labels: Some(labels_from_document(doc)),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the set fields to `note`. Timestamps are left to the store.
    pub fn apply_to(&self, note: &mut NoteSnapshot) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(plain_text) = &self.plain_text {
            note.plain_text = plain_text.clone();
        }
        if let Some(labels) = &self.labels {
            note.labels = labels.clone();
        }
        if let Some(pinned) = self.pinned {
            note.pinned = pinned;
        }
        if let Some(deleted) = self.deleted {
            note.deleted = deleted;
        }
    }
}

/// Message delivered on a note subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Current committed state.
    Snapshot(NoteSnapshot),
    /// The note does not exist.
    Missing,
    /// The subscriber lost access to the note.
    Revoked,
    /// The subscription failed for another reason.
    Failed(String),
}

/// Remote persistence for notes.
///
/// A subscription stays active while its receiver is alive; dropping the
/// receiver unsubscribes.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Subscribe to a note. The current state is delivered first.
    async fn subscribe(&self, id: Uuid) -> Result<mpsc::UnboundedReceiver<StoreEvent>>;

    /// Apply a partial update.
    async fn write(&self, id: Uuid, patch: NotePatch) -> Result<()>;

    /// Remove a note permanently.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Create an empty note for `owner`.
    async fn create_note(&self, owner: &str) -> Result<NoteSnapshot>;

    /// Most recently updated note of `owner` that is not soft-deleted.
    async fn latest_note(&self, owner: &str) -> Result<Option<NoteSnapshot>>;
}
