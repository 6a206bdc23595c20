//! Fallback note selection for a note that went missing.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use quire_core::Result;

use crate::coalesce::RequestCoalescer;
use crate::store::DocumentStore;

/// Finds the note a user should land on when the open note is gone: their
/// most recently updated note, or a new empty one when they have none.
///
/// Clones share the coalescing table, so sessions of the same user racing
/// to recover create at most one note.
pub struct RecoveryFlow<S> {
    store: Arc<S>,
    coalescer: RequestCoalescer<String, Result<Uuid>>,
}

impl<S> Clone for RecoveryFlow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coalescer: self.coalescer.clone(),
        }
    }
}

impl<S: DocumentStore> RecoveryFlow<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            coalescer: RequestCoalescer::new(),
        }
    }

    /// Id of the note `owner` should be redirected to.
    pub async fn ensure_note(&self, owner: &str) -> Result<Uuid> {
        let store = Arc::clone(&self.store);
        let owner_id = owner.to_string();
        self.coalescer
            .run(owner.to_string(), move || async move {
                if let Some(note) = store.latest_note(&owner_id).await? {
                    info!(
                        subsystem = "sync",
                        component = "recovery",
                        owner_id = %owner_id,
                        note_id = %note.id,
                        "Redirecting to latest note"
                    );
                    return Ok(note.id);
                }
                let note = store.create_note(&owner_id).await?;
                info!(
                    subsystem = "sync",
                    component = "recovery",
                    owner_id = %owner_id,
                    note_id = %note.id,
                    "Created fallback note"
                );
                Ok(note.id)
            })
            .await
    }

    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }
}
