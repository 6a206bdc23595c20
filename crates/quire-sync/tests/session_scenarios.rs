//! Reconciliation scenarios driven through a session against the
//! in-memory store. Time is paused so debounce windows elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use quire_core::{Document, Node, Selection};
use quire_editor::Editor;
use quire_sync::{
    DocumentStore, InMemoryStore, NotePatch, NoteSession, SaveField, SessionEvent, SyncConfig,
    SyncStatus,
};
use uuid::Uuid;

fn doc(text: &str) -> Document {
    if text.is_empty() {
        return Document::empty();
    }
    Document::new(vec![Node::paragraph(vec![Node::text(text)])])
}

async fn seed(store: &InMemoryStore, text: &str) -> Uuid {
    let mut note = store.create_note("ada").await.unwrap();
    let content = doc(text);
    note.content = content.to_json();
    note.plain_text = content.plain_text();
    store.insert(note.clone()).await;
    note.id
}

fn session(store: &Arc<InMemoryStore>) -> NoteSession<InMemoryStore> {
    NoteSession::new(
        Arc::clone(store),
        "ada",
        Editor::default(),
        &SyncConfig::default(),
    )
}

async fn opened(text: &str) -> (Arc<InMemoryStore>, Uuid, NoteSession<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let id = seed(&store, text).await;
    let mut session = session(&store);
    session.open(id).await.unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);
    (store, id, session)
}

fn type_at_start(session: &mut NoteSession<InMemoryStore>, text: &str) {
    let editor = session.editor_mut();
    editor.set_selection(Selection::cursor(1));
    editor.insert_text(text).unwrap();
}

#[tokio::test(start_paused = true)]
async fn edit_is_saved_after_quiet_period_and_echo_ignored() {
    let (store, id, mut session) = opened("hello").await;
    assert_eq!(session.editor().document().plain_text(), "hello");
    assert_eq!(session.status(), SyncStatus::Synced);

    type_at_start(&mut session, "Hi ");
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::LocalChange {
            field: SaveField::Content,
            version: 1
        }
    );
    assert_eq!(session.status(), SyncStatus::Syncing);
    assert!(store.writes().await.is_empty());

    let started = tokio::time::Instant::now();
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::SavesDispatched {
            fields: vec![SaveField::Content]
        }
    );
    assert!(started.elapsed() >= Duration::from_millis(800));

    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::SaveCompleted {
            field: SaveField::Content,
            version: 1,
            status: SyncStatus::Synced
        }
    );
    assert_eq!(session.tick().await.unwrap(), SessionEvent::EchoIgnored);
    assert_eq!(store.get(id).await.unwrap().plain_text, "Hi hello");
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_is_written_once() {
    let (store, _, mut session) = opened("").await;
    for word in ["a", "b", "c"] {
        session.editor_mut().insert_text(word).unwrap();
    }
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::LocalChange {
            field: SaveField::Content,
            version: 3
        }
    );
    session.tick().await.unwrap();
    session.tick().await.unwrap();

    let writes = store.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1.plain_text.as_deref(), Some("abc"));
    assert_eq!(session.versions().saved_version(), 3);
}

#[tokio::test(start_paused = true)]
async fn remote_snapshot_waits_for_pending_local_edit() {
    let (store, id, mut session) = opened("draft").await;
    type_at_start(&mut session, "my ");
    session.tick().await.unwrap();

    store
        .write(id, NotePatch::content(&doc("from elsewhere")))
        .await
        .unwrap();
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::RemoteDeferred {
            change_version: 1,
            saved_version: 0
        }
    );
    assert_eq!(session.editor().document().plain_text(), "my draft");

    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SavesDispatched { .. }
    ));
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SaveCompleted {
            status: SyncStatus::Synced,
            ..
        }
    ));
    assert_eq!(session.tick().await.unwrap(), SessionEvent::EchoIgnored);
    assert_eq!(store.get(id).await.unwrap().plain_text, "my draft");

    store
        .write(id, NotePatch::content(&doc("later remote")))
        .await
        .unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::RemoteApplied);
    assert_eq!(session.editor().document().plain_text(), "later remote");
}

#[tokio::test(start_paused = true)]
async fn focused_cursor_survives_remote_apply() {
    let (store, id, mut session) = opened("hello world").await;
    session.editor_mut().focus();
    session.editor_mut().set_selection(Selection::cursor(7));

    store
        .write(id, NotePatch::content(&doc("hello brave new world")))
        .await
        .unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::RemoteApplied);
    assert_eq!(session.editor().selection(), Selection::cursor(7));

    store.write(id, NotePatch::content(&doc("hi"))).await.unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::RemoteApplied);
    assert_eq!(session.editor().selection(), Selection::cursor(3));
    assert_eq!(session.versions().change_version(), 0);
}

#[tokio::test(start_paused = true)]
async fn switching_notes_cancels_pending_save() {
    let store = Arc::new(InMemoryStore::new());
    let a = seed(&store, "note a").await;
    let b = seed(&store, "note b").await;
    let mut session = session(&store);

    session.open(a).await.unwrap();
    session.tick().await.unwrap();
    type_at_start(&mut session, "edited ");
    session.tick().await.unwrap();
    assert_eq!(session.status(), SyncStatus::Syncing);

    session.open(b).await.unwrap();
    assert_eq!(session.status(), SyncStatus::Loading);
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);
    assert_eq!(session.editor().document().plain_text(), "note b");

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(store.writes().await.is_empty());
    assert_eq!(store.get(a).await.unwrap().plain_text, "note a");
    assert_eq!(session.versions().change_version(), 0);
    assert_eq!(session.status(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn write_finishing_after_switch_is_ignored() {
    let store = Arc::new(InMemoryStore::new());
    let a = seed(&store, "note a").await;
    let b = seed(&store, "note b").await;
    store.set_write_delay(Some(Duration::from_millis(100))).await;
    let mut session = session(&store);

    session.open(a).await.unwrap();
    session.tick().await.unwrap();
    type_at_start(&mut session, "x");
    session.tick().await.unwrap();
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SavesDispatched { .. }
    ));

    session.open(b).await.unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::StaleCompletion {
            field: SaveField::Content,
            version: 1
        }
    );
    assert_eq!(session.versions().saved_version(), 0);
    assert_eq!(store.get(a).await.unwrap().plain_text, "xnote a");
    assert_eq!(store.get(b).await.unwrap().plain_text, "note b");
}

#[tokio::test(start_paused = true)]
async fn failed_write_reports_error_until_next_save() {
    let (store, id, mut session) = opened("text").await;
    let mut status = session.sync_status();
    store.fail_next_writes(1).await;

    type_at_start(&mut session, "1");
    session.tick().await.unwrap();
    session.tick().await.unwrap();
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SaveFailed { version: 1, .. }
    ));
    assert_eq!(*status.borrow_and_update(), SyncStatus::Error);
    assert_eq!(session.versions().saved_version(), 0);

    type_at_start(&mut session, "2");
    session.tick().await.unwrap();
    assert_eq!(*status.borrow_and_update(), SyncStatus::Syncing);
    session.tick().await.unwrap();
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SaveCompleted {
            version: 2,
            status: SyncStatus::Synced,
            ..
        }
    ));
    assert_eq!(*status.borrow_and_update(), SyncStatus::Synced);
    assert_eq!(store.get(id).await.unwrap().plain_text, "21text");
}

#[tokio::test(start_paused = true)]
async fn title_and_content_share_the_version_counter() {
    let (store, id, mut session) = opened("body").await;
    assert_eq!(session.set_title("Plan"), Some(1));
    type_at_start(&mut session, "new ");
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::LocalChange {
            field: SaveField::Content,
            version: 2
        }
    );

    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::SavesDispatched {
            fields: vec![SaveField::Title]
        }
    );
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::SaveCompleted {
            field: SaveField::Title,
            version: 1,
            status: SyncStatus::Syncing
        }
    );
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::RemoteDeferred { .. }
    ));
    assert_eq!(session.title(), Some("Plan"));

    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::SavesDispatched {
            fields: vec![SaveField::Content]
        }
    );
    assert_eq!(
        session.tick().await.unwrap(),
        SessionEvent::SaveCompleted {
            field: SaveField::Content,
            version: 2,
            status: SyncStatus::Synced
        }
    );
    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.title, "Plan");
    assert_eq!(stored.plain_text, "new body");
}

#[tokio::test(start_paused = true)]
async fn flush_writes_without_waiting() {
    let (store, id, mut session) = opened("body").await;
    type_at_start(&mut session, "now ");

    let events = session.flush().await;
    assert_eq!(
        events,
        vec![SessionEvent::SaveCompleted {
            field: SaveField::Content,
            version: 1,
            status: SyncStatus::Synced
        }]
    );
    assert_eq!(store.get(id).await.unwrap().plain_text, "now body");
    assert_eq!(session.writes_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn opening_a_missing_note_redirects_to_a_new_one() {
    let store = Arc::new(InMemoryStore::new());
    let mut session = session(&store);
    let gone = Uuid::now_v7();

    session.open(gone).await.unwrap();
    let to = match session.tick().await.unwrap() {
        SessionEvent::Recovered { from, to } => {
            assert_eq!(from, Some(gone));
            to
        }
        other => panic!("expected recovery, got {:?}", other),
    };
    assert_eq!(session.note_id(), Some(to));
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);
    assert_eq!(store.notes_of("ada").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deleted_or_revoked_note_redirects_to_latest() {
    let store = Arc::new(InMemoryStore::new());
    let a = seed(&store, "a").await;
    let b = seed(&store, "b").await;
    let c = seed(&store, "c").await;
    let mut session = session(&store);

    session.open(a).await.unwrap();
    session.tick().await.unwrap();
    store.delete(a).await.unwrap();
    let recovered = session.tick().await.unwrap();
    let SessionEvent::Recovered { to, .. } = recovered else {
        panic!("expected recovery, got {:?}", recovered);
    };
    assert!(to == b || to == c);
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);

    store.revoke(to).await;
    let recovered = session.tick().await.unwrap();
    let SessionEvent::Recovered { from, to: next } = recovered else {
        panic!("expected recovery, got {:?}", recovered);
    };
    assert_eq!(from, Some(to));
    assert_ne!(next, to);
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);
}

#[tokio::test(start_paused = true)]
async fn status_observable_tracks_lifecycle() {
    let store = Arc::new(InMemoryStore::new());
    let id = seed(&store, "x").await;
    let mut session = session(&store);
    let mut status = session.sync_status();
    assert_eq!(*status.borrow(), SyncStatus::Loading);

    session.open(id).await.unwrap();
    session.tick().await.unwrap();
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn edit_before_hydration_does_not_overwrite_remote() {
    let store = Arc::new(InMemoryStore::new());
    let id = seed(&store, "remote body").await;
    let mut session = session(&store);
    session.open(id).await.unwrap();

    session.editor_mut().insert_text("x").unwrap();
    assert_eq!(session.set_title("early"), None);
    assert!(session.flush().await.is_empty());
    assert_eq!(session.tick().await.unwrap(), SessionEvent::Hydrated);

    assert_eq!(session.editor().document().plain_text(), "remote body");
    assert_eq!(session.versions().change_version(), 0);
    assert_eq!(session.status(), SyncStatus::Synced);
    assert!(session.flush().await.is_empty());
    assert!(store.writes().await.is_empty());
    assert_eq!(store.get(id).await.unwrap().plain_text, "remote body");
}

#[tokio::test(start_paused = true)]
async fn remote_change_back_to_our_old_text_is_applied() {
    let (store, id, mut session) = opened("base").await;
    type_at_start(&mut session, "mine ");
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::LocalChange { .. }
    ));
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SavesDispatched { .. }
    ));
    assert!(matches!(
        session.tick().await.unwrap(),
        SessionEvent::SaveCompleted { .. }
    ));
    assert_eq!(session.tick().await.unwrap(), SessionEvent::EchoIgnored);

    store
        .write(id, NotePatch::content(&doc("theirs")))
        .await
        .unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::RemoteApplied);
    assert_eq!(session.editor().document().plain_text(), "theirs");

    store
        .write(id, NotePatch::content(&doc("mine base")))
        .await
        .unwrap();
    assert_eq!(session.tick().await.unwrap(), SessionEvent::RemoteApplied);
    assert_eq!(session.editor().document().plain_text(), "mine base");
}
