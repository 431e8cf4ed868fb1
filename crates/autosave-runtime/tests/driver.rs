//! End-to-end driver tests under paused tokio time.
//!
//! These exercise the real timer path: typing bursts coalescing through
//! the debounce window, creation round trips, remote-copy handling, and
//! shutdown with a save still in flight.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use autosave_core::client::{Result as SaveResult, SaveClient};
use autosave_core::{
    AutosaveConfig, Draft, DraftPatch, DraftStatus, EditSession, EntityId, InMemoryStore,
    RemoteCopy, SaveError,
};
use autosave_runtime::spawn_session;

fn existing_draft(caption: &str) -> Draft {
    Draft {
        id: Some(EntityId("post-1".into())),
        caption: caption.into(),
        status: DraftStatus::Draft,
        scheduled_at: None,
        attachments: Vec::new(),
    }
}

fn open(seed: Draft) -> EditSession<Draft> {
    EditSession::open(seed, AutosaveConfig::default())
}

/// Store that takes a while to answer, for in-flight scenarios.
struct SlowStore {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl SaveClient<Draft> for SlowStore {
    async fn save(&self, entity: &Draft) -> SaveResult<Draft> {
        sleep(self.delay).await;
        self.inner.save(entity).await
    }
}

#[tokio::test(start_paused = true)]
async fn typing_burst_coalesces_into_one_save() {
    let store = Arc::new(InMemoryStore::new());
    let handle = spawn_session(open(existing_draft("A")), Arc::clone(&store));

    handle.edit(DraftPatch::caption("AB"));
    sleep(Duration::from_millis(100)).await;
    handle.edit(DraftPatch::caption("ABC"));
    sleep(Duration::from_millis(100)).await;
    handle.edit(DraftPatch::caption("ABCD"));

    sleep(Duration::from_millis(1_000)).await;

    assert_eq!(store.save_count(), 1);
    assert_eq!(store.history()[0].caption, "ABCD");

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn creation_assigns_id_through_the_driver() {
    let store = Arc::new(InMemoryStore::new());
    let handle = spawn_session(open(Draft::new()), Arc::clone(&store));

    handle.edit(DraftPatch::caption("first post"));
    sleep(Duration::from_millis(800)).await;

    let draft = handle.snapshot().await.expect("driver alive");
    assert!(draft.id.is_some(), "server-assigned id adopted");
    assert_eq!(store.save_count(), 1);

    let status = handle.status().await.expect("driver alive");
    assert!(!status.is_saving);
    assert!(status.last_saved_at_ms.is_some());

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn remote_update_applies_when_session_is_quiet() {
    let store = Arc::new(InMemoryStore::new());
    let handle = spawn_session(open(existing_draft("ours")), Arc::clone(&store));

    // Long past the grace window with no local activity.
    sleep(Duration::from_millis(3_000)).await;

    let mut theirs = existing_draft("theirs");
    theirs.status = DraftStatus::Scheduled;
    handle.remote(RemoteCopy::by(theirs, "jordan"));
    sleep(Duration::from_millis(50)).await;

    let draft = handle.snapshot().await.expect("driver alive");
    assert_eq!(draft.caption, "theirs");
    assert_eq!(draft.status, DraftStatus::Scheduled);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn remote_update_suppressed_while_typing() {
    let store = Arc::new(InMemoryStore::new());
    let handle = spawn_session(open(existing_draft("ours")), Arc::clone(&store));

    handle.edit(DraftPatch::caption("ours, edited"));
    sleep(Duration::from_millis(100)).await;

    handle.remote(RemoteCopy::by(existing_draft("theirs"), "jordan"));
    sleep(Duration::from_millis(50)).await;

    let draft = handle.snapshot().await.expect("driver alive");
    assert_eq!(draft.caption, "ours, edited", "local edits survive the race");

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn failed_save_recovers_via_flush() {
    let store = Arc::new(InMemoryStore::new());
    store.fail_next(SaveError::Network("connection reset".into()));
    let handle = spawn_session(open(existing_draft("A")), Arc::clone(&store));

    handle.edit(DraftPatch::caption("AB"));
    sleep(Duration::from_millis(800)).await;

    // First attempt failed; nothing saved, no retry scheduled.
    assert_eq!(store.save_count(), 0);
    let status = handle.status().await.expect("driver alive");
    assert!(status.last_saved_at_ms.is_none());

    handle.flush();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(store.save_count(), 1);
    assert_eq!(store.history()[0].caption, "AB");

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn edits_during_in_flight_save_schedule_a_follow_up() {
    let store = Arc::new(InMemoryStore::new());
    let slow = Arc::new(SlowStore {
        inner: Arc::clone(&store),
        delay: Duration::from_millis(300),
    });
    let handle = spawn_session(open(existing_draft("A")), slow);

    handle.edit(DraftPatch::caption("AB"));
    // Past the debounce window: the save is now in flight.
    sleep(Duration::from_millis(600)).await;
    handle.edit(DraftPatch::caption("ABC"));

    sleep(Duration::from_millis(1_500)).await;

    let history = store.history();
    assert_eq!(history.len(), 2, "follow-up save after the flight resolves");
    assert_eq!(history[0].caption, "AB");
    assert_eq!(history[1].caption, "ABC");

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn close_discards_an_in_flight_result() {
    let store = Arc::new(InMemoryStore::new());
    let slow = Arc::new(SlowStore {
        inner: Arc::clone(&store),
        delay: Duration::from_millis(500),
    });
    let handle = spawn_session(open(existing_draft("A")), slow);

    handle.edit(DraftPatch::caption("AB"));
    // Save issued at 500ms, still sleeping in the store.
    sleep(Duration::from_millis(600)).await;

    handle.close().await;

    // The save may still complete server-side, but the session is gone.
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(store.save_count(), 1);
}
