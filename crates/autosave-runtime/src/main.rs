//! autosave-demo: Scripted editing session against the in-memory store.
//!
//! Simulates a user typing a caption in bursts, a save round-tripping,
//! and a collaborator's change arriving, with the reconciliation
//! decisions visible in the logs.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autosave_core::{
    AutosaveConfig, Draft, DraftPatch, DraftStatus, EditSession, EventBus, InMemoryStore,
    RemoteCopy,
};
use autosave_runtime::spawn_session;

#[derive(Parser, Debug)]
#[command(name = "autosave-demo")]
#[command(about = "Optimistic draft editing demo")]
struct Args {
    /// Debounce quiet period in milliseconds
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AutosaveConfig {
        debounce_ms: args.debounce_ms,
        ..AutosaveConfig::default()
    };

    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let _sub = bus.subscribe(|event| {
        info!(event = ?event, "editor event");
    });

    let mut session = EditSession::open(Draft::new(), config);
    session.attach_events(Arc::clone(&bus));
    let handle = spawn_session(session, Arc::clone(&store));

    // Typing burst: coalesces into a single create.
    handle.edit(DraftPatch::caption("Launch day"));
    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.edit(DraftPatch::caption("Launch day!"));
    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.edit(DraftPatch::caption("Launch day! 🚀"));

    tokio::time::sleep(Duration::from_millis(args.debounce_ms + 200)).await;
    let draft = handle.snapshot().await.expect("driver alive");
    info!(id = ?draft.id, saves = store.save_count(), "created after one coalesced save");

    // A collaborator schedules the post while we're idle.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let mut theirs = draft.clone();
    theirs.caption = "Launch day! 🚀 (copy review done)".into();
    theirs.status = DraftStatus::Scheduled;
    handle.remote(RemoteCopy::by(theirs, "jordan"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let draft = handle.snapshot().await.expect("driver alive");
    let status = handle.status().await.expect("driver alive");
    info!(
        caption = %draft.caption,
        status = ?draft.status,
        label = ?status.label(autosave_core::time::now_ms()),
        "after remote update"
    );

    handle.close().await;
    Ok(())
}
