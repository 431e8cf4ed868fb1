//! autosave-core: Reconciliation core for optimistic draft editing.
//!
//! This crate provides the core functionality for:
//! - An edit buffer holding the in-progress copy of an editable entity
//! - A debounced persistence scheduler that coalesces rapid edits into
//!   single save calls and tracks in-flight/last-saved state
//! - A remote update detector that classifies incoming authoritative
//!   copies as echoes, noise, or genuine external changes
//! - `Editable` and `SaveClient` trait abstractions for the entity model
//!   and the persistence backend
//!
//! The core is deterministic: time enters as explicit `now_ms` arguments
//! and the only suspending operation (the save call) happens outside,
//! driven by whoever owns the session (see the `autosave-runtime` crate).

pub mod buffer;
pub mod client;
pub mod config;
pub mod entity;
pub mod events;
pub mod fingerprint;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod time;

pub use buffer::EditBuffer;
pub use client::{InMemoryStore, SaveClient, SaveError};
pub use config::AutosaveConfig;
pub use entity::{Attachment, Draft, DraftPatch, DraftStatus, Editable, EntityId};
pub use events::{EditorEvent, EventBus, Subscription};
pub use fingerprint::Fingerprint;
pub use remote::{RemoteCopy, RemoteNotice, RemoteOutcome};
pub use scheduler::{SaveScheduler, SaveState, SaveStatus};
pub use session::{EditSession, PendingSave};
