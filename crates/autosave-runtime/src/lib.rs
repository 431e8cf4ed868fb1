//! autosave-runtime: tokio driver for editing sessions.
//!
//! Owns an `EditSession` on a task, arms real timers from the core's
//! reported deadline, performs saves through a `SaveClient`, and exposes
//! a channel-backed handle for the surrounding application.

pub mod driver;

pub use driver::{spawn_session, SessionCommand, SessionHandle};
