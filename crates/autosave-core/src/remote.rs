//! Remote update detection types.
//!
//! Whenever a fresh authoritative copy of the entity arrives — refetch,
//! subscription push, or a collaborator's save — the session classifies
//! it against the scheduler's marks and only overwrites the buffer for
//! genuine external changes. The classification algorithm itself lives
//! on [`SaveScheduler::classify_remote`](crate::SaveScheduler::classify_remote).

use serde::Serialize;

/// An authoritative copy of the entity, however it arrived.
///
/// Poll responses and push updates are treated uniformly.
#[derive(Debug, Clone)]
pub struct RemoteCopy<E> {
    pub entity: E,
    /// Who made the change, when the source knows. Drives the
    /// "updated by <actor>" notice.
    pub author: Option<String>,
}

impl<E> RemoteCopy<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            author: None,
        }
    }

    pub fn by(entity: E, author: impl Into<String>) -> Self {
        Self {
            entity,
            author: Some(author.into()),
        }
    }
}

/// How an incoming authoritative copy was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Matches the last-synced copy; nothing happened.
    Unchanged,
    /// The session's own save completing its round trip. Absorbed
    /// silently; the buffer's in-progress edits are untouched.
    SelfEcho,
    /// Unknown fingerprint arriving inside the grace window after local
    /// activity; treated as noise and tracked without being applied.
    Suppressed,
    /// Genuine external change. The buffer was overwritten wholesale
    /// and a notice was posted.
    Applied,
}

/// Transient "updated by <actor>" notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNotice {
    /// Actor the change is attributed to, if known.
    pub author: Option<String>,
    /// When the notice was posted, in ms since epoch.
    pub shown_at_ms: u64,
}

impl RemoteNotice {
    /// Whether the notice is still within its display window.
    pub fn visible_at(&self, now_ms: u64, duration_ms: u64) -> bool {
        now_ms.saturating_sub(self.shown_at_ms) < duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_duration() {
        let notice = RemoteNotice {
            author: Some("jordan".into()),
            shown_at_ms: 2_500,
        };
        assert!(notice.visible_at(2_500, 3_000));
        assert!(notice.visible_at(5_400, 3_000));
        assert!(!notice.visible_at(5_500, 3_000));
    }
}
