//! Debounced persistence scheduler.
//!
//! Watches buffer fingerprints, waits for a quiet period, and decides
//! when a save should be issued. Coalesces rapid successive edits into a
//! single call, enforces strictly one in-flight save per session, and
//! keeps the marks (`last_synced`, `last_saved`, edit/save timestamps)
//! the remote update detector classifies against.
//!
//! The scheduler never reads the clock and never arms a real timer:
//! callers pass `now_ms` into every operation and arm their own timer
//! from [`SaveScheduler::next_deadline_ms`]. State transitions are
//! explicit calls from the input-handling and network-response paths.

use tracing::debug;

use crate::fingerprint::Fingerprint;
use crate::remote::RemoteOutcome;

/// Where the save machinery currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing scheduled or outstanding.
    Idle,
    /// A debounce timer is armed.
    Pending {
        /// When the timer fires, in ms since epoch.
        deadline_ms: u64,
        /// Fingerprint the timer was armed for. A mutation landing on
        /// the same print leaves the existing timer alone.
        armed: Fingerprint,
    },
    /// A save is in flight. No second save starts until it resolves.
    Saving {
        /// Buffer fingerprint snapshotted when the save was issued.
        started: Fingerprint,
        /// Whether this save is the first create (entity had no id).
        creating: bool,
    },
}

/// Save status exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveStatus {
    pub is_saving: bool,
    pub last_saved_at_ms: Option<u64>,
}

impl SaveStatus {
    /// Human-readable elapsed-time label, computed at call time.
    pub fn label(&self, now_ms: u64) -> Option<String> {
        let at = self.last_saved_at_ms?;
        let elapsed = now_ms.saturating_sub(at);
        Some(if elapsed < 3_000 {
            "Saved just now".to_string()
        } else if elapsed < 60_000 {
            format!("Saved {}s ago", elapsed / 1_000)
        } else if elapsed < 3_600_000 {
            format!("Saved {}m ago", elapsed / 60_000)
        } else {
            format!("Saved {}h ago", elapsed / 3_600_000)
        })
    }
}

/// Per-session scheduler state.
#[derive(Debug)]
pub struct SaveScheduler {
    state: SaveState,
    /// Fingerprint of the buffer the last time it matched the
    /// authoritative source. Moves only on wholesale replacement or
    /// reconciliation, never on keystrokes.
    last_synced: Fingerprint,
    /// Fingerprint most recently confirmed saved; cleared once its echo
    /// reconciles through the detector.
    last_saved: Option<Fingerprint>,
    /// Wall-clock time of the most recent local mutation or successful
    /// save, once there has been one. Drives the grace window; an
    /// untouched session never suppresses.
    last_local_edit_ms: Option<u64>,
    last_saved_at_ms: Option<u64>,
    /// Whether a local mutation landed while a save was outstanding.
    /// Decides at resolution time if a follow-up cycle is owed; a
    /// wholesale remote overwrite clears it.
    dirty_during_flight: bool,
    debounce_ms: u64,
}

impl SaveScheduler {
    /// Scheduler for a freshly seeded buffer. The seed is treated as
    /// both synced and saved: nothing is persisted until it changes.
    pub fn new(seed: Fingerprint, debounce_ms: u64) -> Self {
        Self {
            state: SaveState::Idle,
            last_synced: seed,
            last_saved: Some(seed),
            last_local_edit_ms: None,
            last_saved_at_ms: None,
            dirty_during_flight: false,
            debounce_ms,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, SaveState::Saving { .. })
    }

    /// The in-flight save's snapshot fingerprint and creating flag.
    pub fn in_flight(&self) -> Option<(Fingerprint, bool)> {
        match self.state {
            SaveState::Saving { started, creating } => Some((started, creating)),
            _ => None,
        }
    }

    pub fn last_synced(&self) -> Fingerprint {
        self.last_synced
    }

    pub fn last_saved(&self) -> Option<Fingerprint> {
        self.last_saved
    }

    /// Deadline the caller should arm a timer for, if any.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        match self.state {
            SaveState::Pending { deadline_ms, .. } => Some(deadline_ms),
            _ => None,
        }
    }

    pub fn status(&self) -> SaveStatus {
        SaveStatus {
            is_saving: self.is_saving(),
            last_saved_at_ms: self.last_saved_at_ms,
        }
    }

    /// Whether `fp` would be a redundant save right now.
    fn already_persisted(&self, fp: Fingerprint) -> bool {
        match self.last_saved {
            // A save for the last-saved content is never issued.
            Some(saved) => fp == saved,
            // With the last save reconciled, the synced copy is what the
            // server holds.
            None => fp == self.last_synced,
        }
    }

    /// A local mutation produced this buffer fingerprint.
    pub fn note_edit(&mut self, fp: Fingerprint, now_ms: u64) {
        self.last_local_edit_ms = Some(now_ms);

        match self.state {
            SaveState::Idle => {
                if self.already_persisted(fp) {
                    return;
                }
                self.arm(fp, now_ms);
            }
            SaveState::Pending { armed, .. } => {
                if self.already_persisted(fp) {
                    // Edited back to persisted content; nothing left to save.
                    debug!("edit reverted to persisted content, cancelling timer");
                    self.state = SaveState::Idle;
                    return;
                }
                if fp == armed {
                    // The armed timer already covers this content.
                    return;
                }
                self.arm(fp, now_ms);
            }
            SaveState::Saving { .. } => {
                // Accepted into the buffer; whether a follow-up cycle is
                // needed is decided when the in-flight save resolves.
                self.dirty_during_flight = true;
            }
        }
    }

    fn arm(&mut self, fp: Fingerprint, now_ms: u64) {
        let deadline_ms = now_ms + self.debounce_ms;
        debug!(deadline_ms, "debounce timer armed");
        self.state = SaveState::Pending {
            deadline_ms,
            armed: fp,
        };
    }

    /// Collapse a pending deadline to fire immediately, or arm one if
    /// the buffer holds unsaved content. Manual-retry affordance; a
    /// no-op while a save is in flight.
    pub fn flush(&mut self, fp: Fingerprint, now_ms: u64) {
        match self.state {
            SaveState::Idle => {
                if !self.already_persisted(fp) {
                    self.state = SaveState::Pending {
                        deadline_ms: now_ms,
                        armed: fp,
                    };
                }
            }
            SaveState::Pending { armed, .. } => {
                self.state = SaveState::Pending {
                    deadline_ms: now_ms,
                    armed,
                };
            }
            SaveState::Saving { .. } => {}
        }
    }

    /// Timer fire. Snapshots the buffer's *current* fingerprint and
    /// enters `Saving` if a save should be issued; returns whether it
    /// was. Refuses while a save is already outstanding, and before the
    /// deadline.
    pub fn take_due(&mut self, fp_now: Fingerprint, creating: bool, now_ms: u64) -> bool {
        match self.state {
            SaveState::Pending { deadline_ms, .. } if now_ms >= deadline_ms => {
                if self.already_persisted(fp_now) {
                    self.state = SaveState::Idle;
                    return false;
                }
                debug!(creating, "issuing save");
                self.dirty_during_flight = false;
                self.state = SaveState::Saving {
                    started: fp_now,
                    creating,
                };
                true
            }
            _ => false,
        }
    }

    /// The in-flight save confirmed. `fp_now` is the buffer's current
    /// fingerprint, which may have moved during the flight — if it did,
    /// a follow-up debounce cycle is armed (unless the buffer was
    /// meanwhile overwritten by an applied remote copy).
    pub fn save_succeeded(&mut self, fp_now: Fingerprint, now_ms: u64) {
        let SaveState::Saving { started, .. } = self.state else {
            debug!("save result for a session no longer saving, ignoring");
            return;
        };

        self.last_saved = Some(started);
        self.last_saved_at_ms = Some(now_ms);
        self.last_local_edit_ms = Some(now_ms);

        if self.dirty_during_flight && fp_now != started {
            debug!("buffer edited during save, scheduling follow-up");
            self.arm(fp_now, now_ms);
        } else {
            self.state = SaveState::Idle;
        }
        self.dirty_during_flight = false;
    }

    /// The in-flight save failed. Transient: `last_saved` and the saved
    /// timestamp are untouched, no retry timer is armed — the next edit
    /// (or an explicit flush) is the recovery path.
    pub fn save_failed(&mut self, _now_ms: u64) {
        if matches!(self.state, SaveState::Saving { .. }) {
            self.state = SaveState::Idle;
        }
        self.dirty_during_flight = false;
    }

    /// Classify an incoming authoritative copy against the marks.
    ///
    /// Updates `last_synced`/`last_saved` per the outcome; the caller
    /// overwrites the buffer only on [`RemoteOutcome::Applied`].
    pub fn classify_remote(
        &mut self,
        incoming: Fingerprint,
        grace_window_ms: u64,
        now_ms: u64,
    ) -> RemoteOutcome {
        if incoming == self.last_synced {
            return RemoteOutcome::Unchanged;
        }

        if self.last_saved == Some(incoming) {
            // Our own save completing its round trip.
            self.last_synced = incoming;
            self.last_saved = None;
            return RemoteOutcome::SelfEcho;
        }

        let recently_active = self
            .last_local_edit_ms
            .is_some_and(|at| now_ms.saturating_sub(at) < grace_window_ms);
        if recently_active {
            // Race with our own recent activity; track it without
            // overwriting the buffer.
            debug!("remote copy inside grace window, suppressed");
            self.last_synced = incoming;
            return RemoteOutcome::Suppressed;
        }

        self.last_synced = incoming;
        if matches!(self.state, SaveState::Pending { .. }) {
            // The pending local content is about to be overwritten.
            self.state = SaveState::Idle;
        }
        // The overwrite replaces whatever moved during a flight, so no
        // follow-up save is owed for it.
        self.dirty_during_flight = false;
        RemoteOutcome::Applied
    }
}
