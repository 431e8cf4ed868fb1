//! EditSession: one entity, one buffer, one scheduler.
//!
//! The session is the unit of ownership: it holds the edit buffer, the
//! save scheduler, and the remote-update classification for a single
//! entity being edited. Data flows:
//!
//! 1. A field change calls `apply_edit`, mutating the buffer and arming
//!    the debounce timer
//! 2. The owner arms a real timer from `next_deadline_ms` and calls
//!    `poll` when it fires; a returned `PendingSave` is handed to the
//!    persistence backend
//! 3. The backend's answer comes back through `complete_save` (first
//!    create adopts the server-assigned id here — the session's own
//!    creation echo, not a remote update)
//! 4. Authoritative copies from refetch or push go through
//!    `observe_remote`, which overwrites the buffer only for genuine
//!    external changes
//!
//! Everything is synchronous and single-owner; the only suspension point
//! (the save call itself) happens outside, between `poll` and
//! `complete_save`.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::buffer::EditBuffer;
use crate::client::SaveError;
use crate::config::AutosaveConfig;
use crate::entity::Editable;
use crate::events::{EditorEvent, EventBus};
use crate::fingerprint::Fingerprint;
use crate::remote::{RemoteCopy, RemoteNotice, RemoteOutcome};
use crate::scheduler::{SaveScheduler, SaveStatus};

/// A save the scheduler decided to issue.
///
/// Hand `entity` to the persistence backend and feed the outcome back
/// through [`EditSession::complete_save`].
#[derive(Debug, Clone)]
pub struct PendingSave<E> {
    /// Full buffer contents at the moment the timer fired.
    pub entity: E,
    /// Buffer fingerprint at save start.
    pub fingerprint: Fingerprint,
    /// Whether this is the entity's first create.
    pub creating: bool,
}

/// One active editing session over a single entity.
pub struct EditSession<E: Editable> {
    buffer: EditBuffer<E>,
    scheduler: SaveScheduler,
    config: AutosaveConfig,
    notice: Option<RemoteNotice>,
    events: Option<Arc<EventBus>>,
    closed: bool,
}

impl<E: Editable> EditSession<E> {
    /// Open a session seeded from the authoritative copy (or a
    /// brand-new entity). This is the "first authoritative copy" of the
    /// detection algorithm: accepted as normal load, never flagged.
    pub fn open(seed: E, config: AutosaveConfig) -> Self {
        let buffer = EditBuffer::new(seed);
        let scheduler = SaveScheduler::new(buffer.fingerprint(), config.debounce_ms);
        Self {
            buffer,
            scheduler,
            config,
            notice: None,
            events: None,
            closed: false,
        }
    }

    /// Attach an event bus. Events fan out synchronously to its
    /// subscribers; without a bus the session just doesn't emit.
    pub fn attach_events(&mut self, bus: Arc<EventBus>) {
        self.events = Some(bus);
    }

    fn emit(&self, event: EditorEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }

    fn entity_id_string(&self) -> Option<String> {
        self.buffer.entity().id().map(|id| id.as_str().to_string())
    }

    /// Current buffer contents.
    pub fn entity(&self) -> &E {
        self.buffer.entity()
    }

    /// Merge a local field change into the buffer and let the scheduler
    /// observe the resulting fingerprint.
    pub fn apply_edit(&mut self, patch: E::Patch, now_ms: u64) {
        if self.closed {
            debug!("edit on closed session, ignoring");
            return;
        }
        self.buffer.apply(patch);
        self.scheduler.note_edit(self.buffer.fingerprint(), now_ms);
    }

    /// Deadline the owner should arm a timer for, if any.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        if self.closed {
            return None;
        }
        self.scheduler.next_deadline_ms()
    }

    /// Timer fire. Returns the save to issue, if one is due. At most
    /// one save is outstanding at a time; while one is, this returns
    /// `None`.
    pub fn poll(&mut self, now_ms: u64) -> Option<PendingSave<E>> {
        if self.closed {
            return None;
        }
        let fingerprint = self.buffer.fingerprint();
        let creating = self.buffer.entity().id().is_none();
        if !self.scheduler.take_due(fingerprint, creating, now_ms) {
            return None;
        }
        self.emit(EditorEvent::SaveStarted {
            entity_id: self.entity_id_string(),
            timestamp: now_ms,
        });
        Some(PendingSave {
            entity: self.buffer.snapshot(),
            fingerprint,
            creating,
        })
    }

    /// Ask for an immediate save of any unsaved content (manual retry).
    /// The next `poll` issues it.
    pub fn flush(&mut self, now_ms: u64) {
        if self.closed {
            return;
        }
        self.scheduler.flush(self.buffer.fingerprint(), now_ms);
    }

    /// Feed back the persistence call's outcome.
    ///
    /// On a successful first create the server-assigned id is adopted
    /// into the buffer here — deliberately *before* any authoritative
    /// copy can echo it, so the creation round trip never reads as a
    /// remote update. On a closed session the result is discarded.
    pub fn complete_save(&mut self, result: Result<E, SaveError>, now_ms: u64) {
        if self.closed {
            debug!("save resolved after session close, discarding result");
            return;
        }

        match result {
            Ok(saved) => {
                let creating = self
                    .scheduler
                    .in_flight()
                    .map(|(_, creating)| creating)
                    .unwrap_or(false);
                if creating && self.buffer.entity().id().is_none() {
                    if let Some(id) = saved.id().cloned() {
                        self.buffer.entity_mut().assign_id(id.clone());
                        self.emit(EditorEvent::EntityCreated {
                            entity_id: id.as_str().to_string(),
                            timestamp: now_ms,
                        });
                    }
                }
                self.scheduler
                    .save_succeeded(self.buffer.fingerprint(), now_ms);
                self.emit(EditorEvent::SaveCompleted {
                    entity_id: self.entity_id_string(),
                    timestamp: now_ms,
                });
            }
            Err(err) => {
                // Transient: the buffer keeps the unsaved edits, the
                // saved indicator just doesn't move.
                warn!("save failed: {err}");
                self.emit(EditorEvent::save_failed(&err, now_ms));
                self.scheduler.save_failed(now_ms);
            }
        }
    }

    /// A fresh authoritative copy arrived (refetch, push, or a
    /// collaborator's save — all treated uniformly).
    pub fn observe_remote(&mut self, copy: RemoteCopy<E>, now_ms: u64) -> RemoteOutcome {
        if self.closed {
            debug!("remote copy for closed session, ignoring");
            return RemoteOutcome::Unchanged;
        }

        let incoming = copy.entity.fingerprint();
        let outcome =
            self.scheduler
                .classify_remote(incoming, self.config.grace_window_ms, now_ms);

        if outcome == RemoteOutcome::Applied {
            self.buffer.replace(copy.entity);
            self.notice = Some(RemoteNotice {
                author: copy.author.clone(),
                shown_at_ms: now_ms,
            });
            self.emit(EditorEvent::RemoteApplied {
                author: copy.author,
                timestamp: now_ms,
            });
        }

        outcome
    }

    /// Save-in-progress / last-saved status for the UI.
    pub fn status(&self) -> SaveStatus {
        self.scheduler.status()
    }

    /// The "updated by <actor>" notice, while it is still within its
    /// display window.
    pub fn notice(&self, now_ms: u64) -> Option<&RemoteNotice> {
        self.notice
            .as_ref()
            .filter(|n| n.visible_at(now_ms, self.config.notice_duration_ms))
    }

    /// Close the session: cancels any armed timer, and from here on
    /// edits, polls, and late save results are all discarded.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
