//! The edit buffer: the single mutable working copy of an entity.
//!
//! Exclusively owned by one editing session. All operations are total —
//! there are no error paths here; the scheduler observes the resulting
//! fingerprint after each mutation.

use crate::entity::Editable;
use crate::fingerprint::Fingerprint;

/// In-progress mutable copy of an entity being edited.
#[derive(Debug, Clone)]
pub struct EditBuffer<E: Editable> {
    current: E,
}

impl<E: Editable> EditBuffer<E> {
    /// Seed the buffer from an authoritative copy (or a brand-new
    /// entity). Called exactly once per session at creation.
    pub fn new(seed: E) -> Self {
        Self {
            current: seed.normalized(),
        }
    }

    /// Merge a partial-field update into the buffer.
    pub fn apply(&mut self, patch: E::Patch) {
        self.current.apply_patch(patch);
    }

    /// Overwrite the buffer with an accepted external copy.
    pub fn replace(&mut self, entity: E) {
        self.current = entity.normalized();
    }

    /// Current buffer contents.
    pub fn entity(&self) -> &E {
        &self.current
    }

    /// Mutable access, used by the session for identifier adoption.
    pub(crate) fn entity_mut(&mut self) -> &mut E {
        &mut self.current
    }

    /// Clone of the current contents, for a save request.
    pub fn snapshot(&self) -> E {
        self.current.clone()
    }

    /// Fingerprint of the current contents.
    pub fn fingerprint(&self) -> Fingerprint {
        self.current.fingerprint()
    }
}
