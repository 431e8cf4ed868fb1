//! Editable entities: the draft model and the `Editable` seam.
//!
//! The reconciliation machinery is generic over anything implementing
//! [`Editable`] — the shipped entity is [`Draft`], a scheduled calendar
//! post with a caption, status, publish time, and ordered attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::fingerprint::Fingerprint;

/// Server-assigned entity identifier.
///
/// Absent until the first successful create; the server is the only
/// source of identifiers (client-generated ids are not assumed stable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity that can live in an edit buffer.
///
/// Implementations decide what "mutable fields" means; the contract is
/// that [`fingerprint`](Editable::fingerprint) covers exactly those
/// fields (excluding the identifier) and that two entities with equal
/// field values produce equal fingerprints regardless of how the values
/// were represented on arrival.
pub trait Editable: Clone {
    /// Partial-field update merged by [`apply_patch`](Editable::apply_patch).
    type Patch;

    /// The server-assigned identifier, if one has been assigned yet.
    fn id(&self) -> Option<&EntityId>;

    /// Adopt a server-assigned identifier. Happens at most once, on the
    /// first successful create.
    fn assign_id(&mut self, id: EntityId);

    /// Merge the given fields into this entity.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// A canonical copy: representation differences that don't change
    /// field values (e.g. sub-millisecond timestamp precision) are
    /// erased so fingerprints line up.
    fn normalized(&self) -> Self;

    /// Fingerprint of the mutable fields.
    fn fingerprint(&self) -> Fingerprint;
}

/// Publication status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Scheduled,
    Published,
}

/// Ordered reference to an item in the media library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    /// Media library id of the attached asset.
    pub media_id: String,
    /// Accessibility text, if the user provided any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl Attachment {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            alt_text: None,
        }
    }
}

/// A calendar post draft: the concrete editable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Server-assigned id; `None` until the first successful create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Post caption text.
    pub caption: String,
    /// Publication status.
    pub status: DraftStatus,
    /// When the post is scheduled to go out, if scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Ordered media attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Draft {
    /// A brand-new, not-yet-created draft.
    pub fn new() -> Self {
        Self {
            id: None,
            caption: String::new(),
            status: DraftStatus::Draft,
            scheduled_at: None,
            attachments: Vec::new(),
        }
    }

    /// Reduce a schedule timestamp to its millisecond instant.
    ///
    /// Authoritative copies can arrive with sub-millisecond precision the
    /// local buffer never had; comparing at the stored granularity keeps
    /// those from reading as content changes.
    fn scheduled_millis(&self) -> Option<i64> {
        self.scheduled_at.map(|t| t.timestamp_millis())
    }
}

impl Default for Draft {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial-field update for a [`Draft`].
///
/// Unset fields are left untouched by the merge. `scheduled_at` is
/// doubly optional so a patch can clear the schedule.
#[derive(Debug, Clone, Default)]
pub struct DraftPatch {
    pub caption: Option<String>,
    pub status: Option<DraftStatus>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl DraftPatch {
    pub fn caption(text: impl Into<String>) -> Self {
        Self {
            caption: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn status(status: DraftStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Editable for Draft {
    type Patch = DraftPatch;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn assign_id(&mut self, id: EntityId) {
        debug_assert!(self.id.is_none(), "entity id assigned twice");
        self.id = Some(id);
    }

    fn apply_patch(&mut self, patch: DraftPatch) {
        if let Some(caption) = patch.caption {
            self.caption = caption;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            self.scheduled_at = scheduled_at;
        }
        if let Some(attachments) = patch.attachments {
            self.attachments = attachments;
        }
    }

    fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.scheduled_at = self
            .scheduled_millis()
            .and_then(DateTime::from_timestamp_millis);
        copy
    }

    fn fingerprint(&self) -> Fingerprint {
        // Fixed field sequence; the id is deliberately excluded so the
        // creation round-trip doesn't register as a content change.
        struct Fields<'a>(&'a Draft);

        impl Hash for Fields<'_> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.caption.hash(state);
                self.0.status.hash(state);
                self.0.scheduled_millis().hash(state);
                self.0.attachments.hash(state);
            }
        }

        Fingerprint::of(&Fields(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft_with_caption(caption: &str) -> Draft {
        Draft {
            caption: caption.into(),
            ..Draft::new()
        }
    }

    #[test]
    fn fingerprint_ignores_id() {
        let mut a = draft_with_caption("launch day");
        let b = a.clone();
        a.assign_id(EntityId("post-1".into()));

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_tolerates_timestamp_representation() {
        let mut a = draft_with_caption("launch day");
        let mut b = a.clone();
        // Same instant, one with sub-millisecond precision.
        a.scheduled_at = Utc.timestamp_opt(1_700_000_000, 0).single();
        b.scheduled_at = Utc.timestamp_opt(1_700_000_000, 123_456).single();

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_sees_attachment_order() {
        let mut a = draft_with_caption("carousel");
        let mut b = a.clone();
        a.attachments = vec![Attachment::new("m1"), Attachment::new("m2")];
        b.attachments = vec![Attachment::new("m2"), Attachment::new("m1")];

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn patch_merges_only_set_fields() {
        let mut draft = draft_with_caption("before");
        draft.status = DraftStatus::Scheduled;

        draft.apply_patch(DraftPatch::caption("after"));

        assert_eq!(draft.caption, "after");
        assert_eq!(draft.status, DraftStatus::Scheduled);
    }

    #[test]
    fn patch_can_clear_schedule() {
        let mut draft = draft_with_caption("scheduled");
        draft.scheduled_at = Utc.timestamp_opt(1_700_000_000, 0).single();

        draft.apply_patch(DraftPatch {
            scheduled_at: Some(None),
            ..DraftPatch::default()
        });

        assert!(draft.scheduled_at.is_none());
    }

    #[test]
    fn normalized_truncates_to_millis() {
        let mut draft = draft_with_caption("precise");
        draft.scheduled_at = Utc.timestamp_opt(1_700_000_000, 999_999).single();

        let normalized = draft.normalized();
        let expected = Utc.timestamp_opt(1_700_000_000, 0).single();

        assert_eq!(normalized.scheduled_at, expected);
    }
}
