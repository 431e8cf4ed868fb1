//! Persistence seam.
//!
//! Implementations:
//! - `InMemoryStore` - For testing and the demo binary
//! - Real backends live with whoever owns the transport (out of scope
//!   here); the contract is just `save(entity) -> saved entity`, with
//!   the server assigning an id on first create.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::{Draft, Editable, EntityId};

/// Maximum caption length the in-memory store accepts.
///
/// Mirrors the platform limit real backends enforce.
pub const MAX_CAPTION_LEN: usize = 2_200;

#[derive(Debug, Clone, Error)]
pub enum SaveError {
    /// Transient transport failure; the save is not confirmed.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the content; nothing changed remotely.
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, SaveError>;

/// Persistence backend for editable entities.
///
/// Must be idempotent-safe to call repeatedly with the same content;
/// server-side dedup is the server's concern. On first create (entity
/// without an id) the returned entity carries the assigned id.
#[async_trait]
pub trait SaveClient<E: Editable>: Send + Sync {
    async fn save(&self, entity: &E) -> Result<E>;
}

/// In-memory backend for testing.
pub struct InMemoryStore {
    rows: RwLock<HashMap<EntityId, Draft>>,
    /// Every accepted save, in order. Lets tests assert coalescing.
    history: RwLock<Vec<Draft>>,
    /// Error to return on the next save call, if injected.
    fail_next: RwLock<Option<SaveError>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            fail_next: RwLock::new(None),
        }
    }

    /// Make the next `save` call fail with the given error.
    pub fn fail_next(&self, err: SaveError) {
        *self.fail_next.write().unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    /// Accepted saves, in order.
    pub fn history(&self) -> Vec<Draft> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of accepted saves.
    pub fn save_count(&self) -> usize {
        self.history.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Current stored row, if any.
    pub fn get(&self, id: &EntityId) -> Option<Draft> {
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Seed a row directly, as if another session had created it.
    pub fn insert(&self, draft: Draft) {
        if let Some(id) = draft.id.clone() {
            self.rows
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(id, draft);
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SaveClient<Draft> for InMemoryStore {
    async fn save(&self, entity: &Draft) -> Result<Draft> {
        if let Some(err) = self
            .fail_next
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(err);
        }

        if entity.caption.chars().count() > MAX_CAPTION_LEN {
            return Err(SaveError::Validation(format!(
                "caption exceeds {MAX_CAPTION_LEN} characters"
            )));
        }

        let mut saved = entity.clone();
        if saved.id.is_none() {
            saved.assign_id(EntityId(Uuid::new_v4().to_string()));
        }

        let id = saved.id.clone().expect("id assigned above");
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, saved.clone());
        self.history
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(saved.clone());

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DraftPatch;

    fn draft(caption: &str) -> Draft {
        let mut d = Draft::new();
        d.apply_patch(DraftPatch::caption(caption));
        d
    }

    #[tokio::test]
    async fn create_assigns_id() {
        let store = InMemoryStore::new();
        let saved = store.save(&draft("first post")).await.unwrap();

        let id = saved.id.clone().expect("server assigns id on create");
        assert_eq!(store.get(&id).unwrap().caption, "first post");
    }

    #[tokio::test]
    async fn update_keeps_id() {
        let store = InMemoryStore::new();
        let created = store.save(&draft("v1")).await.unwrap();

        let mut edited = created.clone();
        edited.caption = "v2".into();
        let saved = store.save(&edited).await.unwrap();

        assert_eq!(saved.id, created.id);
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn oversized_caption_rejected() {
        let store = InMemoryStore::new();
        let result = store.save(&draft(&"x".repeat(MAX_CAPTION_LEN + 1))).await;

        assert!(matches!(result, Err(SaveError::Validation(_))));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = InMemoryStore::new();
        store.fail_next(SaveError::Network("connection reset".into()));

        assert!(store.save(&draft("a")).await.is_err());
        assert!(store.save(&draft("a")).await.is_ok());
    }
}
