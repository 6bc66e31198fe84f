//! Upload sessions: the original template bytes kept between parse and fill.
//!
//! The store is a trait so the in-memory cache can be swapped for a
//! persistent backend without touching the handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

/// An uploaded template. Read-only once created.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub id: String,
    pub original_bytes: Arc<Vec<u8>>,
    pub original_filename: String,
    pub created_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn new(original_bytes: Vec<u8>, original_filename: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_bytes: Arc::new(original_bytes),
            original_filename,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: UploadSession);

    async fn get(&self, id: &str) -> Option<UploadSession>;

    /// Returns whether a session was removed.
    async fn remove(&self, id: &str) -> bool;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

/// In-process store with a time-to-live and a size bound.
pub struct MemorySessionStore {
    cache: Cache<String, UploadSession>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: UploadSession) {
        debug!("Storing upload session {}", session.id);
        self.cache.insert(session.id.clone(), session).await;
    }

    async fn get(&self, id: &str) -> Option<UploadSession> {
        self.cache.get(id).await
    }

    async fn remove(&self, id: &str) -> bool {
        self.cache.remove(id).await.is_some()
    }
}
