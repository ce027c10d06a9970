//! Session store - one uploaded dataset per browser session.
//!
//! Datasets live in memory only and are dropped when a session is removed,
//! evicted for capacity, or idle for too long.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Dataset;

/// Default number of sessions kept before the least recently used is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 64;

/// A stored dataset with metadata
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// Unique identifier
    pub id: Uuid,
    /// Uploaded file name, if the client sent one
    pub name: Option<String>,
    /// The derived dataset, shared read-only with request handlers
    pub dataset: Arc<Dataset>,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
    /// Last time the session was read
    pub last_access: DateTime<Utc>,
}

/// Public view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub name: Option<String>,
    pub row_count: usize,
    pub created_at: String,
    pub last_access: String,
}

impl From<&StoredSession> for SessionSummary {
    fn from(s: &StoredSession) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            row_count: s.dataset.len(),
            created_at: s.created_at.to_rfc3339(),
            last_access: s.last_access.to_rfc3339(),
        }
    }
}

/// In-memory store of uploaded datasets keyed by session id
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<Uuid, StoredSession>,
    max_sessions: usize,
}

impl SessionStore {
    /// Create an empty store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    /// Create an empty store holding at most `max_sessions` datasets
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Store a dataset under a fresh id, evicting the least recently used
    /// session when full.
    pub fn insert(&mut self, dataset: Dataset, name: Option<String>) -> Uuid {
        while self.sessions.len() >= self.max_sessions {
            let Some(oldest) = self
                .sessions
                .values()
                .min_by_key(|s| s.last_access)
                .map(|s| s.id)
            else {
                break;
            };
            self.sessions.remove(&oldest);
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            StoredSession {
                id,
                name,
                dataset: Arc::new(dataset),
                created_at: now,
                last_access: now,
            },
        );
        id
    }

    /// Get a session's dataset and mark the session as used
    pub fn get(&mut self, id: &Uuid) -> Option<Arc<Dataset>> {
        let session = self.sessions.get_mut(id)?;
        session.last_access = Utc::now();
        Some(Arc::clone(&session.dataset))
    }

    /// Look at a session without touching its access time
    pub fn peek(&self, id: &Uuid) -> Option<&StoredSession> {
        self.sessions.get(id)
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// All sessions, oldest upload first
    pub fn list(&self) -> Vec<&StoredSession> {
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    /// Drop sessions not read for longer than `max_idle`. Returns how many were dropped.
    pub fn evict_idle(&mut self, max_idle: Duration) -> usize {
        self.evict_idle_at(max_idle, Utc::now())
    }

    fn evict_idle_at(&mut self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now - s.last_access <= max_idle);
        before - self.sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
