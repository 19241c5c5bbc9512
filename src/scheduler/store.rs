//! Progress store for polling clients
//!
//! Invocations publish snapshots keyed by a job token; a polling endpoint can
//! read them back. Entries expire after a fixed time-to-live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// How long snapshots stay readable when no TTL is given
pub const DEFAULT_PROGRESS_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors that can occur during progress store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Progress store lock poisoned")]
    Poisoned,

    #[error("Progress store backend error: {0}")]
    Backend(String),
}

/// Result type for progress store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Progress of one job as seen by a polling client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
    /// True once the whole list has been resolved
    pub complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn new(processed: usize, total: usize, complete: bool) -> Self {
        Self {
            processed,
            total,
            percent: super::events::percent(processed, total),
            complete,
            updated_at: Utc::now(),
        }
    }
}

/// Key-value store for progress snapshots
pub trait ProgressStore: Send + Sync {
    fn get(&self, token: &str) -> StoreResult<Option<ProgressSnapshot>>;

    fn set(&self, token: &str, snapshot: ProgressSnapshot) -> StoreResult<()>;

    /// Removes a snapshot, returning whether one existed
    fn delete(&self, token: &str) -> StoreResult<bool>;
}

#[derive(Debug, Clone)]
struct StoredSnapshot {
    snapshot: ProgressSnapshot,
    stored_at: DateTime<Utc>,
}

impl StoredSnapshot {
    fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.stored_at)
            .to_std()
            .map(|age| age > ttl)
            .unwrap_or(false)
    }
}

/// In-process store with time-based eviction
///
/// Stale entries are dropped lazily on `get` and swept on every `set`.
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, StoredSnapshot>>,
    ttl: Duration,
}

impl MemoryProgressStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn evict_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_stale(self.ttl, now));
        Ok(before - entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(
        &self,
        token: &str,
        snapshot: ProgressSnapshot,
        stored_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(
            token.to_string(),
            StoredSnapshot {
                snapshot,
                stored_at,
            },
        );
        Ok(())
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_TTL)
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, token: &str) -> StoreResult<Option<ProgressSnapshot>> {
        let now = Utc::now();
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;

        let stale = match entries.get(token) {
            Some(stored) => stored.is_stale(self.ttl, now),
            None => return Ok(None),
        };

        if stale {
            entries.remove(token);
            return Ok(None);
        }

        Ok(entries.get(token).map(|stored| stored.snapshot.clone()))
    }

    fn set(&self, token: &str, snapshot: ProgressSnapshot) -> StoreResult<()> {
        let evicted = self.evict_expired()?;
        if evicted > 0 {
            tracing::debug!("Evicted {} expired progress entries", evicted);
        }
        self.insert_at(token, snapshot, Utc::now())
    }

    fn delete(&self, token: &str) -> StoreResult<bool> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.remove(token).is_some())
    }
}
