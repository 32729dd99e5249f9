//! In-memory [`StateStore`] double with per-key failure injection.
//!
//! Used by reconciliation and scheduler tests that need a real store
//! contract without touching `SQLite`.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::github::models::{PullRequestKey, StoredPullRequest};

use super::{StateStore, StoreError};

/// In-memory key-value store of pull request records.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<PullRequestKey, StoredPullRequest>>,
    failing_gets: Mutex<HashSet<PullRequestKey>>,
    failing_puts: Mutex<HashSet<PullRequestKey>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored record.
    pub fn insert(&self, record: StoredPullRequest) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.pull_request.key.clone(), record);
    }

    /// Makes subsequent `get` calls for `key` fail with a query error.
    pub fn fail_gets_for(&self, key: &PullRequestKey) {
        self.failing_gets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
    }

    /// Makes subsequent `put` calls for `key` fail with a write error.
    pub fn fail_puts_for(&self, key: &PullRequestKey) {
        self.failing_puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
    }

    /// Returns a copy of the stored record for `key`, if any.
    #[must_use]
    pub fn record(&self, key: &PullRequestKey) -> Option<StoredPullRequest> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &PullRequestKey) -> Result<Option<StoredPullRequest>, StoreError> {
        let failing = self
            .failing_gets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key);
        if failing {
            return Err(StoreError::QueryFailed {
                message: format!("injected lookup failure for {key}"),
            });
        }

        Ok(self.record(key))
    }

    async fn put(
        &self,
        key: &PullRequestKey,
        record: &StoredPullRequest,
    ) -> Result<(), StoreError> {
        let failing = self
            .failing_puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key);
        if failing {
            return Err(StoreError::WriteFailed {
                message: format!("injected write failure for {key}"),
            });
        }

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), record.clone());
        Ok(())
    }
}
