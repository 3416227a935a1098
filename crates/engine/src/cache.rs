// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic mutual-exclusion-per-key cache shared by `DependencyCache` and
//! `ImageCache`.
//!
//! Grounded in `codalabworker/local_run/docker_image_manager.py`'s
//! `DockerImageManager` (transition-then-cleanup background loop, quota
//! eviction favoring failed entries before ready ones, both LRU) and
//! `dependency_manager.py` (mutual exclusion of concurrent fetches for
//! the same key via the entry's `downloading` stage). The two managers'
//! nearly-identical shapes are collapsed here into one generic type,
//! parameterized by key and specialized by `dependency_cache`/`image_cache`.

use cw_core::{BundleId, CacheEntry, CacheStage};
use cw_storage::{CommitError, StateCommitter, Versioned};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::hash::Hash;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::thread_dict::ThreadDict;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Quota and retention knobs (SPEC_FULL §4.3).
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub quota_bytes: u64,
    pub failed_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { quota_bytes: u64::MAX, failed_ttl: Duration::from_secs(60) }
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// A fetch task's outcome: final size and (for directory dependencies) the
/// local path it materialized under `work_dir`. `message` becomes the
/// entry's `status_message` on success too, not just on failure — the
/// image cache uses it to report the resolved digest back to callers.
pub struct FetchOutcome {
    pub size_bytes: u64,
    pub local_path: Option<std::path::PathBuf>,
    pub message: Option<String>,
}

pub type FetchResult = Result<FetchOutcome, String>;

/// Generic cache of `CacheEntry<K>`, backed by a `StateCommitter` and a
/// `ThreadDict` of in-flight fetch tasks.
///
/// `K` identifies a cached artifact (a `DependencyKey` or an image
/// digest `String`). Callers supply the fetch closure per call to
/// `acquire`, matching the spec's "download task contract" rather than
/// baking object-store access into this generic type.
pub struct Cache<K, R> {
    entries: Mutex<Vec<CacheEntry<K>>>,
    downloads: Mutex<ThreadDict<K, FetchResult>>,
    committer: StateCommitter<R>,
    config: CacheConfig,
}

impl<K, R> Cache<K, R>
where
    K: Eq + Hash + Clone + Send + 'static,
    R: Versioned + Clone + Serialize + DeserializeOwned + From<Vec<CacheEntry<K>>>,
{
    pub fn new(committer: StateCommitter<R>, initial: Vec<CacheEntry<K>>, config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(initial),
            downloads: Mutex::new(ThreadDict::new()),
            committer,
            config,
        }
    }

    pub fn has(&self, key: &K) -> bool {
        self.entries.lock().iter().any(|e| &e.identifier == key)
    }

    /// Snapshot for worker check-in: identifiers, sizes, stages.
    pub fn all(&self) -> Vec<CacheEntry<K>> {
        self.entries.lock().clone()
    }

    /// Idempotently register `dependent` against `key`. If absent, create
    /// a `Downloading` entry and spawn `fetch` in the background. Never
    /// blocks. `fetch` receives nothing beyond what the caller closes
    /// over; its outcome becomes the entry's terminal stage.
    pub fn acquire<F>(&self, dependent: BundleId, key: K, fetch: F) -> CacheEntry<K>
    where
        F: FnOnce() -> JoinHandle<FetchResult>,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.identifier == key) {
            entry.dependents.insert(dependent);
            entry.last_used_ms = now_ms();
            return entry.clone();
        }

        let mut entry = CacheEntry::new_downloading(key.clone(), now_ms());
        entry.dependents.insert(dependent);
        entries.push(entry.clone());
        drop(entries);

        let handle = fetch();
        self.downloads.lock().insert(key, handle, ());
        entry
    }

    /// Remove `dependent` from `key`'s dependent set. If the entry is
    /// still downloading and becomes dependent-less, mark it killed so
    /// the fetch task's cooperative-cancel check aborts it.
    pub fn release(&self, dependent: &BundleId, key: &K) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| &e.identifier == key) {
            entry.dependents.remove(dependent);
            if entry.stage == CacheStage::Downloading && entry.dependents.is_empty() {
                entry.killed = true;
            }
        }
    }

    /// One pass of the background maintenance loop (SPEC_FULL §4.3
    /// points 1-4). Callers drive this on a periodic tick.
    pub async fn tick(&self) {
        self.transition_finished_downloads().await;
        self.expire_failed();
        self.evict();
        if let Err(err) = self.persist() {
            warn!(error = %err, "cache state commit failed");
        }
    }

    async fn transition_finished_downloads(&self) {
        let finished: Vec<K> = {
            let downloads = self.downloads.lock();
            downloads.keys().filter(|k| downloads.get(k).map(|e| e.is_finished()).unwrap_or(false)).cloned().collect()
        };

        for key in finished {
            let entry = self.downloads.lock().take(&key);
            let Some(entry) = entry else { continue };
            let outcome: FetchResult = match entry.into_handle().await {
                Ok(result) => result,
                Err(join_err) => Err(join_err.to_string()),
            };

            let mut entries = self.entries.lock();
            let Some(slot) = entries.iter_mut().find(|e| e.identifier == key) else { continue };
            let was_killed = slot.killed;
            if was_killed {
                let key_clone = key.clone();
                drop(slot);
                entries.retain(|e| e.identifier != key_clone);
                continue;
            }
            match outcome {
                Ok(FetchOutcome { size_bytes, local_path, message }) => {
                    slot.stage = CacheStage::Ready;
                    slot.size_bytes = size_bytes;
                    slot.local_path = local_path;
                    slot.status_message = message.unwrap_or_default();
                }
                Err(message) => {
                    slot.stage = CacheStage::Failed;
                    slot.status_message = message;
                }
            }
        }
    }

    fn expire_failed(&self) {
        let ttl = self.config.failed_ttl;
        let now = now_ms();
        let mut entries = self.entries.lock();
        entries.retain(|e| {
            if e.stage != CacheStage::Failed {
                return true;
            }
            Duration::from_millis(now.saturating_sub(e.last_used_ms)) <= ttl
        });
    }

    fn evict(&self) {
        loop {
            let mut entries = self.entries.lock();
            let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
            if total <= self.config.quota_bytes {
                return;
            }
            let victim_index = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.stage == CacheStage::Failed)
                .min_by_key(|(_, e)| e.last_used_ms)
                .map(|(i, _)| i)
                .or_else(|| {
                    entries
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.is_evictable())
                        .min_by_key(|(_, e)| e.last_used_ms)
                        .map(|(i, _)| i)
                });
            match victim_index {
                Some(idx) => {
                    entries.remove(idx);
                }
                None => {
                    debug!("cache over quota but nothing evictable; waiting for active runs");
                    return;
                }
            }
        }
    }

    fn persist(&self) -> Result<(), CommitError> {
        let snapshot = self.entries.lock().clone();
        self.committer.commit(&R::from(snapshot))
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
