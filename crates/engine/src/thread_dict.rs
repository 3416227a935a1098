// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A typed registry of in-flight background tasks, keyed by whatever
//! identifies the work (a dependency key, an image digest, a run id).
//!
//! Generalizes the Python `worker_thread.py`'s `ThreadDict` (a plain
//! `dict` subclass keyed by strings, storing a `threading.Thread` plus a
//! loose field bag) into a strongly-typed handle map: the cache
//! background loop polls `JoinHandle::is_finished` / `take_result`
//! instead of calling back into Python's duck-typed fields.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::task::JoinHandle;

/// One tracked background task and the metadata the owner wants to keep
/// alongside it (e.g. a cooperative-cancel flag).
pub struct Entry<V, M> {
    handle: JoinHandle<V>,
    pub meta: M,
}

impl<V, M> Entry<V, M> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn into_handle(self) -> JoinHandle<V> {
        self.handle
    }
}

/// Map from key to in-flight task. `V` is the task's output type, `M` is
/// whatever side metadata the owner wants to track per entry (defaults to
/// `()` when there is none).
pub struct ThreadDict<K, V, M = ()> {
    entries: HashMap<K, Entry<V, M>>,
}

impl<K: Eq + Hash, V, M> Default for ThreadDict<K, V, M> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<K: Eq + Hash, V, M> ThreadDict<K, V, M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `key` with the given metadata, replacing
    /// (and dropping, without joining) any prior entry. Mirrors
    /// `add_thread`.
    pub fn insert(&mut self, key: K, handle: JoinHandle<V>, meta: M) {
        self.entries.insert(key, Entry { handle, meta });
    }

    /// Register `handle` only if `key` is not already tracked. Mirrors
    /// `add_if_new`; returns `false` if an entry already existed.
    pub fn insert_if_new(&mut self, key: K, make: impl FnOnce() -> (JoinHandle<V>, M)) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        let (handle, meta) = make();
        self.entries.insert(key, Entry { handle, meta });
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&Entry<V, M>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut Entry<V, M>> {
        self.entries.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Remove and await the task for `key`, returning its result if it
    /// was tracked. Mirrors `remove` (which joins before dropping).
    pub async fn remove(&mut self, key: &K) -> Option<Result<V, tokio::task::JoinError>> {
        match self.entries.remove(key) {
            Some(entry) => Some(entry.handle.await),
            None => None,
        }
    }

    /// Take the entry out without awaiting it, for callers that already
    /// know it finished (`is_finished() == true`) and just want the
    /// result via `.handle.await` themselves, or want to abort it.
    pub fn take(&mut self, key: &K) -> Option<Entry<V, M>> {
        self.entries.remove(key)
    }

    pub fn abort(&mut self, key: &K) {
        if let Some(entry) = self.entries.remove(key) {
            entry.handle.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "thread_dict_tests.rs"]
mod tests;
