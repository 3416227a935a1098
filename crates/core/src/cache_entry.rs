// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared cache entry shape used by both the dependency cache and the image
//! cache (`codalabworker/dependency_manager.py`'s `DependencyState` and
//! `docker_image_manager.py`'s `DockerImageState` are the same shape under
//! different names; this type unifies them).

use crate::bundle::BundleId;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::simple_display;

/// Where a cache entry is in its download lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStage {
    Downloading,
    Ready,
    Failed,
}

simple_display! {
    CacheStage {
        Downloading => "downloading",
        Ready => "ready",
        Failed => "failed",
    }
}

/// One entry in a content-addressable cache (dependency blob or image).
///
/// `Id` is the cache's key type: [`crate::dependency::DependencyKey`] for the
/// dependency cache, a docker image reference (`String`) for the image
/// cache.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry<Id> {
    pub identifier: Id,
    pub stage: CacheStage,
    /// Runs currently depending on this entry; eviction must never touch a
    /// non-empty set.
    pub dependents: HashSet<BundleId>,
    /// Epoch milliseconds of the entry's last use, for LRU ordering.
    pub last_used_ms: u64,
    pub size_bytes: u64,
    pub status_message: String,
    /// Set when the in-flight fetch for this entry was cancelled.
    pub killed: bool,
    pub local_path: Option<PathBuf>,
}

impl<Id> CacheEntry<Id> {
    pub fn new_downloading(identifier: Id, last_used_ms: u64) -> Self {
        Self {
            identifier,
            stage: CacheStage::Downloading,
            dependents: HashSet::new(),
            last_used_ms,
            size_bytes: 0,
            status_message: String::new(),
            killed: false,
            local_path: None,
        }
    }

    /// True if no run currently depends on this entry, the precondition for
    /// eviction (§4.3 invariant: never evict a live entry).
    pub fn is_evictable(&self) -> bool {
        self.dependents.is_empty() && !matches!(self.stage, CacheStage::Downloading)
    }
}

#[cfg(test)]
#[path = "cache_entry_tests.rs"]
mod tests;
