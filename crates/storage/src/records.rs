// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned record schemas for the four on-disk state files (§4.1).

use crate::committer::Versioned;
use cw_core::{BundleId, CacheEntry, DependencyKey, RunState, WorkerId};
use std::collections::HashMap;

/// `worker-state.json`: the worker's own persisted identity.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkerStateRecord {
    pub schema_version: u32,
    pub worker_id: WorkerId,
    pub last_checkin_ms: u64,
}

impl WorkerStateRecord {
    pub fn new(worker_id: WorkerId) -> Self {
        Self { schema_version: Self::SCHEMA_VERSION, worker_id, last_checkin_ms: 0 }
    }
}

impl Versioned for WorkerStateRecord {
    const SCHEMA_VERSION: u32 = 1;

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

/// `dependencies-state.json`: the dependency cache's entries.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DependenciesStateRecord {
    pub schema_version: u32,
    pub entries: Vec<CacheEntry<DependencyKey>>,
}

impl Versioned for DependenciesStateRecord {
    const SCHEMA_VERSION: u32 = 1;

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

impl From<Vec<CacheEntry<DependencyKey>>> for DependenciesStateRecord {
    fn from(entries: Vec<CacheEntry<DependencyKey>>) -> Self {
        Self { schema_version: Self::SCHEMA_VERSION, entries }
    }
}

/// `images-state.json`: the image cache's entries, keyed by image reference.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ImagesStateRecord {
    pub schema_version: u32,
    pub entries: Vec<CacheEntry<String>>,
}

impl Versioned for ImagesStateRecord {
    const SCHEMA_VERSION: u32 = 1;

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

impl From<Vec<CacheEntry<String>>> for ImagesStateRecord {
    fn from(entries: Vec<CacheEntry<String>>) -> Self {
        Self { schema_version: Self::SCHEMA_VERSION, entries }
    }
}

/// `run-state.json`: every run this worker currently knows about, keyed by
/// bundle id, so a restart resumes each run from its last committed stage.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RunStateRecord {
    pub schema_version: u32,
    pub runs: HashMap<BundleId, RunState>,
}

impl Versioned for RunStateRecord {
    const SCHEMA_VERSION: u32 = 1;

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
