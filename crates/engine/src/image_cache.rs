// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker image cache, a `Cache<String, _>` keyed by image reference,
//! whose fetch routine resolves and pulls the image via `ContainerRuntime`.
//!
//! Grounded in `codalabworker/local_run/docker_image_manager.py`'s
//! `DockerImageManager.get`/`_transition_from_DOWNLOADING` (pull, record
//! the resolved digest, transition to READY/FAILED).

use cw_adapters::ContainerRuntime;
use cw_core::CacheEntry;
use cw_storage::{ImagesStateRecord, StateCommitter};
use std::sync::Arc;

use crate::cache::{Cache, CacheConfig, FetchOutcome};

pub type ImageCache = Cache<String, ImagesStateRecord>;

pub fn new_image_cache(
    committer: StateCommitter<ImagesStateRecord>,
    initial: Vec<CacheEntry<String>>,
    config: CacheConfig,
) -> ImageCache {
    Cache::new(committer, initial, config)
}

/// Spawn the background pull task for `image`. Image size isn't tracked
/// per-entry (disk accounting for images is the container runtime's own
/// business, per `docker_image_manager.py`'s `get_disk_usage`); the
/// resolved digest is reported back via `FetchOutcome::message` so
/// `RunStateMachine::PREPARING` can read it from `all()`.
pub fn spawn_pull(runtime: Arc<dyn ContainerRuntime>, image: String) -> tokio::task::JoinHandle<Result<FetchOutcome, String>> {
    tokio::spawn(async move {
        runtime
            .pull(&image)
            .await
            .map(|digest| FetchOutcome { size_bytes: 0, local_path: None, message: Some(digest) })
            .map_err(|e| e.to_string())
    })
}

#[cfg(test)]
#[path = "image_cache_tests.rs"]
mod tests;
