// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency blob/directory cache, a `Cache<DependencyKey, _>` with a
//! fetch routine that pulls a bundle path from an `ObjectStore` into
//! `work_dir/dependencies/<parent>/<parent_path>`.
//!
//! Grounded in `dependency_manager.py`/`local_run/docker_image_manager.py`
//! (see `cache.rs`); the fetch body itself follows
//! `codalabworker/download_util.py`'s stream-to-disk pattern as described
//! in spec.md §4.3 ("writes either a single file or an extracted directory
//! tree").

use cw_adapters::ObjectStore;
use cw_core::{CacheEntry, DependencyKey};
use cw_storage::{DependenciesStateRecord, StateCommitter};
use futures_util::stream::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::cache::{Cache, CacheConfig, FetchOutcome};

pub type DependencyCache = Cache<DependencyKey, DependenciesStateRecord>;

/// Where a dependency lands on disk once downloaded, mirroring the
/// partitioned layout from spec.md §5 (`dependencies/<key>`).
pub fn local_path(work_dir: &Path, key: &DependencyKey) -> PathBuf {
    work_dir.join("dependencies").join(key.parent.as_str()).join(&key.parent_path)
}

pub fn new_dependency_cache(
    committer: StateCommitter<DependenciesStateRecord>,
    initial: Vec<CacheEntry<DependencyKey>>,
    config: CacheConfig,
) -> DependencyCache {
    Cache::new(committer, initial, config)
}

/// Spawn the background fetch task for `key`, streaming from `store` into
/// `work_dir`. Returns the `JoinHandle` the cache tracks via `ThreadDict`.
pub fn spawn_fetch(
    store: Arc<dyn ObjectStore>,
    work_dir: PathBuf,
    key: DependencyKey,
) -> tokio::task::JoinHandle<Result<FetchOutcome, String>> {
    tokio::spawn(async move {
        let remote_path = key.to_string();
        let dest = local_path(&work_dir, &key);
        fetch_one(store.as_ref(), &remote_path, &dest).await.map_err(|e| e.to_string())
    })
}

async fn fetch_one(store: &dyn ObjectStore, remote_path: &str, dest: &Path) -> Result<FetchOutcome, cw_adapters::ObjectStoreError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| cw_adapters::ObjectStoreError::Io {
            path: remote_path.to_string(),
            source,
        })?;
    }

    let mut stream = store.get_stream(remote_path).await?;
    let mut file = tokio::fs::File::create(dest).await.map_err(|source| cw_adapters::ObjectStoreError::Io {
        path: remote_path.to_string(),
        source,
    })?;

    let mut size_bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(|source| cw_adapters::ObjectStoreError::Io {
            path: remote_path.to_string(),
            source,
        })?;
    }
    file.flush().await.map_err(|source| cw_adapters::ObjectStoreError::Io { path: remote_path.to_string(), source })?;

    Ok(FetchOutcome { size_bytes, local_path: Some(dest.to_path_buf()), message: None })
}

#[cfg(test)]
#[path = "dependency_cache_tests.rs"]
mod tests;
