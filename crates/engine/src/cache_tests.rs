// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cw_core::BundleId;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TestRecord {
    schema_version: u32,
    entries: Vec<CacheEntry<String>>,
}

impl Versioned for TestRecord {
    const SCHEMA_VERSION: u32 = 1;
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

impl From<Vec<CacheEntry<String>>> for TestRecord {
    fn from(entries: Vec<CacheEntry<String>>) -> Self {
        Self { schema_version: TestRecord::SCHEMA_VERSION, entries }
    }
}

fn cache(dir: &tempfile::TempDir, config: CacheConfig) -> Cache<String, TestRecord> {
    let committer = StateCommitter::new(dir.path().join("state.json"));
    Cache::new(committer, Vec::new(), config)
}

#[tokio::test]
async fn acquire_creates_downloading_entry_and_spawns_fetch() {
    let dir = tempdir().expect("tmpdir");
    let cache = cache(&dir, CacheConfig::default());
    let bundle = BundleId::from_string("bun-1");
    let entry = cache.acquire(bundle, "key-a".to_string(), || {
        tokio::spawn(async { Ok(FetchOutcome { size_bytes: 10, local_path: None, message: None }) })
    });
    assert_eq!(entry.stage, CacheStage::Downloading);
    assert!(cache.has(&"key-a".to_string()));
}

#[tokio::test]
async fn second_acquire_for_same_key_does_not_spawn_again() {
    let dir = tempdir().expect("tmpdir");
    let cache = cache(&dir, CacheConfig::default());
    let a = BundleId::from_string("bun-a");
    let b = BundleId::from_string("bun-b");
    cache.acquire(a, "key-a".to_string(), || tokio::spawn(async { Ok(FetchOutcome { size_bytes: 1, local_path: None, message: None }) }));
    let entry = cache.acquire(b.clone(), "key-a".to_string(), || {
        panic!("should not be called for an already-tracked key")
    });
    assert!(entry.dependents.contains(&b));
}

#[tokio::test]
async fn tick_transitions_successful_download_to_ready() {
    let dir = tempdir().expect("tmpdir");
    let cache = cache(&dir, CacheConfig::default());
    let bundle = BundleId::from_string("bun-1");
    cache.acquire(bundle, "key-a".to_string(), || {
        tokio::spawn(async { Ok(FetchOutcome { size_bytes: 42, local_path: None, message: None }) })
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    cache.tick().await;
    let entries = cache.all();
    assert_eq!(entries[0].stage, CacheStage::Ready);
    assert_eq!(entries[0].size_bytes, 42);
}

#[tokio::test]
async fn tick_transitions_failed_download_to_failed() {
    let dir = tempdir().expect("tmpdir");
    let cache = cache(&dir, CacheConfig::default());
    let bundle = BundleId::from_string("bun-1");
    cache.acquire(bundle, "key-a".to_string(), || tokio::spawn(async { Err("fetch exploded".to_string()) }));
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    cache.tick().await;
    let entries = cache.all();
    assert_eq!(entries[0].stage, CacheStage::Failed);
    assert_eq!(entries[0].status_message, "fetch exploded");
}

#[tokio::test]
async fn release_marks_abandoned_download_killed() {
    let dir = tempdir().expect("tmpdir");
    let cache = cache(&dir, CacheConfig::default());
    let bundle = BundleId::from_string("bun-1");
    cache.acquire(bundle.clone(), "key-a".to_string(), || {
        tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(FetchOutcome { size_bytes: 1, local_path: None, message: None })
        })
    });
    cache.release(&bundle, &"key-a".to_string());
    let entries = cache.all();
    assert!(entries[0].killed);
}

#[tokio::test]
async fn evict_never_touches_entries_with_dependents() {
    let dir = tempdir().expect("tmpdir");
    let config = CacheConfig { quota_bytes: 1, failed_ttl: Duration::from_secs(60) };
    let cache = cache(&dir, config);
    let bundle = BundleId::from_string("bun-1");
    cache.acquire(bundle.clone(), "key-a".to_string(), || {
        tokio::spawn(async { Ok(FetchOutcome { size_bytes: 100, local_path: None, message: None }) })
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    cache.tick().await;
    // key-a has a dependent (bun-1) and is over quota; must survive eviction.
    assert!(cache.has(&"key-a".to_string()));
}

#[tokio::test]
async fn evict_removes_lru_ready_entry_without_dependents() {
    let dir = tempdir().expect("tmpdir");
    let config = CacheConfig { quota_bytes: 1, failed_ttl: Duration::from_secs(60) };
    let cache = cache(&dir, config);
    let bundle = BundleId::from_string("bun-1");
    cache.acquire(bundle.clone(), "key-a".to_string(), || {
        tokio::spawn(async { Ok(FetchOutcome { size_bytes: 100, local_path: None, message: None }) })
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    cache.tick().await;
    cache.release(&bundle, &"key-a".to_string());
    cache.tick().await;
    assert!(!cache.has(&"key-a".to_string()));
}
