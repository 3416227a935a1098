// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bytes::Bytes;
use cw_adapters::FakeObjectStore;
use cw_core::BundleId;
use tempfile::tempdir;

#[tokio::test]
async fn fetch_writes_remote_content_to_local_path() {
    let fake = FakeObjectStore::new();
    fake.seed("bun-1/model.bin", Bytes::from_static(b"weights"));
    let store: Arc<dyn ObjectStore> = Arc::new(fake);

    let dir = tempdir().expect("tmpdir");
    let key = DependencyKey::new(BundleId::from_string("bun-1"), "model.bin".to_string());
    let outcome = fetch_one(store.as_ref(), &key.to_string(), &local_path(dir.path(), &key))
        .await
        .expect("fetch");
    assert_eq!(outcome.size_bytes, 7);
    let written = tokio::fs::read(local_path(dir.path(), &key)).await.expect("read");
    assert_eq!(written, b"weights");
}

#[tokio::test]
async fn fetch_of_missing_path_errors() {
    let store: Arc<dyn ObjectStore> = Arc::new(FakeObjectStore::new());
    let dir = tempdir().expect("tmpdir");
    let key = DependencyKey::new(BundleId::from_string("bun-1"), "missing.bin".to_string());
    let result = fetch_one(store.as_ref(), &key.to_string(), &local_path(dir.path(), &key)).await;
    assert!(result.is_err());
}

#[test]
fn local_path_is_partitioned_by_parent_and_path() {
    let key = DependencyKey::new(BundleId::from_string("bun-1"), "data/train.csv".to_string());
    let path = local_path(Path::new("/work"), &key);
    assert_eq!(path, Path::new("/work/dependencies/bun-1/data/train.csv"));
}
