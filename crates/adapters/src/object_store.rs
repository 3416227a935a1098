// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ObjectStore`: the narrow seam across which the worker reads and writes
//! bundle contents, keeping blob-storage specifics (filesystem vs. the
//! bundle service's HTTP blob API) out of the cache/run machinery.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::ObjectStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStat {
    pub size_bytes: u64,
    pub is_directory: bool,
}

/// Byte-stream storage backend for dependency/run contents.
///
/// One implementation talks directly to a shared filesystem
/// (`shared_file_system = true`, grounded in
/// `codalabworker/local_run_manager.py`'s direct-mount path); another goes
/// through the bundle service's HTTP blob endpoints (§6) for workers that
/// don't share storage with the server.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn stat(&self, path: &str) -> Result<ObjectStat, ObjectStoreError>;

    async fn get_stream(
        &self,
        path: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, ObjectStoreError>>, ObjectStoreError>;

    async fn put_stream(
        &self,
        path: &str,
        stream: BoxStream<'static, Result<Bytes, ObjectStoreError>>,
    ) -> Result<(), ObjectStoreError>;

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError>;
}
