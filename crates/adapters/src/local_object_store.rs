// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed `ObjectStore` for `shared_file_system = true` deployments,
//! grounded in `codalabworker/local_run_manager.py`'s direct-mount bundle
//! access (no network hop for a worker that shares storage with the server).

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use crate::error::ObjectStoreError;
use crate::object_store::{ObjectStat, ObjectStore};

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn stat(&self, path: &str) -> Result<ObjectStat, ObjectStoreError> {
        let resolved = self.resolve(path);
        let meta = tokio::fs::metadata(&resolved).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ObjectStoreError::NotFound(path.to_string())
            } else {
                ObjectStoreError::Io { path: path.to_string(), source }
            }
        })?;
        Ok(ObjectStat { size_bytes: meta.len(), is_directory: meta.is_dir() })
    }

    async fn get_stream(
        &self,
        path: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, ObjectStoreError>>, ObjectStoreError> {
        let resolved = self.resolve(path);
        let path_owned = path.to_string();
        let mut file = tokio::fs::File::open(&resolved).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ObjectStoreError::NotFound(path.to_string())
            } else {
                ObjectStoreError::Io { path: path.to_string(), source }
            }
        })?;

        let chunks = async_stream_chunks(&mut file, path_owned).await;
        Ok(stream::iter(chunks).boxed())
    }

    async fn put_stream(
        &self,
        path: &str,
        mut stream: BoxStream<'static, Result<Bytes, ObjectStoreError>>,
    ) -> Result<(), ObjectStoreError> {
        use tokio::io::AsyncWriteExt;

        let resolved = self.resolve(path);
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| ObjectStoreError::Io {
                path: path.to_string(),
                source,
            })?;
        }
        let mut file = tokio::fs::File::create(&resolved).await.map_err(|source| {
            ObjectStoreError::Io { path: path.to_string(), source }
        })?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(|source| ObjectStoreError::Io {
                path: path.to_string(),
                source,
            })?;
        }
        file.flush().await.map_err(|source| ObjectStoreError::Io { path: path.to_string(), source })?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        let resolved = self.resolve(path);
        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ObjectStoreError::Io { path: path.to_string(), source }),
        }
    }
}

/// Read a whole file into a small set of chunks up front.
///
/// Real deployments of this pattern stream directly off the open file
/// descriptor; buffering here keeps the adapter's async-stream plumbing
/// simple without introducing a self-referential stream type.
async fn async_stream_chunks(
    file: &mut tokio::fs::File,
    path: String,
) -> Vec<Result<Bytes, ObjectStoreError>> {
    const CHUNK_SIZE: usize = 64 * 1024;
    let mut chunks = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => chunks.push(Ok(Bytes::copy_from_slice(&buf[..n]))),
            Err(source) => {
                chunks.push(Err(ObjectStoreError::Io { path: path.clone(), source }));
                break;
            }
        }
    }
    chunks
}

#[cfg(test)]
#[path = "local_object_store_tests.rs"]
mod tests;
