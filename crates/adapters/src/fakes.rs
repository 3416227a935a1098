// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for the three adapter traits, gated behind
//! `test-support`, following the teacher's `FakeAdapter` convention of
//! giving every trait a deterministic in-memory stand-in for tests that
//! shouldn't need a real docker daemon, filesystem, or bundle service.

use async_trait::async_trait;
use bytes::Bytes;
use cw_core::{BundleId, ResourceUsage, WorkerId};
use cw_wire::{CheckinRequest, Reply, ServerCommand};
use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::container::{ContainerRuntime, ContainerSpec, ContainerStats, ContainerStatus};
use crate::error::{ContainerError, ObjectStoreError, ServiceClientError};
use crate::object_store::{ObjectStat, ObjectStore};
use crate::service_client::BundleServiceClient;

/// In-memory `ObjectStore` backed by a `HashMap<String, Bytes>`.
#[derive(Default, Clone)]
pub struct FakeObjectStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.objects.lock().insert(path.into(), content.into());
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn stat(&self, path: &str) -> Result<ObjectStat, ObjectStoreError> {
        self.objects
            .lock()
            .get(path)
            .map(|b| ObjectStat { size_bytes: b.len() as u64, is_directory: false })
            .ok_or_else(|| ObjectStoreError::NotFound(path.to_string()))
    }

    async fn get_stream(
        &self,
        path: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, ObjectStoreError>>, ObjectStoreError> {
        let bytes = self
            .objects
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(path.to_string()))?;
        Ok(stream::iter(vec![Ok(bytes)]).boxed())
    }

    async fn put_stream(
        &self,
        path: &str,
        mut stream: BoxStream<'static, Result<Bytes, ObjectStoreError>>,
    ) -> Result<(), ObjectStoreError> {
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        self.objects.lock().insert(path.to_string(), Bytes::from(buf));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        self.objects.lock().remove(path);
        Ok(())
    }
}

/// In-memory `ContainerRuntime` that tracks containers as a status map
/// rather than spawning real processes.
#[derive(Default, Clone)]
pub struct FakeContainerRuntime {
    containers: Arc<Mutex<HashMap<String, ContainerStatus>>>,
    stats: Arc<Mutex<HashMap<String, ContainerStats>>>,
}

impl FakeContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a tracked container straight to `Exited`, as a test driving the
    /// RUNNING stage's polling loop would after simulating completion.
    pub fn finish(&self, name: &str, code: i32) {
        self.containers.lock().insert(name.to_string(), ContainerStatus::Exited { code });
    }

    pub fn set_stats(&self, name: &str, stats: ContainerStats) {
        self.stats.lock().insert(name.to_string(), stats);
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn pull(&self, image: &str) -> Result<String, ContainerError> {
        Ok(format!("{image}@sha256:fake"))
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<(), ContainerError> {
        self.containers.lock().insert(spec.name.clone(), ContainerStatus::Running);
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<ContainerStatus, ContainerError> {
        self.containers.lock().get(name).copied().ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    async fn stats(&self, name: &str) -> Result<ContainerStats, ContainerError> {
        Ok(self.stats.lock().get(name).copied().unwrap_or_default())
    }

    async fn kill(&self, name: &str) -> Result<(), ContainerError> {
        self.containers.lock().insert(name.to_string(), ContainerStatus::Exited { code: 137 });
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ContainerError> {
        self.containers.lock().remove(name);
        Ok(())
    }
}

/// In-memory `BundleServiceClient` that replays a scripted queue of
/// commands on `checkin` and records every call it receives, so tests can
/// assert on what the worker reported without a real server.
#[derive(Default)]
pub struct FakeBundleServiceClient {
    pending_commands: Mutex<VecDeque<ServerCommand>>,
    checkins: Mutex<Vec<CheckinRequest>>,
    finalized: Mutex<Vec<(BundleId, Option<i32>)>>,
    start_bundle_allowed: Mutex<bool>,
}

impl FakeBundleServiceClient {
    pub fn new() -> Self {
        Self { start_bundle_allowed: Mutex::new(true), ..Default::default() }
    }

    pub fn push_command(&self, command: ServerCommand) {
        self.pending_commands.lock().push_back(command);
    }

    pub fn set_start_bundle_allowed(&self, allowed: bool) {
        *self.start_bundle_allowed.lock() = allowed;
    }

    pub fn checkins(&self) -> Vec<CheckinRequest> {
        self.checkins.lock().clone()
    }

    pub fn finalized(&self) -> Vec<(BundleId, Option<i32>)> {
        self.finalized.lock().clone()
    }
}

#[async_trait]
impl BundleServiceClient for FakeBundleServiceClient {
    async fn checkin(
        &self,
        _worker_id: &WorkerId,
        request: &CheckinRequest,
    ) -> Result<Option<ServerCommand>, ServiceClientError> {
        self.checkins.lock().push(request.clone());
        Ok(self.pending_commands.lock().pop_front())
    }

    async fn start_bundle(
        &self,
        _worker_id: &WorkerId,
        _bundle_id: &BundleId,
        _hostname: &str,
        _start_time_epoch_s: u64,
    ) -> Result<bool, ServiceClientError> {
        Ok(*self.start_bundle_allowed.lock())
    }

    async fn finalize_bundle(
        &self,
        _worker_id: &WorkerId,
        bundle_id: &BundleId,
        exitcode: Option<i32>,
        _failure_message: Option<&str>,
        _usage: &ResourceUsage,
    ) -> Result<(), ServiceClientError> {
        self.finalized.lock().push((bundle_id.clone(), exitcode));
        Ok(())
    }

    async fn update_bundle_contents(
        &self,
        _worker_id: &WorkerId,
        _bundle_id: &BundleId,
        _archive_path: &std::path::Path,
    ) -> Result<(), ServiceClientError> {
        Ok(())
    }

    async fn reply(
        &self,
        _worker_id: &WorkerId,
        _socket_id: &str,
        _reply: &Reply,
    ) -> Result<(), ServiceClientError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "fakes_tests.rs"]
mod tests;
