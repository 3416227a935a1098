// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle data model: the unit of work a worker executes.

use crate::simple_display;

/// Identity of a bundle (equivalently, of the run that executes it).
///
/// Bundle ids are UUIDs minted by the bundle service, not by the worker, so
/// unlike [`crate::worker::WorkerId`] this wraps a plain `String` rather than
/// `id::IdBuf`: `IdBuf`'s 23-byte capacity fits the worker's own
/// prefix-plus-nanoid ids but not a hyphenated UUID's 36 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BundleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BundleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for BundleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for BundleId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Resources a bundle's run command asked for.
///
/// `gpus` names specific device indices rather than a bare count because the
/// container runtime pins `--gpus device=<n>` per run; the original
/// `docker_utils.py` does the same.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceRequest {
    pub cpus: u32,
    pub gpus: Vec<u32>,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
    pub time_seconds: u64,
    pub network: bool,
}

impl ResourceRequest {
    pub fn none() -> Self {
        Self {
            cpus: 0,
            gpus: Vec::new(),
            memory_bytes: 0,
            disk_bytes: 0,
            time_seconds: 0,
            network: false,
        }
    }
}

/// Resource usage reported back to the bundle service on finalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceUsage {
    pub time_seconds: u64,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

/// A single dependency link: `child_path` inside the run's sandbox is backed
/// by `parent_path` inside bundle `parent`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dependency {
    pub parent: BundleId,
    pub parent_path: String,
    pub child_path: String,
}

/// Lifecycle state of a bundle as seen by the worker.
///
/// Mirrors the bundle-service state machine (`codalab/objects/bundle.py`'s
/// `State` constants); the worker only drives the subset from `STARTING`
/// through the terminal states, but carries the upstream states too so it
/// can recognize a bundle that was already finalized by someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleState {
    Uploading,
    Created,
    Staged,
    Making,
    WaitingForWorkerStartup,
    Starting,
    Preparing,
    Running,
    Ready,
    Failed,
    Killed,
    WorkerOffline,
}

simple_display! {
    BundleState {
        Uploading => "uploading",
        Created => "created",
        Staged => "staged",
        Making => "making",
        WaitingForWorkerStartup => "waiting_for_worker_startup",
        Starting => "starting",
        Preparing => "preparing",
        Running => "running",
        Ready => "ready",
        Failed => "failed",
        Killed => "killed",
        WorkerOffline => "worker_offline",
    }
}

impl BundleState {
    /// True once the bundle service considers the bundle finished, win or lose.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Killed)
    }
}

/// A bundle as handed to the worker by the bundle service: a command to run
/// in a container image with a declared resource budget and dependency set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub command: String,
    pub docker_image: String,
    pub resources: ResourceRequest,
    pub dependencies: Vec<Dependency>,
    pub state: BundleState,
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
