// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's periodic check-in request and the bundle service's reply,
//! grounded in `codalabworker/worker.py`'s `_checkin`/`_checkin` request
//! dict and its dispatch on `response['type']`.

use cw_core::{Bundle, BundleId, DependencyKey, ResourceRequest, RunStage};
use serde::{Deserialize, Serialize};

/// Wire protocol version. Bumped whenever [`CheckinRequest`] or
/// [`ServerCommand`] change shape; the bundle service rejects a check-in
/// whose version it doesn't recognize.
pub const PROTOCOL_VERSION: u32 = 1;

/// What a worker reports about itself and its in-flight work on every
/// check-in tick (§4.5, §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRequest {
    pub version: u32,
    pub tag: Option<String>,
    pub cpus: u32,
    pub gpus: Vec<u32>,
    pub memory_bytes: u64,
    /// Dependency keys this worker already has cached, so the bundle service
    /// can route runs that reuse them back here.
    pub dependencies: Vec<DependencyKey>,
    pub hostname: String,
    /// Every run currently in flight on this worker, with its current
    /// stage and status so the bundle service can observe progress
    /// rather than just presence (spec.md §4.5, §6).
    pub runs: Vec<CheckinRunInfo>,
    /// `None` once the worker has requested graceful shutdown: the bundle
    /// service should stop scheduling new runs here (SPEC_FULL §4.5).
    pub slots_available: Option<u32>,
}

/// One run's entry in a check-in's `runs` list: `{uuid, stage, info}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRunInfo {
    pub uuid: BundleId,
    pub stage: RunStage,
    pub info: String,
}

/// A command the bundle service sends back in response to a check-in.
///
/// Closed enum replacing the original's `response['type']` string dispatch
/// (`run`/`read`/`write`/`netcat`/`kill`), per REDESIGN FLAGS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerCommand {
    Run { bundle: Bundle, resources: ResourceRequest },
    Read { uuid: BundleId, socket_id: String, path: String, read_args: serde_json::Value },
    Write { uuid: BundleId, socket_id: String, subpath: String, string: String },
    Netcat { uuid: BundleId, socket_id: String, port: u16, message: String },
    Kill { uuid: BundleId, socket_id: String },
}

#[cfg(test)]
#[path = "checkin_tests.rs"]
mod tests;
