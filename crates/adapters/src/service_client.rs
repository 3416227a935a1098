// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BundleServiceClient`: the single seam across which a worker talks to
//! the bundle service (§6), grounded in `bundle_service_client.py`'s method
//! set as called from `worker.py` (`checkin`, `start_bundle`,
//! `finalize_bundle`, `update_bundle_contents`, `reply`, `reply_data`).

use async_trait::async_trait;
use cw_core::{BundleId, ResourceUsage, WorkerId};
use cw_wire::{CheckinRequest, Reply, ServerCommand};

use crate::error::ServiceClientError;

#[async_trait]
pub trait BundleServiceClient: Send + Sync {
    /// Report this worker's status and get back at most one command to act on.
    async fn checkin(
        &self,
        worker_id: &WorkerId,
        request: &CheckinRequest,
    ) -> Result<Option<ServerCommand>, ServiceClientError>;

    /// Confirm the bundle is still assigned to this worker before starting it.
    async fn start_bundle(
        &self,
        worker_id: &WorkerId,
        bundle_id: &BundleId,
        hostname: &str,
        start_time_epoch_s: u64,
    ) -> Result<bool, ServiceClientError>;

    /// Report a run's final outcome (spec.md §6, §7): `exitcode` is set iff
    /// the container actually ran (`None` means the worker could not run
    /// the command at all — a failed run, not a non-zero-exit ready run).
    async fn finalize_bundle(
        &self,
        worker_id: &WorkerId,
        bundle_id: &BundleId,
        exitcode: Option<i32>,
        failure_message: Option<&str>,
        usage: &ResourceUsage,
    ) -> Result<(), ServiceClientError>;

    async fn update_bundle_contents(
        &self,
        worker_id: &WorkerId,
        bundle_id: &BundleId,
        archive_path: &std::path::Path,
    ) -> Result<(), ServiceClientError>;

    async fn reply(
        &self,
        worker_id: &WorkerId,
        socket_id: &str,
        reply: &Reply,
    ) -> Result<(), ServiceClientError>;
}
