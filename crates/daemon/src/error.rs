// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors at the daemon's own boundary (SPEC_FULL §7), matching the
//! teacher's per-crate `thiserror` pattern (`oj-daemon::lifecycle::LifecycleError`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("failed to create directory {0}: {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("cache error: {0}")]
    Cache(#[from] cw_engine::CacheError),

    #[error("run error: {0}")]
    Run(#[from] cw_engine::RunError),

    #[error("state commit error: {0}")]
    Commit(#[from] cw_storage::CommitError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Errors at the `ConnectionGateway`'s boundary (spec.md §4.6).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no socket is currently available for worker {0}")]
    NoSocketAvailable(String),

    #[error("socket {0} was not found")]
    SocketNotFound(String),

    #[error("failed to bind gateway listener on {0}: {1}")]
    Bind(String, #[source] std::io::Error),
}
