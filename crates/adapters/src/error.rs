// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors at each adapter trait's public boundary (SPEC_FULL §7).

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to bundle service failed: {0}")]
    Request(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container {0} not found")]
    NotFound(String),

    #[error("docker command failed: {0}")]
    CommandFailed(String),

    #[error("failed to exec docker: {0}")]
    Exec(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceClientError {
    #[error("bundle service rejected the request: {0}")]
    ClientError(String),

    #[error("bundle service request failed: {0}")]
    Request(String),

    #[error("bundle service response could not be parsed: {0}")]
    Decode(String),
}

impl ServiceClientError {
    /// Mirrors `BundleServiceException.client_error`: a 4xx is the caller's
    /// fault and shouldn't be retried by
    /// `Worker::_execute_bundle_service_command_with_retry`'s 6-hour loop.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ClientError(_))
    }
}
