// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced at the `cw-storage` boundary.

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("failed to write state file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state for {path}: {source}")]
    Serialize {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize state from {path}: {source}")]
    Deserialize {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
