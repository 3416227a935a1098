// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replies the worker sends back through the bundle service for `read` /
//! `netcat` commands, grounded in `worker.py`'s `reply`/`reply_data` closure
//! and `BUNDLE_NO_LONGER_RUNNING_MESSAGE` handling.

use serde::{Deserialize, Serialize};

/// Error reported back when a `read`/`netcat`/`write` command can't be
/// fulfilled (bundle gone, path missing, I/O failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub error_code: u16,
    pub error_message: String,
}

impl ReplyError {
    pub const BUNDLE_NO_LONGER_RUNNING: &'static str =
        "Bundle is no longer running, can't read/write any files";

    pub fn bundle_no_longer_running() -> Self {
        Self { error_code: 500, error_message: Self::BUNDLE_NO_LONGER_RUNNING.to_string() }
    }
}

/// A worker's reply to a `read`/`netcat` command: either an error, a plain
/// JSON message, or a message with an accompanying byte payload streamed
/// separately over the gateway socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Error { error: ReplyError },
    Message { message: serde_json::Value },
    MessageWithData { message: serde_json::Value, data_length: u64 },
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
