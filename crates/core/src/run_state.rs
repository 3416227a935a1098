// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run state: the data a [`crate::bundle::Bundle`] accumulates as it
//! moves through the worker's run state machine (`cw-engine::run`).

use crate::bundle::{Bundle, ResourceUsage};
use crate::simple_display;
use std::path::PathBuf;

/// A stage in the per-run state machine.
///
/// Closed enum standing in for the Python source's string-keyed stage
/// dispatch (`codalabworker/state_committer.py` / `run_manager.py`'s
/// `RunStage` constants); see `cw-engine::run::RunStateMachine` for the
/// `tick()` dispatcher driven by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Preparing,
    Starting,
    Running,
    CleaningUp,
    UploadingResults,
    Finalizing,
    Finished,
}

simple_display! {
    RunStage {
        Preparing => "preparing",
        Starting => "starting",
        Running => "running",
        CleaningUp => "cleaning_up",
        UploadingResults => "uploading_results",
        Finalizing => "finalizing",
        Finished => "finished",
    }
}

impl RunStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Everything the worker tracks for one in-progress run.
///
/// Persisted whole via `cw-storage`'s `StateCommitter<RunState>` on every
/// stage transition (§4.1), so a restarted worker can resume from the last
/// committed stage instead of re-running from scratch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunState {
    pub bundle: Bundle,
    pub stage: RunStage,
    pub status_message: String,
    pub workspace_path: PathBuf,
    pub start_time_ms: Option<u64>,
    pub is_killed: bool,
    pub failure_message: Option<String>,
    /// The container's exit code, set iff the container actually ran
    /// (spec §7): `None` on a failed run (image/dependency/system error
    /// before the command ever started), `Some(code)` on a ready run
    /// regardless of whether `code` is zero.
    pub exitcode: Option<i32>,
    pub usage: ResourceUsage,
    /// Image digest resolved at pull time, reported back to the bundle
    /// service so re-runs can pin the exact image used.
    pub resolved_image_digest: Option<String>,
    pub cpuset: Vec<u32>,
    pub gpuset: Vec<u32>,
}

impl RunState {
    pub fn new(bundle: Bundle, workspace_path: PathBuf) -> Self {
        Self {
            bundle,
            stage: RunStage::Preparing,
            status_message: String::new(),
            workspace_path,
            start_time_ms: None,
            is_killed: false,
            failure_message: None,
            exitcode: None,
            usage: ResourceUsage::default(),
            resolved_image_digest: None,
            cpuset: Vec::new(),
            gpuset: Vec::new(),
        }
    }

    /// Mark the run killed with a human-readable reason, mirroring the
    /// original's `"Time limit Ns exceeded."` / `"Disk limit exceeded."`
    /// diagnostics (SPEC_FULL §4.4).
    pub fn kill(&mut self, reason: impl Into<String>) {
        self.is_killed = true;
        self.failure_message = Some(reason.into());
    }
}

#[cfg(test)]
#[path = "run_state_tests.rs"]
mod tests;
