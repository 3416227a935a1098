// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status command handler: reads the worker's committed state files
//! directly from `work_dir` rather than talking to an admin IPC socket
//! (`workerd` exposes no such socket — its only network surface is the
//! bundle service HTTP client and the gateway WebSocket listener).

use std::path::Path;

use anyhow::Result;
use cw_core::WorkerId;
use cw_storage::{StateCommitter, WorkerStateRecord};
use serde::Serialize;

use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Serialize)]
struct StatusReport {
    worker_id: String,
    last_checkin_ms: u64,
    active_runs: usize,
}

pub fn handle(work_dir: &Path, format: OutputFormat) -> Result<()> {
    let state_path = work_dir.join("worker-state.json");
    if !state_path.exists() {
        println!("No worker state found under {}", work_dir.display());
        return Ok(());
    }

    let committer = StateCommitter::<WorkerStateRecord>::new(state_path);
    let record = committer.load(WorkerStateRecord::new(WorkerId::new("unknown")));
    let active_runs = crate::commands::runs::load_run_count(work_dir);

    let report =
        StatusReport { worker_id: record.worker_id.to_string(), last_checkin_ms: record.last_checkin_ms, active_runs };

    format_or_json(format, &report, || {
        println!("Worker: {}", report.worker_id);
        println!("Last check-in: {} ms since epoch", report.last_checkin_ms);
        println!("Active runs: {}", report.active_runs);
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
