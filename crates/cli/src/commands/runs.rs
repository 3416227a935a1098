// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs command handler: lists the bundles this worker currently has
//! in-flight, read straight out of `run-state.json` (§4.1).

use std::path::Path;

use anyhow::Result;
use cw_storage::{RunStateRecord, StateCommitter};
use serde::Serialize;

use crate::output::{handle_list, OutputFormat};

#[derive(Debug, Serialize)]
struct RunSummary {
    bundle_id: String,
    stage: String,
    status_message: String,
}

fn load_record(work_dir: &Path) -> RunStateRecord {
    StateCommitter::<RunStateRecord>::new(work_dir.join("run-state.json")).load(RunStateRecord::default())
}

/// Used by `status::handle` to show an active-run count alongside worker identity.
pub(crate) fn load_run_count(work_dir: &Path) -> usize {
    load_record(work_dir).runs.len()
}

pub fn handle(work_dir: &Path, format: OutputFormat) -> Result<()> {
    let record = load_record(work_dir);
    let mut summaries: Vec<RunSummary> = record
        .runs
        .into_iter()
        .map(|(bundle_id, state)| RunSummary {
            bundle_id: bundle_id.to_string(),
            stage: state.stage.to_string(),
            status_message: state.status_message,
        })
        .collect();
    summaries.sort_by(|a, b| a.bundle_id.cmp(&b.bundle_id));

    handle_list(format, &summaries, "No runs in progress", |items| {
        for run in items {
            println!("{}  {:<16}  {}", run.bundle_id, run.stage, run.status_message);
        }
    })
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
