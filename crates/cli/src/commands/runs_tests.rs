// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cw_core::{Bundle, BundleId, BundleState, Dependency, RunStage, RunState, ResourceRequest, ResourceUsage};
use cw_storage::Versioned;
use std::collections::HashMap;
use std::path::PathBuf;

fn sample_run_state(id: &str, stage: RunStage) -> RunState {
    let bundle = Bundle {
        id: BundleId::from_string(id),
        command: "echo hi".to_string(),
        docker_image: "ubuntu:22.04".to_string(),
        resources: ResourceRequest::none(),
        dependencies: Vec::<Dependency>::new(),
        state: BundleState::Running,
    };
    let mut state = RunState::new(bundle, PathBuf::from("/work/run"));
    state.stage = stage;
    state.status_message = "running command".to_string();
    state.usage = ResourceUsage::default();
    state
}

#[test]
fn load_run_count_is_zero_with_no_state_file() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(load_run_count(dir.path()), 0);
}

#[test]
fn load_run_count_matches_the_committed_run_map() {
    let dir = tempfile::tempdir().unwrap();
    let mut runs = HashMap::new();
    runs.insert(BundleId::from_string("bnd-1"), sample_run_state("bnd-1", RunStage::Running));
    runs.insert(BundleId::from_string("bnd-2"), sample_run_state("bnd-2", RunStage::Preparing));
    let record = RunStateRecord { schema_version: RunStateRecord::SCHEMA_VERSION, runs };
    StateCommitter::<RunStateRecord>::new(dir.path().join("run-state.json")).commit(&record).unwrap();

    assert_eq!(load_run_count(dir.path()), 2);
}

#[test]
fn handle_succeeds_with_no_runs() {
    let dir = tempfile::tempdir().unwrap();
    assert!(handle(dir.path(), OutputFormat::Text).is_ok());
}

#[test]
fn handle_succeeds_with_committed_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut runs = HashMap::new();
    runs.insert(BundleId::from_string("bnd-1"), sample_run_state("bnd-1", RunStage::Finished));
    let record = RunStateRecord { schema_version: RunStateRecord::SCHEMA_VERSION, runs };
    StateCommitter::<RunStateRecord>::new(dir.path().join("run-state.json")).commit(&record).unwrap();

    assert!(handle(dir.path(), OutputFormat::Json).is_ok());
}
