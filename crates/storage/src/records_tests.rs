// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn worker_state_record_round_trips() {
    let record = WorkerStateRecord::new(WorkerId::new("wrk-1"));
    let json = serde_json::to_string(&record).expect("serialize");
    let back: WorkerStateRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(record, back);
}

#[test]
fn dependencies_state_record_defaults_empty() {
    let record = DependenciesStateRecord::default();
    assert!(record.entries.is_empty());
}

#[test]
fn images_state_record_round_trips_with_entries() {
    let mut record = ImagesStateRecord { schema_version: ImagesStateRecord::SCHEMA_VERSION, entries: Vec::new() };
    record.entries.push(CacheEntry::new_downloading("ubuntu:22.04".to_string(), 100));
    let json = serde_json::to_string(&record).expect("serialize");
    let back: ImagesStateRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.entries.len(), 1);
    assert_eq!(back.entries[0].identifier, "ubuntu:22.04");
}

#[test]
fn run_state_record_keys_by_bundle_id() {
    use cw_core::{Bundle, BundleState, ResourceRequest};
    use std::path::PathBuf;

    let bundle = Bundle {
        id: BundleId::from_string("bun-1"),
        command: "echo hi".to_string(),
        docker_image: "ubuntu:22.04".to_string(),
        resources: ResourceRequest::none(),
        dependencies: Vec::new(),
        state: BundleState::Starting,
    };
    let mut record = RunStateRecord { schema_version: RunStateRecord::SCHEMA_VERSION, runs: HashMap::new() };
    record.runs.insert(bundle.id.clone(), RunState::new(bundle, PathBuf::from("/work/bun-1")));

    let json = serde_json::to_string(&record).expect("serialize");
    let back: RunStateRecord = serde_json::from_str(&json).expect("deserialize");
    assert!(back.runs.contains_key(&BundleId::from_string("bun-1")));
}
