// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bundle_id_accepts_full_uuid() {
    let id = BundleId::from_string("0x1a2b3c4d5e6f7890abcdef1234567890");
    assert_eq!(id.as_str(), "0x1a2b3c4d5e6f7890abcdef1234567890");
}

#[test]
fn bundle_id_round_trips_through_serde() {
    let id = BundleId::from_string("550e8400-e29b-41d4-a716-446655440000");
    let json = serde_json::to_string(&id).expect("serialize");
    let back: BundleId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(id, back);
}

#[test]
fn bundle_state_terminal_states() {
    assert!(BundleState::Ready.is_terminal());
    assert!(BundleState::Failed.is_terminal());
    assert!(BundleState::Killed.is_terminal());
    assert!(!BundleState::Running.is_terminal());
    assert!(!BundleState::Starting.is_terminal());
}

#[test]
fn bundle_state_display_matches_wire_format() {
    assert_eq!(BundleState::WaitingForWorkerStartup.to_string(), "waiting_for_worker_startup");
    assert_eq!(BundleState::WorkerOffline.to_string(), "worker_offline");
}

#[test]
fn resource_request_none_is_zeroed() {
    let r = ResourceRequest::none();
    assert_eq!(r.cpus, 0);
    assert!(r.gpus.is_empty());
    assert!(!r.network);
}
