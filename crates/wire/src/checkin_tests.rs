// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn checkin_request_round_trips_through_json() {
    let request = CheckinRequest {
        version: PROTOCOL_VERSION,
        tag: Some("gpu".to_string()),
        cpus: 4,
        gpus: vec![0, 1],
        memory_bytes: 1 << 30,
        dependencies: Vec::new(),
        hostname: "worker-1".to_string(),
        runs: vec![CheckinRunInfo {
            uuid: BundleId::from_string("bun-1"),
            stage: RunStage::Running,
            info: "running command".to_string(),
        }],
        slots_available: Some(1),
    };
    let json = serde_json::to_string(&request).expect("serialize");
    let back: CheckinRequest = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(request, back);
}

#[test]
fn server_command_tag_distinguishes_variants() {
    let kill = ServerCommand::Kill { uuid: BundleId::from_string("bun-1"), socket_id: "sck-1".to_string() };
    let json = serde_json::to_string(&kill).expect("serialize");
    assert!(json.contains("\"type\":\"kill\""));
    let back: ServerCommand = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(kill, back);
}
