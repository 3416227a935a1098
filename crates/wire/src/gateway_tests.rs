// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn gateway_connect_round_trips() {
    let connect = GatewayConnect { worker_id: WorkerId::new("wrk-1"), socket_id: SocketId::new() };
    let json = serde_json::to_string(&connect).expect("serialize");
    let back: GatewayConnect = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(connect, back);
}

#[test]
fn connect_response_status_tag() {
    let response = GatewayConnectResponse::WorkerUnavailable;
    let json = serde_json::to_string(&response).expect("serialize");
    assert_eq!(json, "{\"status\":\"worker_unavailable\"}");
}
