// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged with the `ConnectionGateway` (§4.6): on-demand byte
//! streams between the bundle service and a NAT'd worker, brokered by a
//! socket id handed out on check-in.

use cw_core::{SocketId, WorkerId};
use serde::{Deserialize, Serialize};

/// Sent by a worker to open its side of a gateway socket after the bundle
/// service names a `socket_id` in a `read`/`write`/`netcat` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConnect {
    pub worker_id: WorkerId,
    pub socket_id: SocketId,
}

/// Envelope for the gateway's HTTP-facing `/server/connect` response:
/// whether a socket could be brokered at all, before any bytes flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GatewayConnectResponse {
    Connected,
    WorkerUnavailable,
    SocketNotFound,
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
