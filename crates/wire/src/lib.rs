// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cw-wire: the worker's wire protocols.
//!
//! Gateway traffic is JSON over HTTP plus raw-byte WebSocket (§6); there is
//! no separate length-prefixed framing layer.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod checkin;
mod gateway;
mod reply;

pub use checkin::{CheckinRequest, CheckinRunInfo, ServerCommand, PROTOCOL_VERSION};
pub use gateway::{GatewayConnect, GatewayConnectResponse};
pub use reply::{Reply, ReplyError};
