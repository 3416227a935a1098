// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ConnectionGateway` (spec.md §4.6): a WebSocket router that pairs
//! service-initiated byte exchanges with a worker's held outbound socket.
//! Grounded in the axum `WebSocketUpgrade`/split-sink-and-stream pattern
//! used by `golem`'s debugging-service `websocket.rs`, generalized from a
//! single JSON-RPC session to an opaque-byte relay with a round-robin
//! socket pool per worker.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use cw_core::{SocketId, WorkerId, WorkerSocket};
use cw_wire::GatewayConnectResponse;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::GatewayError;

const CHANNEL_CAPACITY: usize = 32;

struct SocketChannels {
    to_worker: mpsc::Sender<Vec<u8>>,
    from_worker: Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>>,
}

struct Registry {
    sockets: HashMap<SocketId, WorkerSocket>,
    channels: HashMap<SocketId, SocketChannels>,
    order: HashMap<WorkerId, VecDeque<SocketId>>,
}

impl Registry {
    fn new() -> Self {
        Self { sockets: HashMap::new(), channels: HashMap::new(), order: HashMap::new() }
    }
}

/// Shared state for the gateway's axum router (SPEC_FULL §4.6).
pub struct ConnectionGateway {
    registry: Mutex<Registry>,
    idle_timeout: Duration,
}

impl ConnectionGateway {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self { registry: Mutex::new(Registry::new()), idle_timeout })
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/worker/:worker_id/:socket_id", get(handle_worker_socket))
            .route("/server/connect/:worker_id", post(handle_server_connect))
            .route("/server/disconnect/:worker_id/:socket_id", post(handle_server_disconnect))
            .route("/send/:worker_id/:socket_id", get(handle_send))
            .route("/recv/:worker_id/:socket_id", get(handle_recv))
            .with_state(Arc::clone(self))
    }

    fn register(&self, worker_id: WorkerId, socket_id: SocketId, channels: SocketChannels) {
        let mut registry = self.registry.lock();
        let socket = WorkerSocket {
            socket_id: socket_id.clone(),
            worker_id: worker_id.clone(),
            available: true,
            last_used: Instant::now(),
            idle_timeout: self.idle_timeout,
        };
        registry.sockets.insert(socket_id.clone(), socket);
        registry.channels.insert(socket_id.clone(), channels);
        registry.order.entry(worker_id).or_default().push_back(socket_id);
    }

    fn unregister(&self, worker_id: &WorkerId, socket_id: &SocketId) {
        let mut registry = self.registry.lock();
        registry.sockets.remove(socket_id);
        registry.channels.remove(socket_id);
        if let Some(order) = registry.order.get_mut(worker_id) {
            order.retain(|id| id != socket_id);
        }
    }

    /// Round-robin over available sockets for `worker_id`, reclaiming any
    /// held past its idle deadline first (§4.6, scenario S6).
    fn connect(&self, worker_id: &WorkerId) -> Result<Option<SocketId>, GatewayError> {
        let mut registry = self.registry.lock();
        let Some(order) = registry.order.get(worker_id).cloned() else {
            return Ok(None);
        };
        let now = Instant::now();
        for socket_id in order.iter() {
            if let Some(socket) = registry.sockets.get(socket_id) {
                if socket.is_idle(now) {
                    warn!(worker = %worker_id, socket = %socket_id, "reclaiming gateway socket past idle timeout");
                }
                if socket.available || socket.is_idle(now) {
                    let chosen = socket_id.clone();
                    if let Some(entry) = registry.sockets.get_mut(&chosen) {
                        entry.available = false;
                        entry.touch(now);
                    }
                    if let Some(order) = registry.order.get_mut(worker_id) {
                        order.retain(|id| id != &chosen);
                        order.push_back(chosen.clone());
                    }
                    return Ok(Some(chosen));
                }
            }
        }
        Ok(None)
    }

    fn disconnect(&self, socket_id: &SocketId) -> Result<(), GatewayError> {
        let mut registry = self.registry.lock();
        let socket = registry.sockets.get_mut(socket_id).ok_or_else(|| GatewayError::SocketNotFound(socket_id.to_string()))?;
        socket.available = true;
        socket.touch(Instant::now());
        Ok(())
    }

    fn channels_for(&self, socket_id: &SocketId) -> Option<(mpsc::Sender<Vec<u8>>, Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>>)> {
        let registry = self.registry.lock();
        registry.channels.get(socket_id).map(|c| (c.to_worker.clone(), Arc::clone(&c.from_worker)))
    }
}

async fn handle_worker_socket(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<ConnectionGateway>>,
    Path((worker_id, socket_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let worker_id = WorkerId::new(worker_id);
    let socket_id = SocketId::from_string(socket_id);
    ws.on_upgrade(move |socket| worker_connection(socket, gateway, worker_id, socket_id))
}

async fn worker_connection(socket: WebSocket, gateway: Arc<ConnectionGateway>, worker_id: WorkerId, socket_id: SocketId) {
    let (to_worker_tx, mut to_worker_rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);
    let (from_worker_tx, from_worker_rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);
    gateway.register(
        worker_id.clone(),
        socket_id.clone(),
        SocketChannels { to_worker: to_worker_tx, from_worker: Arc::new(tokio::sync::Mutex::new(from_worker_rx)) },
    );
    info!(worker = %worker_id, socket = %socket_id, "worker registered a gateway socket");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            outgoing = to_worker_rx.recv() => {
                match outgoing {
                    Some(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Binary(bytes))) => {
                        if from_worker_tx.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(worker = %worker_id, socket = %socket_id, error = %err, "gateway worker socket error");
                        break;
                    }
                }
            }
        }
    }
    gateway.unregister(&worker_id, &socket_id);
    info!(worker = %worker_id, socket = %socket_id, "worker gateway socket closed");
}

#[derive(Debug, Serialize)]
struct ServerConnectResponse {
    status: GatewayConnectResponse,
    socket_id: Option<SocketId>,
}

async fn handle_server_connect(
    State(gateway): State<Arc<ConnectionGateway>>,
    Path(worker_id): Path<String>,
) -> Json<ServerConnectResponse> {
    let worker_id = WorkerId::new(worker_id);
    match gateway.connect(&worker_id) {
        Ok(Some(socket_id)) => Json(ServerConnectResponse { status: GatewayConnectResponse::Connected, socket_id: Some(socket_id) }),
        Ok(None) => Json(ServerConnectResponse { status: GatewayConnectResponse::WorkerUnavailable, socket_id: None }),
        Err(_) => Json(ServerConnectResponse { status: GatewayConnectResponse::WorkerUnavailable, socket_id: None }),
    }
}

async fn handle_server_disconnect(
    State(gateway): State<Arc<ConnectionGateway>>,
    Path((_worker_id, socket_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let socket_id = SocketId::from_string(socket_id);
    match gateway.disconnect(&socket_id) {
        Ok(()) => axum::http::StatusCode::OK,
        Err(GatewayError::SocketNotFound(_)) => axum::http::StatusCode::NOT_FOUND,
        Err(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn handle_send(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<ConnectionGateway>>,
    Path((_worker_id, socket_id)): Path<(String, String)>,
) -> impl IntoResponse {
    bridge_upgrade(ws, gateway, SocketId::from_string(socket_id)).await
}

async fn handle_recv(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<ConnectionGateway>>,
    Path((_worker_id, socket_id)): Path<(String, String)>,
) -> impl IntoResponse {
    // Same byte-pipe as `/send` (§4.6): direction is a caller convention,
    // not something the gateway enforces.
    bridge_upgrade(ws, gateway, SocketId::from_string(socket_id)).await
}

async fn bridge_upgrade(ws: WebSocketUpgrade, gateway: Arc<ConnectionGateway>, socket_id: SocketId) -> axum::response::Response {
    let Some((to_worker, from_worker)) = gateway.channels_for(&socket_id) else {
        return axum::http::StatusCode::NOT_FOUND.into_response();
    };
    ws.on_upgrade(move |socket| bridge(socket, to_worker, from_worker)).into_response()
}

async fn bridge(socket: WebSocket, to_worker: mpsc::Sender<Vec<u8>>, from_worker: Arc<tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>>) {
    let mut from_worker = from_worker.lock().await;
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Binary(bytes))) => {
                        if to_worker.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            outgoing = from_worker.recv() => {
                match outgoing {
                    Some(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
