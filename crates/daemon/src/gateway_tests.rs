// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn dummy_channels() -> SocketChannels {
    let (to_worker, _rx) = mpsc::channel::<Vec<u8>>(1);
    let (_tx, from_worker) = mpsc::channel::<Vec<u8>>(1);
    SocketChannels { to_worker, from_worker: Arc::new(tokio::sync::Mutex::new(from_worker)) }
}

fn gateway(idle_timeout: Duration) -> Arc<ConnectionGateway> {
    ConnectionGateway::new(idle_timeout)
}

#[test]
fn connect_with_no_sockets_returns_none() {
    let gw = gateway(Duration::from_secs(5));
    let result = gw.connect(&WorkerId::new("w1")).expect("connect");
    assert!(result.is_none());
}

#[test]
fn connect_marks_the_chosen_socket_unavailable() {
    let gw = gateway(Duration::from_secs(5));
    let worker_id = WorkerId::new("w1");
    let socket_id = SocketId::new();
    gw.register(worker_id.clone(), socket_id.clone(), dummy_channels());

    let chosen = gw.connect(&worker_id).expect("connect").expect("a socket");
    assert_eq!(chosen, socket_id);
    assert!(!gw.registry.lock().sockets.get(&socket_id).expect("socket").available);
}

#[test]
fn two_connects_in_a_row_return_distinct_sockets() {
    // Scenario S5: worker opens two sockets, service calls connect twice.
    let gw = gateway(Duration::from_secs(5));
    let worker_id = WorkerId::new("w1");
    let a = SocketId::new();
    let b = SocketId::new();
    gw.register(worker_id.clone(), a.clone(), dummy_channels());
    gw.register(worker_id.clone(), b.clone(), dummy_channels());

    let first = gw.connect(&worker_id).expect("connect").expect("a socket");
    let second = gw.connect(&worker_id).expect("connect").expect("a socket");
    assert_ne!(first, second);
}

#[test]
fn disconnect_makes_the_socket_eligible_again() {
    let gw = gateway(Duration::from_secs(5));
    let worker_id = WorkerId::new("w1");
    let socket_id = SocketId::new();
    gw.register(worker_id.clone(), socket_id.clone(), dummy_channels());

    let chosen = gw.connect(&worker_id).expect("connect").expect("a socket");
    assert!(gw.connect(&worker_id).expect("connect").is_none());

    gw.disconnect(&chosen).expect("disconnect");
    let reconnected = gw.connect(&worker_id).expect("connect").expect("a socket");
    assert_eq!(reconnected, chosen);
}

#[tokio::test]
async fn idle_socket_is_reclaimed_after_its_timeout() {
    // Scenario S6: a held-but-undisconnected socket is reclaimable once idle.
    let gw = gateway(Duration::from_millis(20));
    let worker_id = WorkerId::new("w1");
    let socket_id = SocketId::new();
    gw.register(worker_id.clone(), socket_id.clone(), dummy_channels());

    let first = gw.connect(&worker_id).expect("connect").expect("a socket");
    assert_eq!(first, socket_id);

    tokio::time::sleep(Duration::from_millis(40)).await;
    let reclaimed = gw.connect(&worker_id).expect("connect").expect("a socket");
    assert_eq!(reclaimed, socket_id);
}

#[test]
fn unregister_removes_the_socket_from_future_connects() {
    let gw = gateway(Duration::from_secs(5));
    let worker_id = WorkerId::new("w1");
    let socket_id = SocketId::new();
    gw.register(worker_id.clone(), socket_id.clone(), dummy_channels());
    gw.unregister(&worker_id, &socket_id);

    assert!(gw.connect(&worker_id).expect("connect").is_none());
}
