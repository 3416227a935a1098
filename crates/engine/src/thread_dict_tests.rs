// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn insert_if_new_only_spawns_once() {
    let mut dict: ThreadDict<&str, u32> = ThreadDict::new();
    let spawned = dict.insert_if_new("a", || (tokio::spawn(async { 1u32 }), ()));
    assert!(spawned);
    let spawned_again = dict.insert_if_new("a", || (tokio::spawn(async { 2u32 }), ()));
    assert!(!spawned_again);
    assert_eq!(dict.len(), 1);
}

#[tokio::test]
async fn remove_awaits_and_returns_result() {
    let mut dict: ThreadDict<&str, u32> = ThreadDict::new();
    dict.insert("a", tokio::spawn(async { 42u32 }), ());
    let result = dict.remove(&"a").await;
    assert_eq!(result.expect("tracked").expect("joined"), 42);
    assert!(!dict.contains(&"a"));
}

#[tokio::test]
async fn remove_missing_key_returns_none() {
    let mut dict: ThreadDict<&str, u32> = ThreadDict::new();
    assert!(dict.remove(&"missing").await.is_none());
}

#[tokio::test]
async fn metadata_travels_with_entry() {
    let mut dict: ThreadDict<&str, u32, bool> = ThreadDict::new();
    dict.insert("a", tokio::spawn(async { 1u32 }), true);
    assert_eq!(dict.get(&"a").map(|e| e.meta), Some(true));
}

#[tokio::test]
async fn abort_drops_entry_without_awaiting() {
    let mut dict: ThreadDict<&str, u32> = ThreadDict::new();
    dict.insert(
        "a",
        tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            1u32
        }),
        (),
    );
    dict.abort(&"a");
    assert!(!dict.contains(&"a"));
}
