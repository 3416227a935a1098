// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_downloading_has_no_dependents() {
    let entry: CacheEntry<String> = CacheEntry::new_downloading("img:latest".to_string(), 1000);
    assert_eq!(entry.stage, CacheStage::Downloading);
    assert!(entry.dependents.is_empty());
}

#[test]
fn downloading_entry_is_not_evictable() {
    let entry: CacheEntry<String> = CacheEntry::new_downloading("img:latest".to_string(), 1000);
    assert!(!entry.is_evictable());
}

#[test]
fn ready_entry_with_no_dependents_is_evictable() {
    let mut entry: CacheEntry<String> = CacheEntry::new_downloading("img:latest".to_string(), 1000);
    entry.stage = CacheStage::Ready;
    assert!(entry.is_evictable());
}

#[test]
fn ready_entry_with_dependents_is_not_evictable() {
    let mut entry: CacheEntry<String> = CacheEntry::new_downloading("img:latest".to_string(), 1000);
    entry.stage = CacheStage::Ready;
    entry.dependents.insert(BundleId::from_string("bun-1"));
    assert!(!entry.is_evictable());
}

#[test]
fn stage_display_matches_wire_format() {
    assert_eq!(CacheStage::Downloading.to_string(), "downloading");
    assert_eq!(CacheStage::Failed.to_string(), "failed");
}
