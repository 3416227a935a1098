// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn container_stats_default_is_zeroed() {
    let stats = ContainerStats::default();
    assert_eq!(stats.memory_bytes, 0);
    assert_eq!(stats.disk_bytes, 0);
}

#[test]
fn container_status_equality() {
    assert_eq!(ContainerStatus::Exited { code: 0 }, ContainerStatus::Exited { code: 0 });
    assert_ne!(ContainerStatus::Exited { code: 0 }, ContainerStatus::Exited { code: 1 });
    assert_ne!(ContainerStatus::Running, ContainerStatus::Exited { code: 0 });
}
