// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cw_adapters::FakeContainerRuntime;

#[tokio::test]
async fn spawn_pull_resolves_digest_via_runtime() {
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(FakeContainerRuntime::new());
    let outcome = spawn_pull(runtime, "ubuntu:22.04".to_string()).await.expect("join").expect("pull");
    assert_eq!(outcome.message.as_deref(), Some("ubuntu:22.04@sha256:fake"));
}
