// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy for bundle-service calls that report results, grounded in
//! `worker.py`'s `_execute_bundle_service_command_with_retry`: retry every
//! 30s on a server-side error, up to a fixed deadline (default 6 hours);
//! a client-side error is surfaced immediately.

use cw_adapters::ServiceClientError;
use std::time::Duration;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_DEADLINE: Duration = Duration::from_secs(6 * 60 * 60);

pub async fn retry_with_deadline<F, Fut>(
    interval: Duration,
    deadline: Duration,
    mut attempt: F,
) -> Result<(), ServiceClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), ServiceClientError>>,
{
    let start = tokio::time::Instant::now();
    loop {
        match attempt().await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_client_error() => return Err(err),
            Err(err) => {
                if start.elapsed() >= deadline {
                    return Err(err);
                }
                tracing::warn!(error = %err, "bundle service call failed, retrying");
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
