// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `reqwest`-based [`BundleServiceClient`], grounded in
//! `bundle_service_client.py`'s REST calls against the `/workers/...`
//! endpoint family (§6).

use async_trait::async_trait;
use cw_core::{BundleId, ResourceUsage, WorkerId};
use cw_wire::{CheckinRequest, Reply, ServerCommand};
use serde_json::json;

use crate::error::ServiceClientError;
use crate::service_client::BundleServiceClient;

pub struct HttpBundleServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBundleServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn classify(status: reqwest::StatusCode, message: String) -> ServiceClientError {
        if status.is_client_error() {
            ServiceClientError::ClientError(message)
        } else {
            ServiceClientError::Request(message)
        }
    }
}

#[async_trait]
impl BundleServiceClient for HttpBundleServiceClient {
    async fn checkin(
        &self,
        worker_id: &WorkerId,
        request: &CheckinRequest,
    ) -> Result<Option<ServerCommand>, ServiceClientError> {
        let response = self
            .client
            .post(self.url(&format!("/workers/{worker_id}/checkin")))
            .json(request)
            .send()
            .await
            .map_err(|err| ServiceClientError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify(status, body));
        }

        if response.content_length() == Some(0) {
            return Ok(None);
        }

        let body = response.text().await.map_err(|err| ServiceClientError::Request(err.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let command: ServerCommand =
            serde_json::from_str(&body).map_err(|err| ServiceClientError::Decode(err.to_string()))?;
        Ok(Some(command))
    }

    async fn start_bundle(
        &self,
        worker_id: &WorkerId,
        bundle_id: &BundleId,
        hostname: &str,
        start_time_epoch_s: u64,
    ) -> Result<bool, ServiceClientError> {
        let response = self
            .client
            .post(self.url(&format!("/workers/{worker_id}/bundles/{bundle_id}/start")))
            .json(&json!({ "hostname": hostname, "start_time": start_time_epoch_s }))
            .send()
            .await
            .map_err(|err| ServiceClientError::Request(err.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn finalize_bundle(
        &self,
        worker_id: &WorkerId,
        bundle_id: &BundleId,
        exitcode: Option<i32>,
        failure_message: Option<&str>,
        usage: &ResourceUsage,
    ) -> Result<(), ServiceClientError> {
        let response = self
            .client
            .post(self.url(&format!("/workers/{worker_id}/bundles/{bundle_id}/finalize")))
            .json(&json!({
                "exitcode": exitcode,
                "failure_message": failure_message,
                "time": usage.time_seconds,
                "memory": usage.memory_bytes,
            }))
            .send()
            .await
            .map_err(|err| ServiceClientError::Request(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify(status, body))
        }
    }

    async fn update_bundle_contents(
        &self,
        worker_id: &WorkerId,
        bundle_id: &BundleId,
        archive_path: &std::path::Path,
    ) -> Result<(), ServiceClientError> {
        let bytes = tokio::fs::read(archive_path)
            .await
            .map_err(|err| ServiceClientError::Request(err.to_string()))?;

        let response = self
            .client
            .put(self.url(&format!("/workers/{worker_id}/bundles/{bundle_id}/contents")))
            .body(bytes)
            .send()
            .await
            .map_err(|err| ServiceClientError::Request(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify(status, body))
        }
    }

    async fn reply(
        &self,
        worker_id: &WorkerId,
        socket_id: &str,
        reply: &Reply,
    ) -> Result<(), ServiceClientError> {
        let response = self
            .client
            .post(self.url(&format!("/workers/{worker_id}/sockets/{socket_id}/reply")))
            .json(reply)
            .send()
            .await
            .map_err(|err| ServiceClientError::Request(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify(status, body))
        }
    }
}

#[cfg(test)]
#[path = "http_service_client_tests.rs"]
mod tests;
