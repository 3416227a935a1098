// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn url_joins_base_and_path_without_double_slash() {
    let client = HttpBundleServiceClient::new("http://bundles.example/api/");
    assert_eq!(client.url("/workers/wrk-1/checkin"), "http://bundles.example/api/workers/wrk-1/checkin");
}

#[test]
fn classify_4xx_as_client_error() {
    let err = HttpBundleServiceClient::classify(reqwest::StatusCode::BAD_REQUEST, "bad".into());
    assert!(err.is_client_error());
}

#[test]
fn classify_5xx_as_retryable_request_error() {
    let err = HttpBundleServiceClient::classify(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops".into());
    assert!(!err.is_client_error());
}
