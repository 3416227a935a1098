// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cw-adapters: narrow trait boundaries between the worker runtime and the
//! external world (blob storage, container runtime, bundle service),
//! following the teacher's constructor-injected trait-object pattern
//! instead of monkey-patched globals.

pub mod container;
pub mod docker_container_runtime;
pub mod error;
pub mod http_service_client;
pub mod local_object_store;
pub mod object_store;
pub mod service_client;

#[cfg(any(test, feature = "test-support"))]
pub mod fakes;

pub use container::{ContainerRuntime, ContainerSpec, ContainerStats, ContainerStatus};
pub use docker_container_runtime::DockerContainerRuntime;
pub use error::{ContainerError, ObjectStoreError, ServiceClientError};
pub use http_service_client::HttpBundleServiceClient;
pub use local_object_store::LocalObjectStore;
pub use object_store::{ObjectStat, ObjectStore};
pub use service_client::BundleServiceClient;

#[cfg(any(test, feature = "test-support"))]
pub use fakes::{FakeBundleServiceClient, FakeContainerRuntime, FakeObjectStore};
