// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ContainerRuntime`: the seam between the run state machine and the
//! process that actually executes a bundle's command.

use async_trait::async_trait;

use crate::error::ContainerError;

#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: String,
    pub working_dir: String,
    pub volumes: Vec<(String, String)>,
    pub env: Vec<(String, String)>,
    pub cpus: u32,
    pub gpus: Vec<u32>,
    pub memory_bytes: u64,
    pub network: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited { code: i32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

/// Runs and supervises one bundle's command in a container.
///
/// Mirrors the container lifecycle the RUNNING stage drives: pull the
/// image, start the container, poll its status/resource use each tick,
/// and kill/remove it on completion or cancellation — grounded in the
/// `docker run`/`docker rm` subprocess-shelling pattern from the teacher's
/// `DockerAdapter` (see DESIGN.md).
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pull `image` and return its resolved digest.
    async fn pull(&self, image: &str) -> Result<String, ContainerError>;

    async fn run(&self, spec: &ContainerSpec) -> Result<(), ContainerError>;

    async fn inspect(&self, name: &str) -> Result<ContainerStatus, ContainerError>;

    async fn stats(&self, name: &str) -> Result<ContainerStats, ContainerError>;

    async fn kill(&self, name: &str) -> Result<(), ContainerError>;

    async fn remove(&self, name: &str) -> Result<(), ContainerError>;
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
