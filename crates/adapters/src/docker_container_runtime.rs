// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ContainerRuntime` implementation that shells out to the `docker` CLI,
//! following the subprocess-invocation pattern in the teacher's
//! `DockerAdapter::run_docker` (`crates/daemon/src/adapters/agent/docker/mod.rs`).

use async_trait::async_trait;
use serde_json::Value;

use crate::container::{ContainerRuntime, ContainerSpec, ContainerStats, ContainerStatus};
use crate::error::ContainerError;

#[derive(Debug, Clone, Default)]
pub struct DockerContainerRuntime;

impl DockerContainerRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerRuntime for DockerContainerRuntime {
    async fn pull(&self, image: &str) -> Result<String, ContainerError> {
        run_docker(&["pull", image]).await?;
        let digest = run_docker(&[
            "image",
            "inspect",
            image,
            "--format",
            "{{index .RepoDigests 0}}",
        ])
        .await
        .unwrap_or_else(|_| image.to_string());
        tracing::info!(image, digest = %digest, "pulled image");
        Ok(digest)
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<(), ContainerError> {
        let mut args: Vec<String> =
            vec!["run".into(), "-d".into(), "--name".into(), spec.name.clone()];

        args.push("--cpus".into());
        args.push(spec.cpus.max(1).to_string());

        if !spec.gpus.is_empty() {
            let devices = spec.gpus.iter().map(|g| g.to_string()).collect::<Vec<_>>().join(",");
            args.push("--gpus".into());
            args.push(format!("device={devices}"));
        }

        if spec.memory_bytes > 0 {
            args.push("--memory".into());
            args.push(spec.memory_bytes.to_string());
        }

        if !spec.network {
            args.push("--network".into());
            args.push("none".into());
        }

        for (host, container) in &spec.volumes {
            args.push("-v".into());
            args.push(format!("{host}:{container}"));
        }

        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }

        args.push("-w".into());
        args.push(spec.working_dir.clone());
        args.push(spec.image.clone());
        args.push("bash".into());
        args.push("-c".into());
        args.push(spec.command.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::info!(name = %spec.name, image = %spec.image, "starting container");
        run_docker(&arg_refs).await?;
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<ContainerStatus, ContainerError> {
        let output = run_docker(&[
            "inspect",
            name,
            "--format",
            "{{.State.Running}} {{.State.ExitCode}}",
        ])
        .await?;

        let mut parts = output.split_whitespace();
        let running = parts.next() == Some("true");
        if running {
            return Ok(ContainerStatus::Running);
        }
        let code = parts.next().and_then(|s| s.parse().ok()).unwrap_or(-1);
        Ok(ContainerStatus::Exited { code })
    }

    async fn stats(&self, name: &str) -> Result<ContainerStats, ContainerError> {
        let output = run_docker(&[
            "stats",
            name,
            "--no-stream",
            "--format",
            "{{json .}}",
        ])
        .await?;

        let parsed: Value = serde_json::from_str(output.trim())
            .map_err(|err| ContainerError::CommandFailed(format!("stats parse error: {err}")))?;

        let memory_bytes = parsed
            .get("MemUsage")
            .and_then(Value::as_str)
            .and_then(|usage| usage.split('/').next())
            .map(parse_byte_size)
            .unwrap_or(0);

        Ok(ContainerStats { memory_bytes, disk_bytes: 0 })
    }

    async fn kill(&self, name: &str) -> Result<(), ContainerError> {
        run_docker(&["kill", name]).await.map(drop)
    }

    async fn remove(&self, name: &str) -> Result<(), ContainerError> {
        run_docker(&["rm", "-f", name]).await.map(drop)
    }
}

/// Parse docker's human-readable size strings (`"12.3MiB"`) into bytes.
fn parse_byte_size(s: &str) -> u64 {
    let s = s.trim();
    let split_at = s.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(s.len());
    let (number, unit) = s.split_at(split_at);
    let number: f64 = number.parse().unwrap_or(0.0);
    let multiplier: f64 = match unit.trim() {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    };
    (number * multiplier) as u64
}

/// Run a docker CLI command and return trimmed stdout on success.
async fn run_docker(args: &[&str]) -> Result<String, ContainerError> {
    let output = tokio::process::Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(ContainerError::Exec)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ContainerError::CommandFailed(format!(
            "docker {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        )))
    }
}

#[cfg(test)]
#[path = "docker_container_runtime_tests.rs"]
mod tests;
