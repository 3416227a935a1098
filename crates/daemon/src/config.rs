// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration: resource budget, bundle-service address, and
//! on-disk paths, layered the way the teacher's `lifecycle::Config` derives
//! fixed paths from a single root directory (SPEC_FULL §9).
//!
//! Layering, narrowest wins: CLI flag > TOML file > `CW_*` environment
//! variable > built-in default, mirroring `env.rs`'s
//! `OJ_STATE_DIR` > `XDG_STATE_HOME` > `~/.local/state/oj` chain.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a work directory: set --work-dir or CW_WORK_DIR")]
    NoWorkDir,

    #[error("failed to read config file {0}: {1}")]
    ReadFile(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    ParseFile(PathBuf, #[source] toml::de::Error),
}

/// Resolved worker configuration (SPEC_FULL §9 "[ADDED] Configuration").
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub bundle_service_url: String,
    pub dependency_quota_bytes: u64,
    pub image_quota_bytes: u64,
    pub cpus: u32,
    pub gpus: Vec<u32>,
    pub memory_bytes: u64,
    pub free_disk_bytes: u64,
    pub tag: Option<String>,
    pub shared_file_system: bool,
    pub checkin_interval: Duration,
    /// Network prefix used to resolve a run's container for `netcat`
    /// commands. Containers are addressed by name rather than IP: the
    /// gateway connects over the same docker network the worker joins
    /// them to, relying on Docker's embedded DNS instead of an explicit
    /// IP lookup (no such lookup is exposed by `ContainerRuntime`).
    pub network_prefix: String,
    pub gateway_bind_addr: String,
}

impl Config {
    pub fn worker_state_path(&self) -> PathBuf {
        self.work_dir.join("worker-state.json")
    }

    pub fn dependencies_state_path(&self) -> PathBuf {
        self.work_dir.join("dependencies-state.json")
    }

    pub fn images_state_path(&self) -> PathBuf {
        self.work_dir.join("images-state.json")
    }

    pub fn run_state_path(&self) -> PathBuf {
        self.work_dir.join("run-state.json")
    }
}

/// Every field optional, so a TOML file only needs to mention what it
/// overrides; unset fields fall through to the environment/default layer.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct FileConfig {
    work_dir: Option<PathBuf>,
    bundle_service_url: Option<String>,
    dependency_quota_bytes: Option<u64>,
    image_quota_bytes: Option<u64>,
    cpus: Option<u32>,
    gpus: Option<Vec<u32>>,
    memory_bytes: Option<u64>,
    free_disk_bytes: Option<u64>,
    tag: Option<String>,
    shared_file_system: Option<bool>,
    checkin_interval_secs: Option<u64>,
    network_prefix: Option<String>,
    gateway_bind_addr: Option<String>,
}

/// CLI overrides, parsed with `clap` in `main.rs` and handed to
/// [`Config::resolve`]. Kept as a plain struct (rather than deriving
/// `clap::Parser` here) so this module stays free of the `clap` attribute
/// macros and `main.rs` owns the full argument surface.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub bundle_service_url: Option<String>,
    pub tag: Option<String>,
    pub cpus: Option<u32>,
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

impl Config {
    /// Resolve the final configuration from overrides, an optional TOML
    /// file, `CW_*` environment variables, and built-in defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let config_path = overrides.config_path.clone().or_else(|| env_path("CW_CONFIG"));
        let file = match &config_path {
            Some(path) => load_file_config(path)?,
            None => FileConfig::default(),
        };

        let work_dir = overrides
            .work_dir
            .or_else(|| file.work_dir.clone())
            .or_else(|| env_path("CW_WORK_DIR"))
            .ok_or(ConfigError::NoWorkDir)?;

        let bundle_service_url = overrides
            .bundle_service_url
            .or_else(|| file.bundle_service_url.clone())
            .or_else(|| env_string("CW_BUNDLE_SERVICE_URL"))
            .unwrap_or_else(|| "http://localhost:2900".to_string());

        Ok(Self {
            work_dir,
            bundle_service_url,
            dependency_quota_bytes: file.dependency_quota_bytes.unwrap_or(u64::MAX),
            image_quota_bytes: file.image_quota_bytes.unwrap_or(u64::MAX),
            cpus: overrides.cpus.or(file.cpus).unwrap_or_else(default_cpus),
            gpus: file.gpus.unwrap_or_default(),
            memory_bytes: file.memory_bytes.unwrap_or(0),
            free_disk_bytes: file.free_disk_bytes.unwrap_or(0),
            tag: overrides.tag.or(file.tag),
            shared_file_system: file.shared_file_system.unwrap_or(false),
            checkin_interval: Duration::from_secs(file.checkin_interval_secs.unwrap_or(10)),
            network_prefix: file.network_prefix.unwrap_or_else(|| "cw-run-".to_string()),
            gateway_bind_addr: file.gateway_bind_addr.unwrap_or_else(|| "0.0.0.0:9001".to_string()),
        })
    }
}

fn default_cpus() -> u32 {
    std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1)
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::ParseFile(path.to_path_buf(), e))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
