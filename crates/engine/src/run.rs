// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run state machine, generalizing `fsm.py`'s `State.update()` /
//! `FiniteStateMachine.run()` pattern into a single `tick()` dispatcher
//! over a closed `RunStage` enum instead of per-stage `State` subclasses
//! (REDESIGN FLAGS: no dynamic dispatch on stage-name strings).
//!
//! Stage behavior follows spec.md §4.4 and is grounded in
//! `codalabworker/run_manager.py` (stage list, per-stage responsibilities)
//! and `local_run/docker_image_manager.py`'s resource-polling pattern for
//! the RUNNING stage's enforcement checks.

use cw_adapters::{BundleServiceClient, ContainerRuntime, ContainerSpec, ContainerStatus, ObjectStore};
use cw_core::{BundleId, CacheStage, DependencyKey, RunStage, RunState, WorkerId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dependency_cache::{self, DependencyCache};
use crate::image_cache::{self, ImageCache};
use crate::retry::{retry_with_deadline, DEFAULT_RETRY_DEADLINE, DEFAULT_RETRY_INTERVAL};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("container runtime error: {0}")]
    Container(#[from] cw_adapters::ContainerError),
}

type ResultHandle = JoinHandle<Result<(), String>>;

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// What the WorkerLoop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still in progress; call `tick` again next cycle.
    InProgress,
    /// Reached `FINISHED`; the WorkerLoop should drop this run and report
    /// it to the bundle service.
    Done,
}

/// Drives one [`RunState`] through `RunStage`'s transitions.
///
/// Holds the dependencies/image it has acquired from the shared caches so
/// `CLEANING_UP` can release exactly what `PREPARING` acquired, mirroring
/// `run_manager.py`'s pairing of acquire/release calls across a run's
/// lifetime.
pub struct RunStateMachine {
    pub state: RunState,
    container_name: String,
    work_dir: PathBuf,
    store: Arc<dyn ObjectStore>,
    runtime: Arc<dyn ContainerRuntime>,
    service_client: Arc<dyn BundleServiceClient>,
    worker_id: WorkerId,
    acquired_dependencies: Vec<DependencyKey>,
    acquired_image: bool,
    container_started_at_ms: Option<u64>,
    upload_handle: Option<ResultHandle>,
    finalize_handle: Option<ResultHandle>,
}

impl RunStateMachine {
    pub fn new(
        state: RunState,
        work_dir: PathBuf,
        store: Arc<dyn ObjectStore>,
        runtime: Arc<dyn ContainerRuntime>,
        service_client: Arc<dyn BundleServiceClient>,
        worker_id: WorkerId,
    ) -> Self {
        let container_name = format!("cw-run-{}", state.bundle.id.as_str());
        Self {
            state,
            container_name,
            work_dir,
            store,
            runtime,
            service_client,
            worker_id,
            acquired_dependencies: Vec::new(),
            acquired_image: false,
            container_started_at_ms: None,
            upload_handle: None,
            finalize_handle: None,
        }
    }

    pub fn bundle_id(&self) -> &BundleId {
        &self.state.bundle.id
    }

    /// The name this run's container was started under, for commands
    /// (e.g. `netcat`, SPEC_FULL §4.5) that need to address it directly.
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Set by the WorkerLoop on a `kill` command; checked by every stage
    /// on entry and at the end of `tick` (spec.md §4.4 kill handling).
    pub fn kill(&mut self, reason: impl Into<String>) {
        if !self.state.stage.is_terminal() {
            self.state.kill(reason);
        }
    }

    pub async fn tick(&mut self, dependency_cache: &DependencyCache, image_cache: &ImageCache) -> Result<TickOutcome, RunError> {
        if self.state.is_killed && self.state.stage != RunStage::CleaningUp && !self.state.stage.is_terminal() {
            self.state.stage = RunStage::CleaningUp;
        }

        match self.state.stage {
            RunStage::Preparing => self.tick_preparing(dependency_cache, image_cache),
            RunStage::Starting => self.tick_starting().await,
            RunStage::Running => self.tick_running().await,
            RunStage::CleaningUp => self.tick_cleaning_up(dependency_cache, image_cache).await,
            RunStage::UploadingResults => self.tick_uploading_results().await,
            RunStage::Finalizing => self.tick_finalizing().await,
            RunStage::Finished => Ok(TickOutcome::Done),
        }
    }

    fn tick_preparing(&mut self, dependency_cache: &DependencyCache, image_cache: &ImageCache) -> Result<TickOutcome, RunError> {
        let bundle_id = self.state.bundle.id.clone();

        for dep in &self.state.bundle.dependencies {
            let key = DependencyKey::new(dep.parent.clone(), dep.parent_path.clone());
            if !self.acquired_dependencies.contains(&key) {
                let store = Arc::clone(&self.store);
                let work_dir = self.work_dir.clone();
                dependency_cache.acquire(bundle_id.clone(), key.clone(), move || dependency_cache::spawn_fetch(store, work_dir, key));
                self.acquired_dependencies.push(DependencyKey::new(dep.parent.clone(), dep.parent_path.clone()));
            }
        }

        if !self.acquired_image {
            let runtime = Arc::clone(&self.runtime);
            let image = self.state.bundle.docker_image.clone();
            image_cache.acquire(bundle_id, image.clone(), move || image_cache::spawn_pull(runtime, image));
            self.acquired_image = true;
        }

        let dependency_entries = dependency_cache.all();
        let deps_ready = self.state.bundle.dependencies.iter().all(|dep| {
            let key = DependencyKey::new(dep.parent.clone(), dep.parent_path.clone());
            dependency_entries.iter().any(|e| e.identifier == key && e.stage == CacheStage::Ready)
        });
        let deps_failed = self.state.bundle.dependencies.iter().any(|dep| {
            let key = DependencyKey::new(dep.parent.clone(), dep.parent_path.clone());
            dependency_entries.iter().any(|e| e.identifier == key && e.stage == CacheStage::Failed)
        });

        let image_entries = image_cache.all();
        let image_entry = image_entries.iter().find(|e| e.identifier == self.state.bundle.docker_image);
        let image_ready = image_entry.map(|e| e.stage == CacheStage::Ready).unwrap_or(false);
        let image_failed = image_entry.map(|e| e.stage == CacheStage::Failed).unwrap_or(false);

        if deps_failed || image_failed {
            self.state.failure_message = Some("dependency unavailable".to_string());
            self.state.stage = RunStage::CleaningUp;
        } else if deps_ready && image_ready {
            if let Some(entry) = image_entry {
                self.state.resolved_image_digest = Some(entry.status_message.clone());
            }
            self.state.stage = RunStage::Starting;
        } else {
            self.state.status_message = "waiting on dependencies".to_string();
        }
        Ok(TickOutcome::InProgress)
    }

    async fn tick_starting(&mut self) -> Result<TickOutcome, RunError> {
        if let Err(err) = tokio::fs::create_dir_all(&self.state.workspace_path).await {
            warn!(error = %err, "failed to create run workspace");
            self.state.failure_message = Some(format!("failed to create workspace: {err}"));
            self.state.stage = RunStage::CleaningUp;
            return Ok(TickOutcome::InProgress);
        }

        for dep in self.state.bundle.dependencies.clone() {
            let source = dependency_cache::local_path(&self.work_dir, &DependencyKey::new(dep.parent.clone(), dep.parent_path.clone()));
            let target = self.state.workspace_path.join(&dep.child_path);
            if let Some(parent) = target.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            let _ = tokio::fs::hard_link(&source, &target).await;
        }

        let spec = ContainerSpec {
            name: self.container_name.clone(),
            image: self.state.bundle.docker_image.clone(),
            command: self.state.bundle.command.clone(),
            working_dir: self.state.workspace_path.to_string_lossy().to_string(),
            volumes: vec![(self.state.workspace_path.to_string_lossy().to_string(), "/work".to_string())],
            env: Vec::new(),
            cpus: self.state.bundle.resources.cpus,
            gpus: self.state.gpuset.clone(),
            memory_bytes: self.state.bundle.resources.memory_bytes,
            network: self.state.bundle.resources.network,
        };

        match self.runtime.run(&spec).await {
            Ok(()) => {
                self.container_started_at_ms = Some(now_ms());
                self.state.start_time_ms = self.container_started_at_ms;
                self.state.stage = RunStage::Running;
            }
            Err(err) => {
                self.state.failure_message = Some(format!("failed to start container: {err}"));
                self.state.stage = RunStage::CleaningUp;
            }
        }
        Ok(TickOutcome::InProgress)
    }

    async fn tick_running(&mut self) -> Result<TickOutcome, RunError> {
        if let Ok(stats) = self.runtime.stats(&self.container_name).await {
            self.state.usage.memory_bytes = stats.memory_bytes;
            self.state.usage.disk_bytes = stats.disk_bytes;
        }

        if let Some(started) = self.container_started_at_ms {
            let elapsed_s = now_ms().saturating_sub(started) / 1000;
            self.state.usage.time_seconds = elapsed_s;
            let limit = self.state.bundle.resources.time_seconds;
            if limit > 0 && elapsed_s > limit {
                self.state.kill(format!("Time limit {limit}s exceeded."));
            }
        }

        let disk_limit = self.state.bundle.resources.disk_bytes;
        if disk_limit > 0 && self.state.usage.disk_bytes > disk_limit {
            self.state.kill("Disk limit exceeded.");
        }

        if self.state.is_killed {
            let _ = self.runtime.kill(&self.container_name).await;
            self.state.stage = RunStage::CleaningUp;
            return Ok(TickOutcome::InProgress);
        }

        match self.runtime.inspect(&self.container_name).await {
            Ok(ContainerStatus::Exited { code }) => {
                // A non-zero exit is still `ready`: the command ran and
                // returned a result. Only an inability to run it at all
                // (image/dependency/system error) sets failure_message.
                self.state.exitcode = Some(code);
                self.state.stage = RunStage::CleaningUp;
            }
            Ok(ContainerStatus::Running) => {}
            Err(err) => {
                warn!(error = %err, run = %self.bundle_id(), "container inspect failed");
            }
        }
        Ok(TickOutcome::InProgress)
    }

    async fn tick_cleaning_up(&mut self, dependency_cache: &DependencyCache, image_cache: &ImageCache) -> Result<TickOutcome, RunError> {
        let _ = self.runtime.remove(&self.container_name).await;

        let bundle_id = self.state.bundle.id.clone();
        for key in self.acquired_dependencies.drain(..) {
            dependency_cache.release(&bundle_id, &key);
        }
        if self.acquired_image {
            image_cache.release(&bundle_id, &self.state.bundle.docker_image);
            self.acquired_image = false;
        }

        self.state.stage = RunStage::UploadingResults;
        Ok(TickOutcome::InProgress)
    }

    /// Tar-gzip the workspace and upload it, via a background task polled
    /// each tick the way cache fetch tasks are (SPEC_FULL §4.3, §4.4). The
    /// upload itself retries on server error per `retry::retry_with_deadline`;
    /// a client error or exhausted deadline is recorded as a failure but the
    /// run still proceeds to FINALIZING so the service learns the outcome.
    async fn tick_uploading_results(&mut self) -> Result<TickOutcome, RunError> {
        if self.upload_handle.is_none() {
            let workspace = self.state.workspace_path.clone();
            let archive_path = self.work_dir.join("runs").join(self.bundle_id().as_str()).join("contents.tar.gz");
            let client = Arc::clone(&self.service_client);
            let worker_id = self.worker_id.clone();
            let bundle_id = self.bundle_id().clone();

            self.upload_handle = Some(tokio::spawn(async move {
                let archive_path_clone = archive_path.clone();
                let workspace_clone = workspace.clone();
                tokio::task::spawn_blocking(move || tar_gzip_to_file(&workspace_clone, &archive_path_clone))
                    .await
                    .map_err(|e| e.to_string())?
                    .map_err(|e| e.to_string())?;

                retry_with_deadline(DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_DEADLINE, || {
                    let client = Arc::clone(&client);
                    let worker_id = worker_id.clone();
                    let bundle_id = bundle_id.clone();
                    let archive_path = archive_path.clone();
                    async move { client.update_bundle_contents(&worker_id, &bundle_id, &archive_path).await }
                })
                .await
                .map_err(|e| e.to_string())
            }));
        }

        let still_running = self.upload_handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        if still_running {
            return Ok(TickOutcome::InProgress);
        }

        if let Some(handle) = self.upload_handle.take() {
            let outcome = match handle.await {
                Ok(inner) => inner,
                Err(join_err) => Err(join_err.to_string()),
            };
            if let Err(message) = outcome {
                if self.state.failure_message.is_none() {
                    self.state.failure_message = Some(format!("failed to upload run contents: {message}"));
                }
            }
        }
        self.state.stage = RunStage::Finalizing;
        Ok(TickOutcome::InProgress)
    }

    async fn tick_finalizing(&mut self) -> Result<TickOutcome, RunError> {
        if self.finalize_handle.is_none() {
            let client = Arc::clone(&self.service_client);
            let worker_id = self.worker_id.clone();
            let bundle_id = self.bundle_id().clone();
            let exitcode = self.state.exitcode;
            let failure_message = self.state.failure_message.clone();
            let usage = self.state.usage;

            self.finalize_handle = Some(tokio::spawn(async move {
                retry_with_deadline(DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_DEADLINE, || {
                    let client = Arc::clone(&client);
                    let worker_id = worker_id.clone();
                    let bundle_id = bundle_id.clone();
                    let failure_message = failure_message.clone();
                    async move {
                        client.finalize_bundle(&worker_id, &bundle_id, exitcode, failure_message.as_deref(), &usage).await
                    }
                })
                .await
                .map_err(|e| e.to_string())
            }));
        }

        let still_running = self.finalize_handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        if still_running {
            return Ok(TickOutcome::InProgress);
        }

        if let Some(handle) = self.finalize_handle.take() {
            let outcome = match handle.await {
                Ok(inner) => inner,
                Err(join_err) => Err(join_err.to_string()),
            };
            if let Err(message) = outcome {
                warn!(run = %self.bundle_id(), error = %message, "finalize_bundle ultimately failed");
            }
        }

        self.state.stage = RunStage::Finished;
        info!(run = %self.bundle_id(), killed = self.state.is_killed, "run finished");
        Ok(TickOutcome::Done)
    }
}

/// Materialized dependency paths inside a workspace, recorded so the
/// Reader (§4.7) can hide them from directory listings at the top level.
pub fn shadowed_child_paths(state: &RunState) -> HashMap<String, DependencyKey> {
    state
        .bundle
        .dependencies
        .iter()
        .map(|dep| (dep.child_path.clone(), DependencyKey::new(dep.parent.clone(), dep.parent_path.clone())))
        .collect()
}

/// Resolve `relative` inside `workspace`, rejecting any path that escapes
/// it after symlink resolution (spec.md §4.7 safety contract).
pub fn resolve_in_workspace(workspace: &Path, relative: &str) -> Option<PathBuf> {
    let candidate = workspace.join(relative);
    let canonical_workspace = workspace.canonicalize().ok()?;
    let canonical_candidate = candidate.canonicalize().unwrap_or(candidate);
    if canonical_candidate.starts_with(&canonical_workspace) {
        Some(canonical_candidate)
    } else {
        None
    }
}

/// Tar-gzip `workspace` into a single archive at `dest`, grounded in
/// `file_util.py`'s `tar_gzip_directory` (reimplemented with the `tar`/
/// `flate2` crates instead of shelling out to `tar`). Runs on a blocking
/// thread since it is CPU- and I/O-bound.
fn tar_gzip_to_file(workspace: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(dest)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", workspace)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
