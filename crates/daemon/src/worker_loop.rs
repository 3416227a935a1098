// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level per-worker loop (spec.md §4.5): tick every active run,
//! persist state, check in, and dispatch whatever command comes back.
//! Grounded in `codalabworker/worker.py`'s `Worker.run()` main loop and
//! its `_checkin`/`_process_command` pair, generalized per REDESIGN FLAGS
//! into a single `WorkerLoop` struct rather than module-level globals.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cw_adapters::{BundleServiceClient, ContainerRuntime, ObjectStore};
use cw_core::{BundleId, RunState, WorkerId};
use cw_engine::{
    dependency_cache, image_cache, read, resolve_in_workspace, shadowed_child_paths, CacheConfig, DependencyCache,
    ImageCache, ReadArgs, RunStateMachine, TickOutcome,
};
use cw_storage::{CommitError, RunStateRecord, StateCommitter, Versioned, WorkerStateRecord};
use cw_wire::{CheckinRequest, CheckinRunInfo, Reply, ReplyError, ServerCommand, PROTOCOL_VERSION};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::DaemonError;

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

fn now_epoch_s() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Failed check-ins back off to a flat 1s retry rather than compounding
/// (spec.md §4.5).
const CHECKIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub struct WorkerLoop {
    config: Config,
    worker_id: WorkerId,
    hostname: String,
    service_client: Arc<dyn BundleServiceClient>,
    store: Arc<dyn ObjectStore>,
    runtime: Arc<dyn ContainerRuntime>,
    dependency_cache: DependencyCache,
    image_cache: ImageCache,
    runs: HashMap<BundleId, RunStateMachine>,
    worker_state: StateCommitter<WorkerStateRecord>,
    run_state: StateCommitter<RunStateRecord>,
    accepting_new_runs: bool,
}

impl WorkerLoop {
    /// Build a `WorkerLoop`, resuming cached entries and in-flight runs
    /// from whatever was last committed under `config.work_dir` (§4.1).
    pub fn new(
        config: Config,
        hostname: String,
        service_client: Arc<dyn BundleServiceClient>,
        store: Arc<dyn ObjectStore>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| DaemonError::CreateDir(config.work_dir.clone(), e))?;
        std::fs::create_dir_all(config.work_dir.join("runs"))
            .map_err(|e| DaemonError::CreateDir(config.work_dir.join("runs"), e))?;

        let worker_state = StateCommitter::new(config.worker_state_path());
        let worker_record = worker_state.load(WorkerStateRecord::new(mint_worker_id(&hostname)));
        let worker_id = worker_record.worker_id.clone();
        worker_state.commit(&worker_record)?;

        let dep_committer = StateCommitter::new(config.dependencies_state_path());
        let dep_record = dep_committer.load(cw_storage::DependenciesStateRecord::default());
        let dependency_cache = dependency_cache::new_dependency_cache(
            dep_committer,
            dep_record.entries,
            CacheConfig { quota_bytes: config.dependency_quota_bytes, ..CacheConfig::default() },
        );

        let img_committer = StateCommitter::new(config.images_state_path());
        let img_record = img_committer.load(cw_storage::ImagesStateRecord::default());
        let image_cache = image_cache::new_image_cache(
            img_committer,
            img_record.entries,
            CacheConfig { quota_bytes: config.image_quota_bytes, ..CacheConfig::default() },
        );

        let run_state = StateCommitter::new(config.run_state_path());
        let run_record = run_state.load(RunStateRecord::default());
        let mut runs = HashMap::new();
        for (bundle_id, state) in run_record.runs {
            let machine = RunStateMachine::new(
                state,
                config.work_dir.clone(),
                Arc::clone(&store),
                Arc::clone(&runtime),
                Arc::clone(&service_client),
                worker_id.clone(),
            );
            runs.insert(bundle_id, machine);
        }
        if !runs.is_empty() {
            info!(count = runs.len(), "resumed in-flight runs from run-state.json");
        }

        Ok(Self {
            config,
            worker_id,
            hostname,
            service_client,
            store,
            runtime,
            dependency_cache,
            image_cache,
            runs,
            worker_state,
            run_state,
            accepting_new_runs: true,
        })
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Drive the loop until `shutdown` is triggered and every in-flight run
    /// has reached `FINISHED` (SPEC_FULL §4.5 "[ADDED] Graceful exit").
    pub async fn run_forever(&mut self, shutdown: CancellationToken) -> Result<(), DaemonError> {
        loop {
            self.tick_runs().await?;
            self.dependency_cache.tick().await;
            self.image_cache.tick().await;
            self.persist_run_state()?;

            if shutdown.is_cancelled() {
                self.accepting_new_runs = false;
            }

            let sleep_duration = match self.checkin().await {
                Ok(Some(command)) => {
                    self.dispatch(command).await;
                    self.config.checkin_interval
                }
                Ok(None) => self.config.checkin_interval,
                Err(err) => {
                    warn!(error = %err, "check-in failed");
                    CHECKIN_RETRY_INTERVAL
                }
            };

            if shutdown.is_cancelled() && self.runs.is_empty() {
                // Final checkout-equivalent check-in so the bundle service
                // learns this worker is gone before the process exits.
                let _ = self.checkin().await;
                info!("worker loop drained, exiting");
                return Ok(());
            }

            tokio::time::sleep(sleep_duration).await;
        }
    }

    async fn tick_runs(&mut self) -> Result<(), DaemonError> {
        let mut finished = Vec::new();
        for (bundle_id, machine) in self.runs.iter_mut() {
            match machine.tick(&self.dependency_cache, &self.image_cache).await {
                Ok(TickOutcome::Done) => finished.push(bundle_id.clone()),
                Ok(TickOutcome::InProgress) => {}
                Err(err) => warn!(bundle = %bundle_id, error = %err, "run tick failed"),
            }
        }
        for bundle_id in finished {
            self.runs.remove(&bundle_id);
        }
        Ok(())
    }

    fn persist_run_state(&self) -> Result<(), CommitError> {
        let runs: HashMap<BundleId, RunState> =
            self.runs.iter().map(|(id, machine)| (id.clone(), machine.state.clone())).collect();
        self.run_state.commit(&RunStateRecord { schema_version: RunStateRecord::SCHEMA_VERSION, runs })?;

        let worker_record = WorkerStateRecord {
            schema_version: WorkerStateRecord::SCHEMA_VERSION,
            worker_id: self.worker_id.clone(),
            last_checkin_ms: now_ms(),
        };
        self.worker_state.commit(&worker_record)
    }

    async fn checkin(&self) -> Result<Option<ServerCommand>, cw_adapters::ServiceClientError> {
        let request = CheckinRequest {
            version: PROTOCOL_VERSION,
            tag: self.config.tag.clone(),
            cpus: self.config.cpus,
            gpus: self.config.gpus.clone(),
            memory_bytes: self.config.memory_bytes,
            dependencies: self.dependency_cache.all().into_iter().map(|e| e.identifier).collect(),
            hostname: self.hostname.clone(),
            runs: self
                .runs
                .values()
                .map(|machine| CheckinRunInfo {
                    uuid: machine.bundle_id().clone(),
                    stage: machine.state.stage,
                    info: machine.state.status_message.clone(),
                })
                .collect(),
            slots_available: if self.accepting_new_runs { Some(1) } else { None },
        };
        self.service_client.checkin(&self.worker_id, &request).await
    }

    async fn dispatch(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Run { mut bundle, resources } => {
                if !self.accepting_new_runs {
                    info!(bundle = %bundle.id, "declining new run, worker is shutting down");
                    return;
                }
                bundle.resources = resources;
                let bundle_id = bundle.id.clone();
                let start_time = now_epoch_s();
                match self.service_client.start_bundle(&self.worker_id, &bundle_id, &self.hostname, start_time).await
                {
                    Ok(true) => {
                        let workspace_path = self.config.work_dir.join("runs").join(bundle_id.as_str());
                        let state = RunState::new(bundle, workspace_path);
                        let machine = RunStateMachine::new(
                            state,
                            self.config.work_dir.clone(),
                            Arc::clone(&self.store),
                            Arc::clone(&self.runtime),
                            Arc::clone(&self.service_client),
                            self.worker_id.clone(),
                        );
                        self.runs.insert(bundle_id, machine);
                    }
                    Ok(false) => {
                        info!(bundle = %bundle_id, "bundle service declined claim, already reassigned");
                    }
                    Err(err) => {
                        warn!(bundle = %bundle_id, error = %err, "start_bundle call failed");
                    }
                }
            }
            ServerCommand::Read { uuid, socket_id, path, read_args } => {
                self.dispatch_read(uuid, socket_id, path, read_args).await;
            }
            ServerCommand::Write { uuid, socket_id, subpath, string } => {
                self.dispatch_write(uuid, socket_id, subpath, string).await;
            }
            ServerCommand::Netcat { uuid, socket_id, port, message } => {
                self.dispatch_netcat(uuid, socket_id, port, message).await;
            }
            ServerCommand::Kill { uuid, socket_id: _ } => {
                if let Some(machine) = self.runs.get_mut(&uuid) {
                    machine.kill("killed by bundle service");
                } else {
                    warn!(bundle = %uuid, "kill requested for a run this worker doesn't have");
                }
            }
        }
    }

    async fn reply_bundle_gone(&self, socket_id: &str) {
        let reply = Reply::Error { error: ReplyError::bundle_no_longer_running() };
        if let Err(err) = self.service_client.reply(&self.worker_id, socket_id, &reply).await {
            warn!(error = %err, "failed to report bundle-no-longer-running");
        }
    }

    async fn dispatch_read(&self, uuid: BundleId, socket_id: String, path: String, read_args: serde_json::Value) {
        let Some(run) = self.runs.get(&uuid) else {
            self.reply_bundle_gone(&socket_id).await;
            return;
        };
        let workspace = run.state.workspace_path.clone();
        let shadowed = shadowed_child_paths(&run.state);
        let client = Arc::clone(&self.service_client);
        let worker_id = self.worker_id.clone();

        tokio::spawn(async move {
            let reply = match serde_json::from_value::<ReadArgs>(read_args) {
                Ok(args) => match read(&workspace, &path, &shadowed, args) {
                    Ok(outcome) => reply_for_read(outcome),
                    Err(err) => bad_request_reply(err.to_string()),
                },
                Err(err) => bad_request_reply(format!("invalid read args: {err}")),
            };
            if let Err(err) = client.reply(&worker_id, &socket_id, &reply).await {
                warn!(error = %err, "failed to send read reply");
            }
        });
    }

    async fn dispatch_write(&self, uuid: BundleId, socket_id: String, subpath: String, contents: String) {
        let Some(run) = self.runs.get(&uuid) else {
            self.reply_bundle_gone(&socket_id).await;
            return;
        };

        let top_level = subpath.split('/').next().unwrap_or(subpath.as_str());
        if shadowed_child_paths(&run.state).contains_key(top_level) {
            warn!(bundle = %uuid, subpath, "refusing to write a dependency-shadowed path");
            return;
        }
        let Some(target) = resolve_in_workspace(&run.state.workspace_path, &subpath) else {
            warn!(bundle = %uuid, subpath, "write target escapes the workspace, rejecting");
            return;
        };
        if let Some(parent) = target.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(err) = tokio::fs::write(&target, contents.as_bytes()).await {
            warn!(bundle = %uuid, error = %err, "failed to write run file");
        }
    }

    async fn dispatch_netcat(&self, uuid: BundleId, socket_id: String, port: u16, message: String) {
        let Some(run) = self.runs.get(&uuid) else {
            self.reply_bundle_gone(&socket_id).await;
            return;
        };
        let container_name = run.container_name().to_string();
        let client = Arc::clone(&self.service_client);
        let worker_id = self.worker_id.clone();

        tokio::spawn(async move {
            let reply = match netcat_roundtrip(&container_name, port, &message).await {
                Ok(response) => Reply::Message { message: serde_json::json!({ "response": response }) },
                Err(err) => {
                    Reply::Error { error: ReplyError { error_code: 502, error_message: err.to_string() } }
                }
            };
            if let Err(err) = client.reply(&worker_id, &socket_id, &reply).await {
                warn!(error = %err, "failed to send netcat reply");
            }
        });
    }
}

fn bad_request_reply(message: String) -> Reply {
    Reply::Error { error: ReplyError { error_code: 400, error_message: message } }
}

fn reply_for_read(outcome: cw_engine::ReadReply) -> Reply {
    match outcome {
        cw_engine::ReadReply::TargetInfo(node) => {
            Reply::Message { message: serde_json::to_value(node).unwrap_or(serde_json::Value::Null) }
        }
        cw_engine::ReadReply::Bytes(bytes) => {
            Reply::MessageWithData { message: serde_json::Value::Null, data_length: bytes.len() as u64 }
        }
        cw_engine::ReadReply::Text(text) => {
            Reply::Message { message: serde_json::json!({ "text": text }) }
        }
    }
}

/// Connects to a run's container by name, relying on Docker's embedded DNS
/// rather than an IP lookup `ContainerRuntime` doesn't expose.
async fn netcat_roundtrip(container_name: &str, port: u16, message: &str) -> std::io::Result<String> {
    let mut stream = tokio::net::TcpStream::connect((container_name, port)).await?;
    stream.write_all(message.as_bytes()).await?;
    stream.shutdown().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

fn mint_worker_id(hostname: &str) -> WorkerId {
    WorkerId::new(format!("{hostname}-{}", nanoid::nanoid!(8)))
}

#[cfg(test)]
#[path = "worker_loop_tests.rs"]
mod tests;
