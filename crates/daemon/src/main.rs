// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `workerd`: the worker runtime binary. Parses configuration, then runs
//! the `WorkerLoop` and `ConnectionGateway` concurrently until a shutdown
//! signal arrives (spec.md §4.5 "[ADDED] Graceful exit", §4.6).
//!
//! No entrypoint exists in the example pack to ground this file's overall
//! shape against (no crate in the retrieval defines a `fn main`), so it is
//! synthesized from the `tracing`/`clap` conventions the other crates use
//! and the `WorkerLoop`/`ConnectionGateway` APIs built for SPEC_FULL §4.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cw_adapters::{BundleServiceClient, ContainerRuntime, DockerContainerRuntime, HttpBundleServiceClient, LocalObjectStore, ObjectStore};
use cw_daemon::{Config, ConfigOverrides, ConnectionGateway, WorkerLoop};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Run the worker runtime for a single bundle service.
#[derive(Debug, Parser)]
#[command(name = "workerd", version)]
struct Cli {
    /// Path to a TOML config file (defaults to $CW_CONFIG, if set).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for cache, state, and run workspaces (defaults to $CW_WORK_DIR).
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Bundle service base URL (defaults to $CW_BUNDLE_SERVICE_URL).
    #[arg(long)]
    bundle_service_url: Option<String>,

    /// Worker tag for tag-scoped scheduling.
    #[arg(long)]
    tag: Option<String>,

    /// Number of CPUs to advertise (defaults to available parallelism).
    #[arg(long)]
    cpus: Option<u32>,
}

impl From<Cli> for ConfigOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            work_dir: cli.work_dir,
            bundle_service_url: cli.bundle_service_url,
            tag: cli.tag,
            cpus: cli.cpus,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = match Config::resolve(cli.into()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to resolve configuration");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start the tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "workerd exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), cw_daemon::DaemonError> {
    let hostname = hostname();
    let service_client: Arc<dyn BundleServiceClient> = Arc::new(HttpBundleServiceClient::new(config.bundle_service_url.clone()));
    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(config.work_dir.join("store")));
    let container_runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerContainerRuntime::new());

    let mut worker_loop = WorkerLoop::new(config.clone(), hostname, service_client, store, container_runtime)?;
    info!(worker_id = %worker_loop.worker_id(), "workerd starting");

    let gateway = ConnectionGateway::new(std::time::Duration::from_secs(5));
    let gateway_listener = tokio::net::TcpListener::bind(&config.gateway_bind_addr)
        .await
        .map_err(|e| cw_daemon::GatewayError::Bind(config.gateway_bind_addr.clone(), e))?;
    info!(addr = %config.gateway_bind_addr, "connection gateway listening");

    let shutdown = CancellationToken::new();
    let gateway_shutdown = shutdown.clone();

    let gateway_task = tokio::spawn(async move {
        axum::serve(gateway_listener, gateway.router())
            .with_graceful_shutdown(async move { gateway_shutdown.cancelled().await })
            .await
    });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            signal_shutdown.cancel();
        }
    });

    let loop_result = worker_loop.run_forever(shutdown.clone()).await;
    shutdown.cancel();
    match gateway_task.await {
        Ok(Err(err)) => error!(error = %err, "connection gateway server error"),
        Err(err) => error!(error = %err, "connection gateway task panicked"),
        Ok(Ok(())) => {}
    }
    loop_result
}

fn hostname() -> String {
    hostname_from_env().unwrap_or_else(|| "unknown-worker-host".to_string())
}

fn hostname_from_env() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty())
}
