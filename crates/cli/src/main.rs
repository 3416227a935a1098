// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cw`: a read-only admin inspector for a worker's on-disk state,
//! grounded in the teacher's `oj` CLI's `clap`-derive subcommand layout
//! but reading `cw-storage` state files directly rather than querying a
//! daemon over an admin IPC socket — `workerd` has no such socket.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "cw", version, about = "Inspect a cw-daemon worker's on-disk state")]
struct Cli {
    /// Worker's work directory (defaults to $CW_WORK_DIR).
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the worker's identity, last check-in time, and active run count.
    Status,
    /// List bundles this worker currently has in-flight.
    Runs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let work_dir = cli
        .work_dir
        .or_else(|| std::env::var("CW_WORK_DIR").ok().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("no work directory: pass --work-dir or set CW_WORK_DIR"))?;

    match cli.command {
        Command::Status => commands::status::handle(&work_dir, cli.output),
        Command::Runs => commands::runs::handle(&work_dir, cli.output),
    }
}
