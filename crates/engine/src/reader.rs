// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateless translator from a read request into bytes, per spec.md
//! §4.7. Grounded in `run_manager.py`'s `Reader.read` dispatch (the five
//! `read_type` variants) and `file_util.py`'s `tar_gzip_directory` /
//! `summarize_file`, reimplemented with the `tar`/`flate2` crates instead
//! of shelling out to `tar`/`gzip` subprocesses.

use cw_core::DependencyKey;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level names in a run's workspace backed by a hard-linked dependency,
/// as returned by [`crate::run::shadowed_child_paths`]. `get_target_info`
/// and `stream_directory` hide these at the workspace root so a directory
/// listing only shows files the run itself produced, matching
/// `run_manager.py`'s `Reader`'s treatment of dependency mount points.
pub type ShadowedPaths = HashMap<String, DependencyKey>;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parsed form of `ServerCommand::Read`'s opaque `read_args`, dispatched
/// by `"type"` the way `run_manager.py`'s `Reader.read` does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadArgs {
    GetTargetInfo { depth: u32 },
    StreamDirectory,
    StreamFile,
    ReadFileSection { offset: u64, length: u64 },
    SummarizeFile { head_lines: usize, tail_lines: usize, max_line_length: usize, truncation_text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfoNode {
    pub name: String,
    pub is_directory: bool,
    pub size_bytes: u64,
    pub children: Vec<TargetInfoNode>,
}

pub enum ReadReply {
    TargetInfo(TargetInfoNode),
    Bytes(Vec<u8>),
    Text(String),
}

/// Resolve `path` inside `workspace`, rejecting traversal outside it
/// after symlink resolution.
fn safe_path(workspace: &Path, path: &str) -> Result<PathBuf, ReaderError> {
    let candidate = workspace.join(path);
    let canonical_workspace =
        workspace.canonicalize().map_err(|_| ReaderError::BadRequest("workspace does not exist".to_string()))?;
    let canonical = candidate.canonicalize().unwrap_or(candidate);
    if canonical.starts_with(&canonical_workspace) {
        Ok(canonical)
    } else {
        Err(ReaderError::BadRequest(format!("path {path} escapes the workspace")))
    }
}

pub fn read(
    workspace: &Path,
    path: &str,
    shadowed_top_level: &ShadowedPaths,
    args: ReadArgs,
) -> Result<ReadReply, ReaderError> {
    let resolved = safe_path(workspace, path)?;
    match args {
        ReadArgs::GetTargetInfo { depth } => Ok(ReadReply::TargetInfo(get_target_info(&resolved, depth, shadowed_top_level)?)),
        ReadArgs::StreamDirectory => Ok(ReadReply::Bytes(stream_directory(&resolved, shadowed_top_level)?)),
        ReadArgs::StreamFile => Ok(ReadReply::Bytes(stream_file(&resolved)?)),
        ReadArgs::ReadFileSection { offset, length } => Ok(ReadReply::Bytes(read_file_section(&resolved, offset, length)?)),
        ReadArgs::SummarizeFile { head_lines, tail_lines, max_line_length, truncation_text } => {
            Ok(ReadReply::Text(summarize_file(&resolved, head_lines, tail_lines, max_line_length, &truncation_text)?))
        }
    }
}

fn get_target_info(path: &Path, depth: u32, shadowed_top_level: &ShadowedPaths) -> Result<TargetInfoNode, ReaderError> {
    build_node(path, path, depth, shadowed_top_level)
}

fn build_node(root: &Path, path: &Path, depth: u32, shadowed_top_level: &ShadowedPaths) -> Result<TargetInfoNode, ReaderError> {
    let meta = std::fs::metadata(path)?;
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let mut children = Vec::new();

    if meta.is_dir() && depth > 0 {
        let mut entries: Vec<_> = std::fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            if path == root {
                let entry_name = entry.file_name().to_string_lossy().to_string();
                if shadowed_top_level.contains_key(&entry_name) {
                    continue;
                }
            }
            children.push(build_node(root, &entry.path(), depth - 1, shadowed_top_level)?);
        }
    }

    Ok(TargetInfoNode { name, is_directory: meta.is_dir(), size_bytes: meta.len(), children })
}

fn stream_directory(path: &Path, shadowed_top_level: &ShadowedPaths) -> Result<Vec<u8>, ReaderError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut entries: Vec<_> = std::fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if shadowed_top_level.contains_key(&name) {
            continue;
        }
        let entry_path = entry.path();
        if entry_path.is_dir() {
            builder.append_dir_all(&name, &entry_path)?;
        } else {
            builder.append_path_with_name(&entry_path, &name)?;
        }
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

fn stream_file(path: &Path) -> Result<Vec<u8>, ReaderError> {
    let mut input = std::fs::File::open(path)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    std::io::copy(&mut input, &mut encoder)?;
    Ok(encoder.finish()?)
}

fn read_file_section(path: &Path, offset: u64, length: u64) -> Result<Vec<u8>, ReaderError> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; length as usize];
    let n = file.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Mirrors `file_util.py`'s `summarize_file`: read up to `head_lines`
/// from the front and `tail_lines` from the back, each line capped at
/// `max_line_length`, joined by `truncation_text` when both are present.
fn summarize_file(path: &Path, head_lines: usize, tail_lines: usize, max_line_length: usize, truncation_text: &str) -> Result<String, ReaderError> {
    let content = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&content);
    let lines: Vec<&str> = text.lines().collect();

    let truncate_line = |line: &str| -> String {
        if line.len() > max_line_length {
            format!("{}...", &line[..max_line_length.min(line.len())])
        } else {
            line.to_string()
        }
    };

    if lines.len() <= head_lines + tail_lines {
        return Ok(lines.iter().map(|l| truncate_line(l)).collect::<Vec<_>>().join("\n"));
    }

    let mut out = Vec::new();
    out.extend(lines[..head_lines].iter().map(|l| truncate_line(l)));
    if head_lines > 0 && tail_lines > 0 {
        out.push(truncation_text.to_string());
    }
    if tail_lines > 0 {
        out.extend(lines[lines.len() - tail_lines..].iter().map(|l| truncate_line(l)));
    }
    Ok(out.join("\n"))
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
