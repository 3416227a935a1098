// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A byte stream that lets a fixed number of independent readers each
//! consume the same underlying `Read` at their own pace, buffering only
//! the window between the slowest and fastest reader.
//!
//! Ported from the worker's `MultiReaderFileStream`: a bundle download is
//! read once from the object store but is simultaneously written to disk
//! and hashed for a digest, and neither consumer should have to wait for
//! the other to finish before starting its own pass.

use std::io::Read;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// How far back from the slowest reader's position the buffer retains
/// bytes, so a reader that falls behind can still be served without
/// re-reading the underlying stream.
pub const DEFAULT_LOOKBACK_BYTES: u64 = 32 * 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("seek to {requested} is before the buffered window start {buffer_start}")]
    SeekBeforeBuffer { requested: u64, buffer_start: u64 },
    #[error("seek from end of stream is not supported")]
    SeekFromEndUnsupported,
    #[error("reader index {0} out of range")]
    BadReaderIndex(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct State<R> {
    fileobj: R,
    buffer: Vec<u8>,
    /// Offset of `buffer[0]` in the original stream.
    buffer_start_pos: u64,
    /// Offset of each reader.
    positions: Vec<u64>,
    eof: bool,
}

impl<R: Read> State<R> {
    fn fill(&mut self, want_at_least: u64) -> std::io::Result<()> {
        if self.eof {
            return Ok(());
        }
        let target_len = want_at_least.saturating_sub(self.buffer_start_pos) as usize;
        let mut chunk = [0u8; 64 * 1024];
        while self.buffer.len() < target_len {
            let n = self.fileobj.read(&mut chunk)?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn trim(&mut self, lookback: u64) {
        let slowest = *self.positions.iter().min().unwrap_or(&0);
        let keep_from = slowest.saturating_sub(lookback);
        if keep_from > self.buffer_start_pos {
            let drop = (keep_from - self.buffer_start_pos) as usize;
            let drop = drop.min(self.buffer.len());
            self.buffer.drain(..drop);
            self.buffer_start_pos += drop as u64;
        }
    }
}

/// Shared handle; call [`MultiReaderStream::reader`] once per consumer to
/// get an index-bound [`Reader`].
pub struct MultiReaderStream<R> {
    state: Arc<Mutex<State<R>>>,
    condvar: Arc<Condvar>,
    num_readers: usize,
    lookback: u64,
    max_threshold: u64,
}

impl<R: Read> MultiReaderStream<R> {
    pub fn new(fileobj: R, num_readers: usize, lookback: u64) -> Self {
        let state = State {
            fileobj,
            buffer: Vec::new(),
            buffer_start_pos: 0,
            positions: vec![0; num_readers],
            eof: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            condvar: Arc::new(Condvar::new()),
            num_readers,
            lookback,
            max_threshold: lookback.saturating_mul(2),
        }
    }

    pub fn with_default_lookback(fileobj: R, num_readers: usize) -> Self {
        Self::new(fileobj, num_readers, DEFAULT_LOOKBACK_BYTES)
    }

    /// Bind a reader handle to `index` (`0..num_readers`).
    pub fn reader(&self, index: usize) -> Result<Reader<R>, StreamError> {
        if index >= self.num_readers {
            return Err(StreamError::BadReaderIndex(index));
        }
        Ok(Reader {
            state: Arc::clone(&self.state),
            condvar: Arc::clone(&self.condvar),
            index,
            lookback: self.lookback,
            max_threshold: self.max_threshold,
        })
    }
}

/// One reader's view into a [`MultiReaderStream`]. Cheap to clone the
/// parent and create more of these; each index may only be bound once at
/// a time by convention (the worker hands one to the disk writer and one
/// to the digest computer).
#[derive(Clone)]
pub struct Reader<R> {
    state: Arc<Mutex<State<R>>>,
    condvar: Arc<Condvar>,
    index: usize,
    lookback: u64,
    max_threshold: u64,
}

impl<R: Read> Reader<R> {
    /// Return up to `num_bytes` without advancing this reader's position.
    pub fn peek(&self, num_bytes: u64) -> Result<Vec<u8>, StreamError> {
        loop {
            let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let pos = guard.positions[self.index];
            let new_pos = pos + num_bytes;

            if new_pos.saturating_sub(guard.buffer_start_pos) > self.max_threshold {
                drop(guard);
                thread::sleep(POLL_INTERVAL);
                continue;
            }

            let fastest = *guard.positions.iter().max().unwrap_or(&0);
            let need = new_pos.max(fastest);
            guard.fill(need)?;

            let start = (pos - guard.buffer_start_pos) as usize;
            let start = start.min(guard.buffer.len());
            let end = ((new_pos - guard.buffer_start_pos) as usize).min(guard.buffer.len());
            return Ok(guard.buffer[start..end].to_vec());
        }
    }

    /// Read and advance this reader's position by the number of bytes
    /// actually returned (fewer than requested at EOF).
    pub fn read(&self, num_bytes: u64) -> Result<Vec<u8>, StreamError> {
        let bytes = self.peek(num_bytes)?;
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        guard.positions[self.index] += bytes.len() as u64;
        guard.trim(self.lookback);
        drop(guard);
        self.condvar.notify_all();
        Ok(bytes)
    }

    pub fn position(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).positions[self.index]
    }

    /// Forward-only seek within the buffered window. `MultiReaderFileStream`
    /// forwarded `SEEK_END` to the underlying file object; there is no
    /// underlying file object to forward to here, so that whence is
    /// rejected rather than silently misbehaving.
    pub fn seek_to(&self, offset: u64) -> Result<(), StreamError> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if offset < guard.buffer_start_pos {
            return Err(StreamError::SeekBeforeBuffer { requested: offset, buffer_start: guard.buffer_start_pos });
        }
        guard.positions[self.index] = offset;
        Ok(())
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
