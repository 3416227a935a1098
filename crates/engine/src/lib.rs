// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cw-engine: the per-worker run lifecycle — dependency and image caches,
//! the run state machine, the multiplexed log stream, and the read-request
//! translator.

pub mod cache;
pub mod dependency_cache;
pub mod image_cache;
pub mod reader;
pub mod retry;
pub mod run;
pub mod stream;
pub mod thread_dict;

pub use cache::{Cache, CacheConfig, CacheError, FetchOutcome, FetchResult};
pub use dependency_cache::DependencyCache;
pub use image_cache::ImageCache;
pub use reader::{read, ReadArgs, ReaderError, ReadReply, ShadowedPaths, TargetInfoNode};
pub use retry::{retry_with_deadline, DEFAULT_RETRY_DEADLINE, DEFAULT_RETRY_INTERVAL};
pub use run::{shadowed_child_paths, resolve_in_workspace, RunError, RunStateMachine, TickOutcome};
pub use stream::{MultiReaderStream, Reader, StreamError, DEFAULT_LOOKBACK_BYTES};
pub use thread_dict::{Entry, ThreadDict};
