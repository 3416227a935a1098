// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct Counter {
    schema_version: u32,
    value: u32,
}

impl Versioned for Counter {
    const SCHEMA_VERSION: u32 = 1;

    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}

fn default_counter() -> Counter {
    Counter { schema_version: Counter::SCHEMA_VERSION, value: 0 }
}

#[test]
fn load_missing_file_returns_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let committer: StateCommitter<Counter> = StateCommitter::new(dir.path().join("state.json"));
    assert_eq!(committer.load(default_counter()), default_counter());
}

#[test]
fn commit_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let committer: StateCommitter<Counter> = StateCommitter::new(dir.path().join("state.json"));
    let counter = Counter { schema_version: 1, value: 42 };
    committer.commit(&counter).expect("commit");
    assert_eq!(committer.load(default_counter()), counter);
}

#[test]
fn commit_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let committer: StateCommitter<Counter> = StateCommitter::new(dir.path().join("state.json"));
    committer.commit(&Counter { schema_version: 1, value: 1 }).expect("commit");
    let entries: Vec<_> = fs::read_dir(dir.path())
        .expect("read_dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["state.json".to_string()]);
}

#[test]
fn load_corrupt_file_returns_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    fs::write(&path, b"not json").expect("write");
    let committer: StateCommitter<Counter> = StateCommitter::new(path);
    assert_eq!(committer.load(default_counter()), default_counter());
}

#[test]
fn load_mismatched_schema_version_returns_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    fs::write(&path, br#"{"schema_version":99,"value":7}"#).expect("write");
    let committer: StateCommitter<Counter> = StateCommitter::new(path);
    assert_eq!(committer.load(default_counter()), default_counter());
}

#[test]
fn repeated_commits_overwrite_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let committer: StateCommitter<Counter> = StateCommitter::new(dir.path().join("state.json"));
    for value in 0..5 {
        committer.commit(&Counter { schema_version: 1, value }).expect("commit");
    }
    assert_eq!(committer.load(default_counter()).value, 4);
}
