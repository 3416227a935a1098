// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cw_core::BundleId;
use tempfile::tempdir;

fn shadowed() -> ShadowedPaths {
    let mut map = ShadowedPaths::new();
    map.insert("model".to_string(), DependencyKey::new(BundleId::from_string("bun-parent"), "weights.bin".to_string()));
    map
}

#[test]
fn get_target_info_hides_shadowed_top_level_entries() {
    let dir = tempdir().expect("tmpdir");
    std::fs::write(dir.path().join("stdout.txt"), b"hi").expect("write");
    std::fs::create_dir(dir.path().join("model")).expect("mkdir");

    let info = read(dir.path(), ".", &shadowed(), ReadArgs::GetTargetInfo { depth: 1 }).expect("read");
    let ReadReply::TargetInfo(node) = info else { unreachable!("expected target info") };
    let names: Vec<_> = node.children.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"stdout.txt"));
    assert!(!names.contains(&"model"));
}

#[test]
fn stream_file_produces_gzip_bytes() {
    let dir = tempdir().expect("tmpdir");
    std::fs::write(dir.path().join("out.txt"), b"hello world").expect("write");

    let bytes = match read(dir.path(), "out.txt", &shadowed(), ReadArgs::StreamFile).expect("read") {
        ReadReply::Bytes(b) => b,
        _ => unreachable!("expected bytes"),
    };
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
}

#[test]
fn stream_directory_produces_gzip_tar_excluding_shadowed_entries() {
    let dir = tempdir().expect("tmpdir");
    std::fs::write(dir.path().join("out.txt"), b"hello").expect("write");
    std::fs::create_dir(dir.path().join("model")).expect("mkdir");
    std::fs::write(dir.path().join("model/weights.bin"), b"weights").expect("write");

    let bytes = match read(dir.path(), ".", &shadowed(), ReadArgs::StreamDirectory).expect("read") {
        ReadReply::Bytes(b) => b,
        _ => unreachable!("expected bytes"),
    };

    let decoder = flate2::read::GzDecoder::new(&bytes[..]);
    let mut archive = tar::Archive::new(decoder);
    let names: Vec<String> = archive
        .entries()
        .expect("entries")
        .filter_map(|e| e.ok())
        .map(|e| e.path().expect("path").to_string_lossy().to_string())
        .collect();
    assert!(names.iter().any(|n| n.contains("out.txt")));
    assert!(!names.iter().any(|n| n.starts_with("model")));
}

#[test]
fn read_file_section_returns_requested_slice() {
    let dir = tempdir().expect("tmpdir");
    std::fs::write(dir.path().join("out.txt"), b"0123456789").expect("write");

    let bytes = match read(dir.path(), "out.txt", &shadowed(), ReadArgs::ReadFileSection { offset: 3, length: 4 }).expect("read") {
        ReadReply::Bytes(b) => b,
        _ => unreachable!("expected bytes"),
    };
    assert_eq!(bytes, b"3456");
}

#[test]
fn summarize_file_short_content_is_unchanged() {
    let dir = tempdir().expect("tmpdir");
    std::fs::write(dir.path().join("out.txt"), "a\nb\nc").expect("write");

    let text = match read(
        dir.path(),
        "out.txt",
        &shadowed(),
        ReadArgs::SummarizeFile { head_lines: 5, tail_lines: 5, max_line_length: 100, truncation_text: "...".to_string() },
    )
    .expect("read")
    {
        ReadReply::Text(t) => t,
        _ => unreachable!("expected text"),
    };
    assert_eq!(text, "a\nb\nc");
}

#[test]
fn summarize_file_truncates_middle_with_marker() {
    let dir = tempdir().expect("tmpdir");
    let content = (0..20).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
    std::fs::write(dir.path().join("out.txt"), content).expect("write");

    let text = match read(
        dir.path(),
        "out.txt",
        &shadowed(),
        ReadArgs::SummarizeFile { head_lines: 2, tail_lines: 2, max_line_length: 100, truncation_text: "<snip>".to_string() },
    )
    .expect("read")
    {
        ReadReply::Text(t) => t,
        _ => unreachable!("expected text"),
    };
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["line0", "line1", "<snip>", "line18", "line19"]);
}

#[test]
fn path_traversal_is_rejected() {
    let dir = tempdir().expect("tmpdir");
    std::fs::create_dir(dir.path().join("ws")).expect("mkdir");
    let workspace = dir.path().join("ws");

    let result = read(&workspace, "../../etc/passwd", &shadowed(), ReadArgs::StreamFile);
    assert!(matches!(result, Err(ReaderError::BadRequest(_))));
}
