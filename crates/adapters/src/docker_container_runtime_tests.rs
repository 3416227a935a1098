// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_byte_size_handles_mib() {
    assert_eq!(parse_byte_size("12.3MiB"), (12.3 * 1024.0 * 1024.0) as u64);
}

#[test]
fn parse_byte_size_handles_plain_bytes() {
    assert_eq!(parse_byte_size("512B"), 512);
}

#[test]
fn parse_byte_size_unknown_unit_falls_back_to_one() {
    assert_eq!(parse_byte_size("7"), 7);
}
