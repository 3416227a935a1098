// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Cursor;
use std::sync::Arc as StdArc;
use std::thread;

fn make(data: &[u8], num_readers: usize, lookback: u64) -> MultiReaderStream<Cursor<Vec<u8>>> {
    MultiReaderStream::new(Cursor::new(data.to_vec()), num_readers, lookback)
}

#[test]
fn single_reader_reads_full_content_in_chunks() {
    let stream = make(b"hello world", 1, 1024);
    let reader = stream.reader(0).expect("reader");
    let mut out = Vec::new();
    loop {
        let chunk = reader.read(4).expect("read");
        if chunk.is_empty() {
            break;
        }
        out.extend_from_slice(&chunk);
    }
    assert_eq!(out, b"hello world");
}

#[test]
fn two_readers_see_identical_independent_streams() {
    let data = (0u8..=255).collect::<Vec<u8>>();
    let stream = make(&data, 2, 1024);
    let fast = stream.reader(0).expect("reader 0");
    let slow = stream.reader(1).expect("reader 1");

    let fast_out = fast.read(256).expect("fast read");
    assert_eq!(fast_out, data);

    let slow_out = slow.read(256).expect("slow read");
    assert_eq!(slow_out, data);
}

#[test]
fn peek_does_not_advance_position() {
    let stream = make(b"abcdef", 1, 64);
    let reader = stream.reader(0).expect("reader");
    let peeked = reader.peek(3).expect("peek");
    assert_eq!(peeked, b"abc");
    assert_eq!(reader.position(), 0);
    let read = reader.read(3).expect("read");
    assert_eq!(read, b"abc");
    assert_eq!(reader.position(), 3);
}

#[test]
fn bad_reader_index_is_rejected() {
    let stream = make(b"abc", 1, 64);
    assert!(matches!(stream.reader(5), Err(StreamError::BadReaderIndex(5))));
}

#[test]
fn seek_before_buffer_start_errors() {
    let data = vec![0u8; 4096];
    let stream = make(&data, 1, 8);
    let reader = stream.reader(0).expect("reader");
    reader.read(4000).expect("read");
    assert!(matches!(reader.seek_to(0), Err(StreamError::SeekBeforeBuffer { .. })));
}

#[test]
fn seek_forward_within_buffer_succeeds() {
    let data = vec![1u8; 128];
    let stream = make(&data, 1, 64);
    let reader = stream.reader(0).expect("reader");
    reader.read(32).expect("read");
    reader.seek_to(64).expect("seek");
    assert_eq!(reader.position(), 64);
}

#[test]
fn fast_reader_blocks_until_slow_reader_advances_past_threshold() {
    let lookback = 16u64;
    let data = vec![7u8; 1024];
    let stream = StdArc::new(make(&data, 2, lookback));
    let fast = stream.reader(0).expect("fast");
    let slow = stream.reader(1).expect("slow");

    let handle = thread::spawn(move || {
        // Requesting far beyond max_threshold ahead of the slow reader
        // should block until the slow reader catches up.
        fast.read(200).expect("fast read")
    });

    thread::sleep(std::time::Duration::from_millis(50));
    assert!(!handle.is_finished());

    slow.read(200).expect("slow read");
    let fast_out = handle.join().expect("join");
    assert_eq!(fast_out.len(), 200);
}
