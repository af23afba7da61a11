//! Behavioural properties of a single session, driven from one thread.
//!
//! Covers the round trip, last-write-wins, partial delivery, and the two
//! failure modes of reading an empty channel.

use revdev::transform::reversed;
use revdev::{ChannelError, InterruptReason, ReadMode, Session, SessionConfig};
use std::time::{Duration, Instant};

fn session_with_timeout(capacity: usize, read_timeout: Duration) -> Session {
    Session::open_with(&SessionConfig::with_capacity(capacity).read_timeout(read_timeout))
        .expect("open session")
}

fn sample_payloads() -> Vec<Vec<u8>> {
    vec![
        Vec::new(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"hello".to_vec(),
        b"A man, a plan, a canal: Panama".to_vec(),
        (0u8..=255).collect(),
        vec![0u8; 8192],
        (0..8192).map(|i| (i % 251) as u8).collect(),
    ]
}

#[test]
fn round_trip_yields_reversed_payload() {
    let session = Session::open(8192).unwrap();

    for payload in sample_payloads().into_iter().filter(|p| !p.is_empty()) {
        assert_eq!(session.write(&payload).unwrap(), payload.len());
        let out = session.read(payload.len(), ReadMode::NonBlocking).unwrap();
        assert_eq!(out.to_vec(), reversed(&payload));
    }
}

#[test]
fn double_reversal_through_two_sessions_restores_input() {
    let first = Session::open(8192).unwrap();
    let second = Session::open(8192).unwrap();

    for payload in sample_payloads().into_iter().filter(|p| !p.is_empty()) {
        first.write(&payload).unwrap();
        let once = first.read(8192, ReadMode::NonBlocking).unwrap();
        second.write(&once).unwrap();
        let twice = second.read(8192, ReadMode::NonBlocking).unwrap();
        assert_eq!(twice.to_vec(), payload);
    }
}

#[test]
fn hello_scenario() {
    let session = session_with_timeout(8192, Duration::from_millis(100));

    assert_eq!(session.write(b"hello").unwrap(), 5);
    let out = session.read(8192, ReadMode::Blocking).unwrap();
    assert_eq!(&out[..], b"olleh");

    assert!(matches!(
        session.read(8192, ReadMode::NonBlocking),
        Err(ChannelError::WouldBlock)
    ));
    let err = session.read(8192, ReadMode::Blocking).unwrap_err();
    assert_eq!(err.interrupt_reason(), Some(InterruptReason::TimedOut));
}

#[test]
fn overwrite_before_read_keeps_only_last_payload() {
    let session = Session::open(8192).unwrap();
    session.write(b"ab").unwrap();
    session.write(b"cdef").unwrap();

    let out = session.read(8192, ReadMode::NonBlocking).unwrap();
    assert_eq!(&out[..], b"fedc");
    assert!(matches!(
        session.read(8192, ReadMode::NonBlocking),
        Err(ChannelError::WouldBlock)
    ));
}

#[test]
fn overwrite_mid_read_resets_cursor() {
    let session = Session::open(64).unwrap();
    session.write(b"abcdef").unwrap();
    assert_eq!(&session.read(2, ReadMode::NonBlocking).unwrap()[..], b"fe");

    session.write(b"xyz").unwrap();
    assert_eq!(&session.read(64, ReadMode::NonBlocking).unwrap()[..], b"zyx");
}

#[test]
fn partial_reads_concatenate_to_reversed_payload() {
    let session = Session::open(8192).unwrap();
    let payload: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    let expected = reversed(&payload);

    for split in [1usize, 7, 500, 999] {
        session.write(&payload).unwrap();

        let head = session.read(split, ReadMode::NonBlocking).unwrap();
        assert_eq!(head.len(), split);
        assert_eq!(&head[..], &expected[..split]);
        assert_eq!(session.pending(), payload.len() - split);

        let tail = session
            .read(payload.len() - split, ReadMode::NonBlocking)
            .unwrap();
        assert_eq!(&tail[..], &expected[split..]);
        assert_eq!(session.pending(), 0);
    }
}

#[test]
fn oversize_write_is_rejected_and_buffer_unchanged() {
    let session = Session::open(8).unwrap();
    session.write(b"keep").unwrap();

    let err = session.write(b"definitely too long").unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Overflow {
            len: 19,
            capacity: 8
        }
    ));
    assert_eq!(&session.read(8, ReadMode::NonBlocking).unwrap()[..], b"peek");
}

#[test]
fn zero_length_write_is_accepted_and_leaves_channel_empty() {
    let session = Session::open(8).unwrap();
    session.write(b"abc").unwrap();
    assert_eq!(session.write(b"").unwrap(), 0);
    assert!(matches!(
        session.read(8, ReadMode::NonBlocking),
        Err(ChannelError::WouldBlock)
    ));
}

#[test]
fn non_blocking_read_never_waits() {
    let session = session_with_timeout(16, Duration::from_secs(5));
    let start = Instant::now();
    for _ in 0..100 {
        assert!(matches!(
            session.read(16, ReadMode::NonBlocking),
            Err(ChannelError::WouldBlock)
        ));
    }
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn blocking_read_is_bounded_by_timeout() {
    let timeout = Duration::from_millis(80);
    let session = session_with_timeout(16, timeout);

    let start = Instant::now();
    let err = session.read(16, ReadMode::Blocking).unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_retryable());
    assert_eq!(err.interrupt_reason(), Some(InterruptReason::TimedOut));
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout * 20);
}

#[test]
fn zero_capacity_open_fails() {
    assert!(matches!(
        Session::open(0),
        Err(ChannelError::Allocation { capacity: 0 })
    ));
}
