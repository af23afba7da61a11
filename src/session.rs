//! Per-open-handle session: one buffer, one gate.
//!
//! A [`Session`] is the unit handed out by [`open`](Session::open). It owns its
//! [`BufferStore`] and [`SyncGate`] privately, so separate opens never contend.
//! Cloning a `Session` shares the handle: every clone operates on the same
//! buffer and contends on the same gate, which is how one writer thread and one
//! reader thread exercise the channel together.
//!
//! # Memory Flow
//!
//! ```text
//! write(payload) ──► gate lock ──► copy + reverse into store ──► notify ──► unlock
//! read(max_len)  ──► gate lock ──► [wait ≤ timeout] ──► copy prefix out ──► unlock
//! ```
//!
//! # Example
//!
//! ```
//! use revdev::{ReadMode, Session};
//!
//! let session = Session::open(8192).unwrap();
//! session.write(b"hello").unwrap();
//! let out = session.read(8192, ReadMode::Blocking).unwrap();
//! assert_eq!(&out[..], b"olleh");
//! session.close();
//! ```

use crate::buffer::BufferStore;
use crate::device::OpenGuard;
use crate::error::{ChannelError, Result};
use crate::gate::{ReadMode, SyncGate, DEFAULT_LOCK_POLL, DEFAULT_READ_TIMEOUT};
use crate::interrupt::Interrupt;
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 8192;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Settings applied when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Buffer capacity in bytes (must be > 0).
    pub capacity: usize,
    /// Bound on each data wait of a blocking read.
    pub read_timeout: Duration,
    /// Slice between interrupt checks while waiting for the lock.
    pub lock_poll: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            lock_poll: DEFAULT_LOCK_POLL,
        }
    }
}

impl SessionConfig {
    /// Default settings with a specific capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Override the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Override the lock poll slice.
    #[must_use]
    pub fn lock_poll(mut self, lock_poll: Duration) -> Self {
        self.lock_poll = lock_poll;
        self
    }
}

/// Point-in-time copy of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Completed writes.
    pub writes: u64,
    /// Completed reads (including zero-length deliveries).
    pub reads: u64,
    /// Bytes accepted by writes.
    pub bytes_written: u64,
    /// Bytes delivered by reads.
    pub bytes_read: u64,
    /// Writes that discarded part or all of an unread payload.
    pub payloads_discarded: u64,
    /// Blocking reads that ended because the data wait timed out.
    pub read_timeouts: u64,
    /// Operations ended by an interrupt or by close.
    pub interruptions: u64,
    /// Non-blocking reads that found no data.
    pub would_block: u64,
}

#[derive(Default)]
struct StatsCounters {
    writes: AtomicU64,
    reads: AtomicU64,
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    payloads_discarded: AtomicU64,
    read_timeouts: AtomicU64,
    interruptions: AtomicU64,
    would_block: AtomicU64,
}

impl StatsCounters {
    fn record_failure(&self, err: &ChannelError) {
        let counter = match err {
            ChannelError::Interrupted(crate::InterruptReason::TimedOut) => &self.read_timeouts,
            ChannelError::Interrupted(_) => &self.interruptions,
            ChannelError::WouldBlock => &self.would_block,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            payloads_discarded: self.payloads_discarded.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            interruptions: self.interruptions.load(Ordering::Relaxed),
            would_block: self.would_block.load(Ordering::Relaxed),
        }
    }
}

struct SessionInner {
    id: u64,
    capacity: usize,
    gate: SyncGate,
    stats: StatsCounters,
    /// Keeps the owning device's open count up while the session lives.
    _registration: Option<OpenGuard>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if self.gate.close() {
            debug!(session = self.id, "releasing session on last handle drop");
        }
    }
}

/// Handle to an open reversing channel.
///
/// Cheap to clone; clones share the same buffer and gate.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Open a session with `capacity` bytes and default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `Allocation` if `capacity` is zero or the buffer cannot be
    /// reserved.
    pub fn open(capacity: usize) -> Result<Self> {
        Self::open_with(&SessionConfig::with_capacity(capacity))
    }

    /// Open a session with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns `Allocation` if the buffer cannot be created.
    pub fn open_with(config: &SessionConfig) -> Result<Self> {
        Self::open_inner(config, None)
    }

    pub(crate) fn open_inner(config: &SessionConfig, registration: Option<OpenGuard>) -> Result<Self> {
        let store = BufferStore::allocate(config.capacity)?;
        let gate = SyncGate::with_timeouts(store, config.read_timeout, config.lock_poll);
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        debug!(
            session = id,
            capacity = config.capacity,
            read_timeout_ms = config.read_timeout.as_millis(),
            "session opened"
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                id,
                capacity: config.capacity,
                gate,
                stats: StatsCounters::default(),
                _registration: registration,
            }),
        })
    }

    /// Write `payload`, replacing any unread data.
    ///
    /// Returns the number of bytes accepted (always `payload.len()`).
    ///
    /// # Errors
    ///
    /// `Overflow` if the payload exceeds capacity, `Closed` if the session is
    /// closed, `Interrupted` if it was closed during the lock wait.
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        self.write_inner(payload, None)
    }

    /// Like [`write`](Session::write), but gives up the lock wait when
    /// `interrupt` is raised.
    ///
    /// # Errors
    ///
    /// As [`write`](Session::write), plus `Interrupted` on cancellation.
    pub fn write_interruptible(&self, payload: &[u8], interrupt: &Interrupt) -> Result<usize> {
        self.write_inner(payload, Some(interrupt))
    }

    /// Copy exactly `len` bytes from `source` and write them as one payload.
    ///
    /// The bytes are staged before the gate is taken, so a failing source
    /// leaves the buffer untouched.
    ///
    /// # Errors
    ///
    /// `Overflow` if `len` exceeds capacity (nothing is read from `source`),
    /// `Fault` if `source` fails, plus anything [`write`](Session::write)
    /// returns.
    pub fn write_from<R: Read>(&self, source: &mut R, len: usize) -> Result<usize> {
        self.ensure_open()?;
        if len > self.inner.capacity {
            warn!(
                session = self.inner.id,
                len,
                capacity = self.inner.capacity,
                "rejecting oversize write"
            );
            return Err(ChannelError::Overflow {
                len,
                capacity: self.inner.capacity,
            });
        }

        let mut staged = vec![0u8; len];
        source
            .read_exact(&mut staged)
            .map_err(|err| ChannelError::Fault(err.to_string()))?;
        self.write_inner(&staged, None)
    }

    /// Read up to `max_len` bytes of the current payload.
    ///
    /// # Errors
    ///
    /// `WouldBlock` for an empty non-blocking read, `Interrupted` when a
    /// blocking read times out or the session closes mid-wait, `Closed` if the
    /// session is already closed.
    pub fn read(&self, max_len: usize, mode: ReadMode) -> Result<Bytes> {
        self.read_bytes(max_len, mode, None)
    }

    /// Like [`read`](Session::read), but gives up any wait when `interrupt`
    /// is raised.
    ///
    /// # Errors
    ///
    /// As [`read`](Session::read), plus `Interrupted` on cancellation.
    pub fn read_interruptible(
        &self,
        max_len: usize,
        mode: ReadMode,
        interrupt: &Interrupt,
    ) -> Result<Bytes> {
        self.read_bytes(max_len, mode, Some(interrupt))
    }

    /// Read into `out`, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// As [`read`](Session::read).
    pub fn read_into(&self, out: &mut [u8], mode: ReadMode) -> Result<usize> {
        self.read_slice(out, mode, None)
    }

    /// Read up to `max_len` bytes straight into `sink`.
    ///
    /// If `sink` fails, the bytes stay unread and `Fault` is returned.
    ///
    /// # Errors
    ///
    /// As [`read`](Session::read), plus `Fault` when the sink rejects the data.
    pub fn read_to<W: Write>(&self, sink: &mut W, max_len: usize, mode: ReadMode) -> Result<usize> {
        self.read_inner(max_len, mode, None, |chunk| {
            sink.write_all(chunk)
                .map_err(|err| ChannelError::Fault(err.to_string()))
        })
    }

    /// Close the session for every handle.
    ///
    /// Parked readers wake with `Interrupted`, the current lock holder
    /// finishes, then the buffer is released. Calling it again is a no-op.
    pub fn close(&self) {
        if self.inner.gate.close() {
            debug!(session = self.inner.id, "session closed");
        }
    }

    /// Whether [`close`](Session::close) has been called on any handle.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.gate.is_closed()
    }

    /// Buffer capacity the session was opened with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Unread bytes of the current payload.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.gate.pending()
    }

    /// Bound on each data wait of a blocking read.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.inner.gate.read_timeout()
    }

    /// Process-unique session identifier (for logs).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Number of live handles sharing this session.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Snapshot of the session counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.inner.stats.snapshot()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.gate.is_closed() {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    pub(crate) fn read_slice(
        &self,
        out: &mut [u8],
        mode: ReadMode,
        interrupt: Option<&Interrupt>,
    ) -> Result<usize> {
        self.read_inner(out.len(), mode, interrupt, |chunk| {
            out[..chunk.len()].copy_from_slice(chunk);
            Ok(())
        })
    }

    pub(crate) fn write_inner(&self, payload: &[u8], interrupt: Option<&Interrupt>) -> Result<usize> {
        self.ensure_open()?;
        let stats = &self.inner.stats;

        match self.inner.gate.write(payload, interrupt) {
            Ok(outcome) => {
                stats.writes.fetch_add(1, Ordering::Relaxed);
                stats
                    .bytes_written
                    .fetch_add(outcome.accepted as u64, Ordering::Relaxed);
                if outcome.discarded > 0 {
                    stats.payloads_discarded.fetch_add(1, Ordering::Relaxed);
                }
                Ok(outcome.accepted)
            }
            Err(err) => {
                stats.record_failure(&err);
                Err(err)
            }
        }
    }

    fn read_bytes(&self, max_len: usize, mode: ReadMode, interrupt: Option<&Interrupt>) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.read_inner(max_len, mode, interrupt, |chunk| {
            out.extend_from_slice(chunk);
            Ok(())
        })?;
        Ok(out.freeze())
    }

    fn read_inner<F>(
        &self,
        max_len: usize,
        mode: ReadMode,
        interrupt: Option<&Interrupt>,
        deliver: F,
    ) -> Result<usize>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        self.ensure_open()?;
        let stats = &self.inner.stats;

        match self.inner.gate.read_with(max_len, mode, interrupt, deliver) {
            Ok(delivered) => {
                stats.reads.fetch_add(1, Ordering::Relaxed);
                stats
                    .bytes_read
                    .fetch_add(delivered as u64, Ordering::Relaxed);
                Ok(delivered)
            }
            Err(err) => {
                stats.record_failure(&err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("capacity", &self.inner.capacity)
            .field("gate", &self.inner.gate)
            .finish()
    }
}
