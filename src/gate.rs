//! Exclusive-access gate and bounded blocking protocol around a [`BufferStore`].
//!
//! # Locking Model
//!
//! The gate keeps two independent pieces of synchronization:
//!
//! 1. `state`: a `parking_lot::Mutex` that *is* the exclusive lock. Every read
//!    and write holds it while touching the store. Acquisition can be made
//!    interruptible by passing an [`Interrupt`]; the lock is then polled in
//!    `lock_poll` slices so a raised interrupt is noticed quickly.
//! 2. `queue`: a [`WaitQueue`] (mutex + condvar + generation counter) on which
//!    readers park while the store is empty. Writers bump the generation and
//!    notify while still holding the exclusive lock.
//!
//! A reader that finds the store empty reads the queue generation *before*
//! releasing the exclusive lock, then waits for the generation to move. A write
//! that lands between the release and the park is therefore never missed.
//!
//! Lock order is always `state` then `queue`; nothing takes `state` while
//! holding `queue`.
//!
//! # Read Protocol
//!
//! ```text
//! lock ──► READY? ──yes──► take ──► unlock ──► Ok(n)
//!            │no
//!            ├─ non-blocking ──► unlock ──► Err(WouldBlock)
//!            └─ note generation, unlock, wait ≤ read_timeout
//!                 ├─ signaled ──► lock (interruptible) ──► recheck
//!                 └─ timeout / interrupt / close ──► Err(Interrupted)
//! ```

use crate::buffer::BufferStore;
use crate::error::{ChannelError, InterruptReason, Result};
use crate::interrupt::Interrupt;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default bound on a single data wait inside a blocking read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default slice used when polling the exclusive lock interruptibly.
pub const DEFAULT_LOCK_POLL: Duration = Duration::from_millis(10);

/// Per-call blocking behaviour for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Wait (bounded) for a writer when no data is available.
    #[default]
    Blocking,
    /// Fail with `WouldBlock` instead of waiting.
    NonBlocking,
}

impl ReadMode {
    /// Map a classic `blocking` flag onto a mode.
    #[must_use]
    pub fn from_blocking(blocking: bool) -> Self {
        if blocking {
            ReadMode::Blocking
        } else {
            ReadMode::NonBlocking
        }
    }
}

/// Result of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Bytes accepted into the buffer.
    pub accepted: usize,
    /// Unread bytes of the previous payload that the write discarded.
    pub discarded: usize,
}

/// How a data wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    Signaled,
    TimedOut,
    Cancelled,
    Closed,
}

struct QueueState {
    generation: u64,
    closed: bool,
}

/// Condition on which readers wait for data.
pub(crate) struct WaitQueue {
    state: Mutex<QueueState>,
    cond: Condvar,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                generation: 0,
                closed: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Announce new data and wake every waiter.
    fn notify(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Wake every waiter without announcing data, so they recheck their exit
    /// conditions.
    pub(crate) fn kick(&self) {
        let _state = self.state.lock();
        self.cond.notify_all();
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.cond.notify_all();
    }

    /// Wait until the generation differs from `seen`, the deadline passes, the
    /// interrupt is raised, or the queue is closed.
    fn wait(
        self: &Arc<Self>,
        seen: u64,
        timeout: Duration,
        interrupt: Option<&Interrupt>,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        // Registered before the first check under the queue lock.
        let _watch = interrupt.map(|interrupt| interrupt.watch(self));
        let mut state = self.state.lock();
        let mut timed_out = false;

        loop {
            if state.closed {
                return WaitOutcome::Closed;
            }
            if interrupt.is_some_and(Interrupt::is_raised) {
                return WaitOutcome::Cancelled;
            }
            if state.generation != seen {
                return WaitOutcome::Signaled;
            }
            if timed_out {
                return WaitOutcome::TimedOut;
            }
            timed_out = self.cond.wait_until(&mut state, deadline).timed_out();
        }
    }
}

struct GateState {
    store: BufferStore,
    closed: bool,
}

/// Mutual exclusion plus bounded blocking around one [`BufferStore`].
pub struct SyncGate {
    state: Mutex<GateState>,
    queue: Arc<WaitQueue>,
    closing: AtomicBool,
    read_timeout: Duration,
    lock_poll: Duration,
}

impl SyncGate {
    /// Wrap `store` with the default timeouts.
    #[must_use]
    pub fn new(store: BufferStore) -> Self {
        Self::with_timeouts(store, DEFAULT_READ_TIMEOUT, DEFAULT_LOCK_POLL)
    }

    /// Wrap `store` with explicit timeouts.
    ///
    /// `read_timeout` bounds each data wait of a blocking read; `lock_poll` is
    /// the slice between interrupt checks while waiting for the lock.
    #[must_use]
    pub fn with_timeouts(store: BufferStore, read_timeout: Duration, lock_poll: Duration) -> Self {
        Self {
            state: Mutex::new(GateState {
                store,
                closed: false,
            }),
            queue: Arc::new(WaitQueue::new()),
            closing: AtomicBool::new(false),
            read_timeout,
            lock_poll,
        }
    }

    /// Replace the store contents with the reversed `payload` and wake readers.
    ///
    /// # Errors
    ///
    /// - `Interrupted` if the interrupt is raised while waiting for the lock,
    ///   or the gate was closed while waiting.
    /// - `Overflow` if the payload does not fit; the store is unchanged.
    pub fn write(&self, payload: &[u8], interrupt: Option<&Interrupt>) -> Result<WriteOutcome> {
        let mut guard = self.lock(interrupt)?;

        let discarded = guard.store.pending();
        let accepted = guard.store.overwrite(payload)?;
        if discarded > 0 {
            debug!(discarded, "overwrote unread payload");
        }
        if accepted > 0 {
            // Generation moves before the lock is released.
            self.queue.notify();
        }
        trace!(accepted, "write complete");

        Ok(WriteOutcome {
            accepted,
            discarded,
        })
    }

    /// Deliver up to `max_len` unread bytes to `deliver`, waiting for a writer
    /// when the store is empty and `mode` allows it.
    ///
    /// The cursor only advances if `deliver` succeeds. Returns the number of
    /// bytes delivered.
    ///
    /// # Errors
    ///
    /// - `WouldBlock` for a non-blocking read of an empty store.
    /// - `Interrupted` when a data wait times out, the interrupt is raised, or
    ///   the gate is closed mid-wait.
    /// - Whatever `deliver` returns, with the store untouched.
    pub fn read_with<F>(
        &self,
        max_len: usize,
        mode: ReadMode,
        interrupt: Option<&Interrupt>,
        deliver: F,
    ) -> Result<usize>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let mut guard = self.lock(interrupt)?;

        while !guard.store.is_ready() {
            if mode == ReadMode::NonBlocking {
                return Err(ChannelError::WouldBlock);
            }

            let seen = self.queue.generation();
            // Writers need the lock to make progress.
            drop(guard);

            match self.queue.wait(seen, self.read_timeout, interrupt) {
                WaitOutcome::Signaled => guard = self.lock(interrupt)?,
                WaitOutcome::TimedOut => {
                    trace!(timeout_ms = self.read_timeout.as_millis(), "read wait timed out");
                    return Err(ChannelError::Interrupted(InterruptReason::TimedOut));
                }
                WaitOutcome::Cancelled => {
                    return Err(ChannelError::Interrupted(InterruptReason::Cancelled))
                }
                WaitOutcome::Closed => {
                    return Err(ChannelError::Interrupted(InterruptReason::Closed))
                }
            }
        }

        let delivered = guard.store.take_with(max_len, deliver)?;
        trace!(delivered, remaining = guard.store.pending(), "read complete");
        Ok(delivered)
    }

    /// Close the gate: wake every parked reader, wait for the current lock
    /// holder, then release the store.
    ///
    /// Returns `false` if the gate was already closed.
    pub fn close(&self) -> bool {
        if self.closing.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.queue.close();
        let mut guard = self.state.lock();
        guard.closed = true;
        guard.store.release();
        true
    }

    /// Whether [`close`](SyncGate::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Unread bytes in the store.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().store.pending()
    }

    /// Capacity of the store (zero once closed).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().store.capacity()
    }

    /// Bound applied to each data wait.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn lock(&self, interrupt: Option<&Interrupt>) -> Result<MutexGuard<'_, GateState>> {
        let guard = match self.state.try_lock() {
            Some(guard) => guard,
            None => self.lock_contended(interrupt)?,
        };

        if guard.closed {
            return Err(ChannelError::Interrupted(InterruptReason::Closed));
        }
        Ok(guard)
    }

    fn lock_contended(&self, interrupt: Option<&Interrupt>) -> Result<MutexGuard<'_, GateState>> {
        let Some(interrupt) = interrupt else {
            return Ok(self.state.lock());
        };

        loop {
            if interrupt.is_raised() {
                return Err(ChannelError::Interrupted(InterruptReason::Cancelled));
            }
            if let Some(guard) = self.state.try_lock_for(self.lock_poll) {
                return Ok(guard);
            }
        }
    }
}

impl std::fmt::Debug for SyncGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncGate")
            .field("closed", &self.is_closed())
            .field("read_timeout", &self.read_timeout)
            .field("lock_poll", &self.lock_poll)
            .finish_non_exhaustive()
    }
}
