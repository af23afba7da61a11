//! Error types for the reversing channel.
//!
//! This module defines `ChannelError`, the single error type returned by every
//! operation in the crate. Using the `thiserror` crate, it gives each failure of
//! the channel protocol its own variant so callers can decide between retrying,
//! backing off, or giving up.
//!
//! ## Error Hierarchy
//!
//! - **`Allocation`**: The buffer could not be created, either because the
//!   requested capacity is zero or because the storage could not be reserved.
//!   Fatal to the `open` call that produced it.
//! - **`Overflow`**: A write payload is larger than the session capacity. The
//!   write is rejected and the buffer keeps its previous contents.
//! - **`Interrupted`**: A blocking wait (lock or data) was cancelled, timed out,
//!   or the session was closed underneath it. Restartable; see
//!   [`InterruptReason`] for which of the three happened.
//! - **`WouldBlock`**: A non-blocking read found no unread data.
//! - **`Fault`**: The payload could not be copied across the caller boundary
//!   (a failing reader or writer). Buffer state is not affected.
//! - **`Closed`**: The operation started after the session was closed.
//! - **`Config`**: Semantic configuration errors caught during validation.
//!
//! `ChannelError` converts into [`std::io::Error`] so the channel can sit
//! behind `std::io::Read` / `std::io::Write` with the usual error kinds. Only a
//! timed-out wait maps to `ErrorKind::Interrupted`, which std helpers such as
//! `read_exact` retry on their own.

use std::fmt;
use std::io;
use thiserror::Error;

/// Convenience alias for results using the channel error type.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Why a blocking wait ended without data.
///
/// All three surface as [`ChannelError::Interrupted`]; the reason only exists
/// for diagnostics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// The bounded data wait elapsed with no writer signal.
    TimedOut,
    /// The caller's [`Interrupt`](crate::interrupt::Interrupt) was raised.
    Cancelled,
    /// The session was closed while the caller was waiting.
    Closed,
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InterruptReason::TimedOut => "timed out",
            InterruptReason::Cancelled => "cancelled",
            InterruptReason::Closed => "session closed",
        };
        write!(f, "{}", label)
    }
}

/// Errors produced by the reversing channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Buffer storage could not be obtained.
    #[error("Failed to allocate a {capacity} byte buffer")]
    Allocation {
        /// Requested capacity in bytes.
        capacity: usize,
    },

    /// Write payload does not fit the buffer.
    #[error("Payload of {len} bytes exceeds buffer capacity of {capacity} bytes")]
    Overflow {
        /// Length of the rejected payload.
        len: usize,
        /// Capacity of the session buffer.
        capacity: usize,
    },

    /// Blocking wait ended early; the caller may retry.
    #[error("Wait interrupted ({0}), operation may be restarted")]
    Interrupted(InterruptReason),

    /// Non-blocking read found nothing to deliver.
    #[error("No data available, operation would block")]
    WouldBlock,

    /// Copy across the caller boundary failed.
    #[error("Bad address during transfer: {0}")]
    Fault(String),

    /// Operation attempted on a closed session.
    #[error("Session is closed")]
    Closed,

    /// Invalid configuration value.
    #[error("Configuration validation error: {0}")]
    Config(String),
}

impl ChannelError {
    /// Whether the same call may succeed if simply issued again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::Interrupted(_) | ChannelError::WouldBlock)
    }

    /// The interruption reason, if this is an `Interrupted` error.
    #[must_use]
    pub fn interrupt_reason(&self) -> Option<InterruptReason> {
        match self {
            ChannelError::Interrupted(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<ChannelError> for io::Error {
    fn from(value: ChannelError) -> Self {
        let kind = match &value {
            ChannelError::Allocation { .. } => io::ErrorKind::OutOfMemory,
            ChannelError::Overflow { .. } => io::ErrorKind::InvalidInput,
            // std retries `Interrupted` transparently; an explicit cancel or
            // a close must reach the caller instead.
            ChannelError::Interrupted(InterruptReason::TimedOut) => io::ErrorKind::Interrupted,
            ChannelError::Interrupted(InterruptReason::Cancelled) => io::ErrorKind::Other,
            ChannelError::Interrupted(InterruptReason::Closed) => io::ErrorKind::BrokenPipe,
            ChannelError::WouldBlock => io::ErrorKind::WouldBlock,
            ChannelError::Fault(_) => io::ErrorKind::InvalidData,
            ChannelError::Closed => io::ErrorKind::BrokenPipe,
            ChannelError::Config(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, value)
    }
}
