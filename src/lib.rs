//! # revdev
//!
//! A single-slot byte channel that reverses every write before readers see it.
//!
//! A writer replaces the whole pending payload ("last write wins"). Readers
//! take the payload out in one or more pieces, block (with a bound) while
//! nothing is pending, can ask not to block at all, and can be cancelled from
//! another thread.
//!
//! ## Crate Structure
//!
//! - **`transform`**: The in-place byte reversal applied to each payload.
//! - **`buffer`**: `BufferStore`, the fixed-capacity region with its valid-length
//!   marker and read cursor.
//! - **`interrupt`**: `Interrupt`, the cancellation signal that aborts blocked
//!   lock and data waits.
//! - **`gate`**: `SyncGate`, the exclusive lock and bounded blocking protocol
//!   around a `BufferStore`.
//! - **`session`**: `Session`, the per-open handle composing a store and a gate.
//!   Clone it to share one channel between threads.
//! - **`stream`**: `SessionStream`, an `std::io::Read`/`Write` adapter.
//! - **`device`**: `ReverseDevice`, validated settings and a session factory.
//! - **`config`**: Figment-based configuration loading.
//! - **`error`**: The `ChannelError` enum shared by every operation.
//! - **`telemetry`**: `tracing-subscriber` initialisation for hosts.
//!
//! ## Example
//!
//! ```
//! use revdev::{ChannelError, ReadMode, Session};
//!
//! let session = Session::open(8192)?;
//! session.write(b"ab")?;
//! session.write(b"cdef")?;
//!
//! let out = session.read(8192, ReadMode::NonBlocking)?;
//! assert_eq!(&out[..], b"fedc");
//!
//! let empty = session.read(8192, ReadMode::NonBlocking);
//! assert!(matches!(empty, Err(ChannelError::WouldBlock)));
//! # Ok::<(), ChannelError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod device;
pub mod error;
pub mod gate;
pub mod interrupt;
pub mod session;
pub mod stream;
pub mod telemetry;
pub mod transform;

pub use buffer::{BufferState, BufferStore};
pub use device::ReverseDevice;
pub use error::{ChannelError, InterruptReason, Result};
pub use gate::{ReadMode, SyncGate, WriteOutcome};
pub use interrupt::Interrupt;
pub use session::{Session, SessionConfig, SessionStats, DEFAULT_CAPACITY};
pub use stream::SessionStream;
