//! `std::io` adapter over a [`Session`].
//!
//! [`SessionStream`] lets the channel be driven by anything that speaks
//! `Read`/`Write`, with channel errors mapped onto `io::ErrorKind` by the
//! `From<ChannelError> for io::Error` conversion. A read that times out maps to
//! `ErrorKind::Interrupted`, so `read_exact` keeps waiting across timeouts the
//! way a restarted system call would; cancellation and close still surface.
//!
//! Each `write` call is one payload and replaces whatever is unread. A buffer
//! larger than the session capacity is rejected with `InvalidInput` rather than
//! split, so `write_all` is only meaningful for payloads that fit.

use crate::gate::ReadMode;
use crate::interrupt::Interrupt;
use crate::session::Session;
use std::io;

/// Byte-stream view of a session.
#[derive(Debug, Clone)]
pub struct SessionStream {
    session: Session,
    mode: ReadMode,
    interrupt: Option<Interrupt>,
}

impl SessionStream {
    /// Blocking stream over `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            mode: ReadMode::Blocking,
            interrupt: None,
        }
    }

    /// Set the read mode used by every `read` call.
    #[must_use]
    pub fn with_mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Abort waits when `interrupt` is raised.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Current read mode.
    #[must_use]
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// The wrapped session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Unwrap the stream, returning the session handle.
    #[must_use]
    pub fn into_inner(self) -> Session {
        self.session
    }
}

impl io::Read for SessionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.session
            .read_slice(buf, self.mode, self.interrupt.as_ref())
            .map_err(io::Error::from)
    }
}

impl io::Write for SessionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.session
            .write_inner(buf, self.interrupt.as_ref())
            .map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
