//! Device facade: validated settings plus a session factory.
//!
//! A [`ReverseDevice`] stands where a driver registration would: it is built
//! once from a [`DeviceConfig`], refuses to come up with a zero buffer size, and
//! hands out isolated [`Session`]s from [`open`](ReverseDevice::open). It keeps
//! a count of sessions that are still alive so callers can tell when the last
//! handle has gone away.

use crate::config::DeviceConfig;
use crate::error::Result;
use crate::session::{Session, SessionConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Decrements the owning device's open-session count when dropped.
pub(crate) struct OpenGuard {
    open: Arc<AtomicUsize>,
}

impl OpenGuard {
    fn new(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::AcqRel);
        Self {
            open: Arc::clone(open),
        }
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Registered reversing device.
#[derive(Debug)]
pub struct ReverseDevice {
    name: String,
    session_config: SessionConfig,
    open: Arc<AtomicUsize>,
}

impl ReverseDevice {
    /// Validate `config` and bring the device up.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration fails validation (zero capacity,
    /// zero timeouts).
    pub fn register(config: &DeviceConfig) -> Result<Self> {
        config.validate()?;

        let device = Self {
            name: config.name.clone(),
            session_config: config.session_config(),
            open: Arc::new(AtomicUsize::new(0)),
        };

        info!(
            device = %device.name,
            buffer_size = device.session_config.capacity,
            "reverse device has been registered"
        );
        Ok(device)
    }

    /// Open a new, isolated session.
    ///
    /// # Errors
    ///
    /// Returns `Allocation` if the session buffer cannot be reserved.
    pub fn open(&self) -> Result<Session> {
        let guard = OpenGuard::new(&self.open);
        Session::open_inner(&self.session_config, Some(guard))
    }

    /// Device name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffer size given to every session.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.session_config.capacity
    }

    /// Settings applied to sessions opened from this device.
    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    /// Sessions opened from this device whose last handle is still alive.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }
}

impl Drop for ReverseDevice {
    fn drop(&mut self) {
        info!(
            device = %self.name,
            open_sessions = self.open_sessions(),
            "reverse device has been unregistered"
        );
    }
}
