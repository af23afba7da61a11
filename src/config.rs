//! Configuration loading using Figment.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (8192 byte buffer, 1 s read timeout)
//! 2. `config/revdev.toml` (or an explicit path)
//! 3. Environment variables prefixed with `REVDEV_`, nested with `__`
//!
//! # Example
//! ```no_run
//! use revdev::config::RevdevConfig;
//!
//! let config = RevdevConfig::load()?;
//! config.validate()?;
//! println!("buffer size: {}", config.device.buffer_size);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ```toml
//! [device]
//! name = "reverse"
//! buffer_size = 8192
//! read_timeout = "1s"
//! lock_poll = "10ms"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use crate::error::{ChannelError, Result};
use crate::gate::{DEFAULT_LOCK_POLL, DEFAULT_READ_TIMEOUT};
use crate::session::{SessionConfig, DEFAULT_CAPACITY};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/revdev.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "REVDEV_";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevdevConfig {
    /// Device and session settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device settings applied to every session it opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name used in logs
    #[serde(default = "default_name")]
    pub name: String,
    /// Internal buffer size in bytes; zero refuses to initialize
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Bound on each data wait of a blocking read
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Slice between interrupt checks while waiting for the lock
    #[serde(default = "default_lock_poll", with = "humantime_serde")]
    pub lock_poll: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_format")]
    pub format: String,
}

// Default value functions
fn default_name() -> String {
    "reverse".to_string()
}

fn default_buffer_size() -> usize {
    DEFAULT_CAPACITY
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

fn default_lock_poll() -> Duration {
    DEFAULT_LOCK_POLL
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            buffer_size: default_buffer_size(),
            read_timeout: default_read_timeout(),
            lock_poll: default_lock_poll(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl DeviceConfig {
    /// Validate device settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a zero buffer size or zero durations.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ChannelError::Config(
                "buffer_size must be a positive number of bytes".into(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(ChannelError::Config("read_timeout must be non-zero".into()));
        }
        if self.lock_poll.is_zero() {
            return Err(ChannelError::Config("lock_poll must be non-zero".into()));
        }
        Ok(())
    }

    /// Session settings derived from this device configuration.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::with_capacity(self.buffer_size)
            .read_timeout(self.read_timeout)
            .lock_poll(self.lock_poll)
    }
}

impl LoggingConfig {
    /// Validate logging settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unknown level or format.
    pub fn validate(&self) -> Result<()> {
        if !VALID_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ChannelError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.level,
                VALID_LEVELS.join(", ")
            )));
        }
        if !VALID_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ChannelError::Config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.format,
                VALID_FORMATS.join(", ")
            )));
        }
        Ok(())
    }
}

impl RevdevConfig {
    /// Load configuration from `config/revdev.toml` and environment variables
    ///
    /// Environment variables override the file with prefix `REVDEV_`.
    /// Example: `REVDEV_DEVICE__BUFFER_SIZE=4096`
    ///
    /// # Errors
    ///
    /// Returns a figment error if a source cannot be parsed.
    pub fn load() -> std::result::Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns a figment error if a source cannot be parsed.
    pub fn load_from<P: AsRef<Path>>(path: P) -> std::result::Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// The layered provider used by [`load_from`](RevdevConfig::load_from).
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(RevdevConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.device.validate()?;
        self.logging.validate()
    }
}
