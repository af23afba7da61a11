//! Subscriber installation. Kept in its own test binary because it installs a
//! global subscriber.

use revdev::config::RevdevConfig;
use revdev::telemetry::{self, OutputFormat, TracingConfig};
use tracing::Level;

#[test]
fn test_init_is_idempotent() {
    let config = TracingConfig::new(Level::DEBUG)
        .with_format(OutputFormat::Compact)
        .with_ansi(false);

    assert!(telemetry::init(config.clone()).is_ok());
    assert!(telemetry::init(config).is_ok());
    assert!(telemetry::init_from_config(&RevdevConfig::default()).is_ok());
}

#[test]
fn test_init_from_invalid_config_fails() {
    let mut config = RevdevConfig::default();
    config.logging.format = "xml".to_string();
    assert!(telemetry::init_from_config(&config).is_err());
}
