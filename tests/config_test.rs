//! Layered configuration loading: defaults, TOML file, then environment.
//!
//! Tests that touch `REVDEV_*` variables run under `#[serial]` since the
//! process environment is shared between test threads.

use revdev::config::RevdevConfig;
use revdev::{ChannelError, ReverseDevice};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = RevdevConfig::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, RevdevConfig::default());
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let file = write_config(
        r#"
[device]
name = "mirror"
buffer_size = 4096
read_timeout = "250ms"

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = RevdevConfig::load_from(file.path()).unwrap();
    assert_eq!(config.device.name, "mirror");
    assert_eq!(config.device.buffer_size, 4096);
    assert_eq!(config.device.read_timeout, Duration::from_millis(250));
    // Not set in the file, so the default survives.
    assert_eq!(config.device.lock_poll, Duration::from_millis(10));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
[device]
buffer_size = 4096
"#,
    );

    std::env::set_var("REVDEV_DEVICE__BUFFER_SIZE", "1024");
    std::env::set_var("REVDEV_LOGGING__LEVEL", "warn");
    let loaded = RevdevConfig::load_from(file.path());
    std::env::remove_var("REVDEV_DEVICE__BUFFER_SIZE");
    std::env::remove_var("REVDEV_LOGGING__LEVEL");

    let config = loaded.unwrap();
    assert_eq!(config.device.buffer_size, 1024);
    assert_eq!(config.logging.level, "warn");
}

#[test]
#[serial]
fn test_malformed_duration_is_a_load_error() {
    let file = write_config(
        r#"
[device]
read_timeout = "soon"
"#,
    );
    assert!(RevdevConfig::load_from(file.path()).is_err());
}

#[test]
#[serial]
fn test_zero_buffer_size_loads_but_device_refuses() {
    let file = write_config(
        r#"
[device]
buffer_size = 0
"#,
    );

    let config = RevdevConfig::load_from(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(ChannelError::Config(_))));
    assert!(matches!(
        ReverseDevice::register(&config.device),
        Err(ChannelError::Config(_))
    ));
}

#[test]
#[serial]
fn test_loaded_config_drives_sessions() {
    let file = write_config(
        r#"
[device]
buffer_size = 16
read_timeout = "20ms"
"#,
    );

    let config = RevdevConfig::load_from(file.path()).unwrap();
    let device = ReverseDevice::register(&config.device).unwrap();
    let session = device.open().unwrap();

    assert_eq!(session.capacity(), 16);
    assert_eq!(session.read_timeout(), Duration::from_millis(20));
    assert!(matches!(
        session.write(&[0u8; 17]),
        Err(ChannelError::Overflow { .. })
    ));
}
