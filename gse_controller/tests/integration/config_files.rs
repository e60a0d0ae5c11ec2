//! Shipped configuration files and loader failures on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use gse_common::config::ConfigError;
use gse_common::controller::{ControllerVariant, IgnitionConfig};
use gse_controller::config::load_config;
use tempfile::NamedTempFile;

use super::support::{FILL_TOML, PROP_TOML};

// ── Helpers ──

fn shipped(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../config")
        .join(name)
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ── Tests ──

#[test]
fn shipped_fill_config_loads() {
    let loaded = load_config(&shipped("fill.toml")).unwrap();
    assert_eq!(loaded.config.variant, ControllerVariant::Fill);
    assert!(loaded.ignition.is_none());
    assert_eq!(loaded.policy.rules().len(), 2);
    assert_eq!(loaded.mapping.position_of("BLEED"), Some(1));
    assert_eq!(loaded.safe_states.boot, loaded.safe_states.closed);
}

#[test]
fn shipped_prop_config_loads() {
    let loaded = load_config(&shipped("prop.toml")).unwrap();
    assert_eq!(loaded.config.variant, ControllerVariant::Prop);
    assert_eq!(loaded.ignition, Some(IgnitionConfig::default()));
    assert_eq!(loaded.mapping.pin(0), 4);
}

#[test]
fn boards_use_distinct_ports() {
    let fill = load_config(&shipped("fill.toml")).unwrap().config.network;
    let prop = load_config(&shipped("prop.toml")).unwrap().config.network;
    assert_ne!(fill.command_bind.port(), prop.command_bind.port());
    assert_ne!(fill.telemetry_bind.port(), prop.telemetry_bind.port());
    assert_ne!(fill.telemetry_target, prop.telemetry_target);
}

#[test]
fn unknown_interlock_relay_fails_validation() {
    let file = write_config(&PROP_TOML.replace("a = \"OMV\"", "a = \"LOX\""));
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)), "got {err:?}");
    assert!(err.to_string().contains("LOX"));
}

#[test]
fn interlocked_closed_state_fails_validation() {
    let file = write_config(&FILL_TOML.replace(
        "closed = [1, 1, 1, 1, 1, 0, 1, 0, 0, 0]",
        "closed = [1, 1, 1, 1, 1, 1, 1, 0, 0, 0]",
    ));
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)), "got {err:?}");
}

#[test]
fn truncated_file_is_a_parse_error() {
    let file = write_config(&FILL_TOML[..FILL_TOML.len() / 2]);
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn missing_file_is_reported() {
    assert!(matches!(
        load_config(&shipped("absent.toml")),
        Err(ConfigError::FileNotFound(_))
    ));
}
