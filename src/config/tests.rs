//! Configuration resolution tests

#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::path::PathBuf;

use super::*;
use crate::error::BootError;

fn base_env() -> HashMap<&'static str, &'static str> {
    HashMap::from([(vars::USER, "trader"), (vars::PASSWORD, "s3cret")])
}

fn problems(env: &HashMap<&str, &str>) -> Vec<String> {
    match resolve(env) {
        Err(BootError::ConfigInvalid { problems }) => problems,
        other => panic!("Expected ConfigInvalid, got {other:?}"),
    }
}

#[test]
fn test_defaults_applied() {
    let config = resolve(&base_env()).expect("config should resolve");

    assert_eq!(config.credentials.user, "trader");
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 5001);
    assert_eq!(config.gateway.script, PathBuf::from("/app/app.py"));
    assert_eq!(config.wine.binary, PathBuf::from("/usr/bin/wine"));
    assert_eq!(config.wine.prefix, PathBuf::from("/config/.wine"));
    assert_eq!(config.wine.version, "9.0");
    assert_eq!(config.wine.install_command[0], "apt-get");
    assert_eq!(config.runtime.python_version, "3.9.13");
    assert_eq!(config.requirements_path, PathBuf::from("/app/requirements.txt"));
    assert_eq!(config.state_dir, PathBuf::from("/config/.mt5-bootstrap"));
    assert_eq!(config.gateway.reconnect_attempts, 3);
    assert_eq!(config.logging, LogSettings::default());
}

#[test]
fn test_overrides_applied() {
    let mut env = base_env();
    env.insert(vars::API_PORT, "6001");
    env.insert(vars::API_HOST, "127.0.0.1");
    env.insert(vars::WINE_INSTALL_COMMAND, "/opt/install-wine.sh --pin 9.0");
    env.insert(vars::LOG_LEVEL, "debug");
    env.insert(vars::LOG_FORMAT, "JSON");

    let config = resolve(&env).expect("config should resolve");

    assert_eq!(config.gateway.port, 6001);
    assert_eq!(config.gateway_address(), "127.0.0.1:6001");
    assert_eq!(
        config.wine.install_command,
        vec!["/opt/install-wine.sh", "--pin", "9.0"]
    );
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_missing_credentials_reports_every_field() {
    let problems = problems(&HashMap::new());

    assert_eq!(problems.len(), 2);
    assert!(problems[0].contains("CUSTOM_USER"));
    assert!(problems[1].contains("PASSWORD"));
}

#[test]
fn test_blank_credentials_are_missing() {
    let env = HashMap::from([(vars::USER, "  "), (vars::PASSWORD, "")]);
    assert_eq!(problems(&env).len(), 2);
}

#[test]
fn test_all_invalid_fields_reported_together() {
    let mut env = HashMap::new();
    env.insert(vars::PASSWORD, "pw");
    env.insert(vars::API_PORT, "not-a-port");
    env.insert(vars::RECONNECT_ATTEMPTS, "0");
    env.insert(vars::RECONNECT_BASE_DELAY, "-1");
    env.insert(vars::LOG_LEVEL, "VERBOSE");

    let problems = problems(&env);

    assert_eq!(problems.len(), 5, "got: {problems:?}");
    assert!(problems.iter().any(|p| p.contains("CUSTOM_USER")));
    assert!(problems.iter().any(|p| p.contains("MT5_API_PORT")));
    assert!(problems.iter().any(|p| p.contains("MT5_RECONNECT_ATTEMPTS")));
    assert!(problems.iter().any(|p| p.contains("MT5_RECONNECT_BASE_DELAY")));
    assert!(problems.iter().any(|p| p.contains("LOG_LEVEL")));
}

#[test]
fn test_port_zero_rejected() {
    let mut env = base_env();
    env.insert(vars::API_PORT, "0");
    let problems = problems(&env);
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("between 1 and 65535"));
}

#[test]
fn test_port_out_of_range_rejected() {
    let mut env = base_env();
    env.insert(vars::API_PORT, "70000");
    assert_eq!(problems(&env).len(), 1);
}

#[test]
fn test_blank_optional_uses_default() {
    let mut env = base_env();
    env.insert(vars::API_PORT, "");
    env.insert(vars::WINE_VERSION, " ");
    let config = resolve(&env).expect("config should resolve");
    assert_eq!(config.gateway.port, 5001);
    assert_eq!(config.wine.version, "9.0");
}

#[test]
fn test_password_redacted_in_debug() {
    let config = resolve(&base_env()).expect("config should resolve");
    let debug = format!("{config:?}");
    assert!(!debug.contains("s3cret"));
    assert!(debug.contains("<redacted>"));
}

#[test]
fn test_wine_env() {
    let config = resolve(&base_env()).expect("config should resolve");
    let env = config.wine_env();
    assert!(env.contains(&("WINEPREFIX".to_string(), "/config/.wine".to_string())));
    assert!(env.contains(&("WINEARCH".to_string(), "win64".to_string())));
}

#[test]
fn test_python_installer_url() {
    let mut env = base_env();
    env.insert(vars::PYTHON_VERSION, "3.10.11");
    let config = resolve(&env).expect("config should resolve");
    assert_eq!(
        config.python_installer_url(),
        "https://www.python.org/ftp/python/3.10.11/python-3.10.11-amd64.exe"
    );
}

#[test]
fn test_ipv6_gateway_address() {
    let mut env = base_env();
    env.insert(vars::API_HOST, "::");
    let config = resolve(&env).expect("config should resolve");
    assert_eq!(config.gateway_address(), "[::]:5001");
}

#[test]
fn test_log_level_maps_critical_to_error() {
    assert_eq!(LogLevel::Critical.as_tracing(), tracing::Level::ERROR);
    assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warning));
    assert_eq!(LogLevel::parse("TRACE"), None);
}
