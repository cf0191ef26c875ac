//! Environment resolver
//!
//! Reads the fixed set of bootstrap variables, applies defaults and validates
//! the result. Validation never stops at the first problem: every missing or
//! invalid field is collected and reported in a single error.

use std::path::PathBuf;
use std::str::FromStr;

use super::{
    Configuration, Credentials, EnvSource, GatewaySettings, LogFormat, LogLevel, LogSettings,
    RuntimeSettings, WineSettings, defaults, vars,
};
use crate::error::{self, Result};

/// Resolve and validate the bootstrap configuration
pub fn resolve(env: &impl EnvSource) -> Result<Configuration> {
    let mut reader = Reader {
        env,
        problems: Vec::new(),
    };

    let credentials = Credentials {
        user: reader.required(vars::USER),
        password: reader.required(vars::PASSWORD),
    };

    let gateway = GatewaySettings {
        host: reader.string_or(vars::API_HOST, defaults::API_HOST),
        port: reader.port(vars::API_PORT, defaults::API_PORT),
        script: reader.path_or(vars::GATEWAY_SCRIPT, defaults::GATEWAY_SCRIPT),
        reconnect_attempts: reader.reconnect_attempts(),
        reconnect_base_delay: reader.reconnect_base_delay(),
    };

    let wine = WineSettings {
        binary: reader.path_or(vars::WINE_BIN, defaults::WINE_BIN),
        prefix: reader.path_or(vars::WINE_PREFIX, defaults::WINE_PREFIX),
        version: reader.string_or(vars::WINE_VERSION, defaults::WINE_VERSION),
        install_command: reader.command(vars::WINE_INSTALL_COMMAND, defaults::WINE_INSTALL_COMMAND),
    };

    let runtime = RuntimeSettings {
        python_version: reader.string_or(vars::PYTHON_VERSION, defaults::PYTHON_VERSION),
        installer_url: reader.string_or(vars::PYTHON_INSTALLER_URL, defaults::PYTHON_INSTALLER_URL),
    };

    let logging = LogSettings {
        level: reader.log_level(),
        format: reader.log_format(),
    };

    let requirements_path = reader.path_or(vars::REQUIREMENTS_PATH, defaults::REQUIREMENTS_PATH);
    let state_dir = reader.path_or(vars::STATE_DIR, defaults::STATE_DIR);

    if !reader.problems.is_empty() {
        return Err(error::config::invalid(reader.problems));
    }

    Ok(Configuration {
        credentials,
        gateway,
        wine,
        runtime,
        requirements_path,
        state_dir,
        logging,
    })
}

/// Collects values and validation problems in one pass
struct Reader<'a, E: EnvSource> {
    env: &'a E,
    problems: Vec<String>,
}

impl<E: EnvSource> Reader<'_, E> {
    /// Non-empty value, or `None` when unset or blank
    fn value(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, key: &str) -> String {
        if let Some(value) = self.value(key) {
            value
        } else {
            self.problems.push(format!("{key} is required but not set"));
            String::new()
        }
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.value(key).unwrap_or_else(|| default.to_string())
    }

    fn path_or(&self, key: &str, default: &str) -> PathBuf {
        PathBuf::from(self.string_or(key, default))
    }

    fn parsed_or<T: FromStr>(&mut self, key: &str, default: T, expected: &str) -> T {
        let Some(raw) = self.value(key) else {
            return default;
        };
        raw.parse().unwrap_or_else(|_| {
            self.problems
                .push(format!("{key} must be {expected}, got '{raw}'"));
            default
        })
    }

    fn port(&mut self, key: &str, default: u16) -> u16 {
        let port = self.parsed_or(key, default, "a port number between 1 and 65535");
        if port == 0 {
            self.problems
                .push(format!("{key} must be a port number between 1 and 65535, got '0'"));
        }
        port
    }

    fn command(&mut self, key: &str, default: &str) -> Vec<String> {
        let line = self.string_or(key, default);
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            self.problems.push(format!("{key} must name a program"));
        }
        words
    }

    fn reconnect_attempts(&mut self) -> u32 {
        let attempts = self.parsed_or(
            vars::RECONNECT_ATTEMPTS,
            defaults::RECONNECT_ATTEMPTS,
            "a positive integer",
        );
        if attempts < 1 {
            self.problems
                .push(format!("{} must be at least 1", vars::RECONNECT_ATTEMPTS));
        }
        attempts
    }

    fn reconnect_base_delay(&mut self) -> f64 {
        let delay = self.parsed_or(
            vars::RECONNECT_BASE_DELAY,
            defaults::RECONNECT_BASE_DELAY,
            "a number of seconds",
        );
        if !(delay.is_finite() && delay > 0.0) {
            self.problems
                .push(format!("{} must be positive", vars::RECONNECT_BASE_DELAY));
        }
        delay
    }

    fn log_level(&mut self) -> LogLevel {
        let Some(raw) = self.value(vars::LOG_LEVEL) else {
            return LogLevel::default();
        };
        LogLevel::parse(&raw).unwrap_or_else(|| {
            self.problems.push(format!(
                "{} must be one of DEBUG, INFO, WARNING, ERROR, CRITICAL, got '{raw}'",
                vars::LOG_LEVEL
            ));
            LogLevel::default()
        })
    }

    fn log_format(&mut self) -> LogFormat {
        let Some(raw) = self.value(vars::LOG_FORMAT) else {
            return LogFormat::default();
        };
        LogFormat::parse(&raw).unwrap_or_else(|| {
            self.problems.push(format!(
                "{} must be 'text' or 'json', got '{raw}'",
                vars::LOG_FORMAT
            ));
            LogFormat::default()
        })
    }
}
