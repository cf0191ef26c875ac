//! Bootstrap configuration
//!
//! A [`Configuration`] is resolved exactly once at startup from the process
//! environment (see [`resolver`]) and then passed explicitly to every
//! provisioning step and to the gateway launcher. Nothing else in the crate
//! reads environment variables for settings.
//!
//! ## Environment variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CUSTOM_USER`, `PASSWORD` | required |
//! | `MT5_API_HOST` | `0.0.0.0` |
//! | `MT5_API_PORT` | `5001` |
//! | `WINE_BIN` | `/usr/bin/wine` |
//! | `WINEPREFIX` | `/config/.wine` |
//! | `WINE_VERSION` | `9.0` |
//! | `WINE_INSTALL_COMMAND` | `apt-get install -y --install-recommends winehq-stable` |
//! | `PYTHON_VERSION` | `3.9.13` |
//! | `PYTHON_INSTALLER_URL` | python.org amd64 installer for `{version}` |
//! | `REQUIREMENTS_PATH` | `/app/requirements.txt` |
//! | `GATEWAY_SCRIPT` | `/app/app.py` |
//! | `MT5_BOOT_STATE_DIR` | `/config/.mt5-bootstrap` |
//! | `MT5_RECONNECT_ATTEMPTS` | `3` |
//! | `MT5_RECONNECT_BASE_DELAY` | `1.0` |
//! | `LOG_LEVEL` | `INFO` |
//! | `LOG_FORMAT` | `text` |

pub mod env;
pub mod resolver;

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::PathBuf;

pub use env::{EnvSource, ProcessEnv};
pub use resolver::resolve;

/// Environment variable names read by the resolver
pub mod vars {
    pub const USER: &str = "CUSTOM_USER";
    pub const PASSWORD: &str = "PASSWORD";
    pub const API_HOST: &str = "MT5_API_HOST";
    pub const API_PORT: &str = "MT5_API_PORT";
    pub const WINE_BIN: &str = "WINE_BIN";
    pub const WINE_PREFIX: &str = "WINEPREFIX";
    pub const WINE_VERSION: &str = "WINE_VERSION";
    pub const WINE_INSTALL_COMMAND: &str = "WINE_INSTALL_COMMAND";
    pub const PYTHON_VERSION: &str = "PYTHON_VERSION";
    pub const PYTHON_INSTALLER_URL: &str = "PYTHON_INSTALLER_URL";
    pub const REQUIREMENTS_PATH: &str = "REQUIREMENTS_PATH";
    pub const GATEWAY_SCRIPT: &str = "GATEWAY_SCRIPT";
    pub const STATE_DIR: &str = "MT5_BOOT_STATE_DIR";
    pub const RECONNECT_ATTEMPTS: &str = "MT5_RECONNECT_ATTEMPTS";
    pub const RECONNECT_BASE_DELAY: &str = "MT5_RECONNECT_BASE_DELAY";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Documented defaults for optional settings
pub mod defaults {
    pub const API_HOST: &str = "0.0.0.0";
    pub const API_PORT: u16 = 5001;
    pub const WINE_BIN: &str = "/usr/bin/wine";
    pub const WINE_PREFIX: &str = "/config/.wine";
    pub const WINE_VERSION: &str = "9.0";
    pub const WINE_INSTALL_COMMAND: &str = "apt-get install -y --install-recommends winehq-stable";
    pub const PYTHON_VERSION: &str = "3.9.13";
    pub const PYTHON_INSTALLER_URL: &str =
        "https://www.python.org/ftp/python/{version}/python-{version}-amd64.exe";
    pub const REQUIREMENTS_PATH: &str = "/app/requirements.txt";
    pub const GATEWAY_SCRIPT: &str = "/app/app.py";
    pub const STATE_DIR: &str = "/config/.mt5-bootstrap";
    pub const RECONNECT_ATTEMPTS: u32 = 3;
    pub const RECONNECT_BASE_DELAY: f64 = 1.0;
}

/// Resolved, validated bootstrap configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Remote-display login credentials
    pub credentials: Credentials,
    /// Gateway process settings
    pub gateway: GatewaySettings,
    /// Compatibility layer settings
    pub wine: WineSettings,
    /// Hosted Python runtime settings
    pub runtime: RuntimeSettings,
    /// Dependency manifest installed into the hosted runtime
    pub requirements_path: PathBuf,
    /// Directory holding the step log, markers and download cache
    pub state_dir: PathBuf,
    /// Logging settings
    pub logging: LogSettings,
}

/// Login credentials; the password never appears in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub script: PathBuf,
    pub reconnect_attempts: u32,
    pub reconnect_base_delay: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WineSettings {
    pub binary: PathBuf,
    pub prefix: PathBuf,
    /// Known-good Wine version, e.g. `9.0`
    pub version: String,
    /// Program and arguments used when Wine is missing
    pub install_command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub python_version: String,
    /// Installer URL template, `{version}` is substituted
    pub installer_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Log levels accepted in `LOG_LEVEL`, shared with the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Closest tracing level; tracing has no level above ERROR
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Configuration {
    /// Environment every process started inside the Wine prefix receives
    pub fn wine_env(&self) -> Vec<(String, String)> {
        vec![
            (
                vars::WINE_PREFIX.to_string(),
                self.wine.prefix.display().to_string(),
            ),
            ("WINEARCH".to_string(), "win64".to_string()),
            ("WINEDEBUG".to_string(), "-all".to_string()),
        ]
    }

    /// `host:port` the gateway binds to
    pub fn gateway_address(&self) -> String {
        if self.gateway.host.contains(':') {
            format!("[{}]:{}", self.gateway.host, self.gateway.port)
        } else {
            format!("{}:{}", self.gateway.host, self.gateway.port)
        }
    }

    /// Python installer URL with the configured version substituted
    pub fn python_installer_url(&self) -> String {
        self.runtime
            .installer_url
            .replace("{version}", &self.runtime.python_version)
    }

    /// Directory for cached installer downloads
    pub fn download_dir(&self) -> PathBuf {
        self.state_dir.join("downloads")
    }
}
