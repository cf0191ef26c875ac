//! Logging setup
//!
//! All diagnostics go to stderr through `tracing`. `LOG_FORMAT=json` emits one
//! JSON object per line, the same shape the gateway logs in, so a container
//! log collector sees a single stream.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogSettings};

/// Install the global subscriber; later calls are ignored
pub fn init(settings: LogSettings, verbose: bool) {
    let level = effective_level(settings, verbose);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy("");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match settings.format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

/// `-v` always wins over `LOG_LEVEL`
pub fn effective_level(settings: LogSettings, verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        settings.level.as_tracing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_verbose_forces_debug() {
        let settings = LogSettings {
            level: LogLevel::Error,
            format: LogFormat::Text,
        };
        assert_eq!(effective_level(settings, true), Level::DEBUG);
        assert_eq!(effective_level(settings, false), Level::ERROR);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(LogSettings::default(), false);
        init(
            LogSettings {
                level: LogLevel::Debug,
                format: LogFormat::Json,
            },
            true,
        );
    }
}
