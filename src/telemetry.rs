//! Logging setup for the binary.
//!
//! `RUST_LOG` wins; otherwise `[logging] level` from the config, otherwise
//! `info`. Logs go to stderr so report output on stdout stays clean.

use tracing_subscriber::EnvFilter;

use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LEVEL: &str = "info";

/// Filter directive from the config, falling back to [`DEFAULT_LEVEL`].
pub fn configured_level(config: Option<&dyn ConfigPort>) -> String {
    config
        .and_then(|c| c.get_trimmed("logging", "level"))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Install the global fmt subscriber. A second call is a no-op.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn level_from_config() {
        let config = FileConfigAdapter::from_string("[logging]\nlevel = debug\n").unwrap();
        assert_eq!(configured_level(Some(&config)), "debug");
    }

    #[test]
    fn level_defaults_to_info() {
        let config = FileConfigAdapter::from_string("[logging]\nlevel =\n").unwrap();
        assert_eq!(configured_level(Some(&config)), "info");
        assert_eq!(configured_level(None), "info");
    }

    #[test]
    fn init_twice_is_harmless() {
        init("warn");
        init("not a level!!");
    }
}
