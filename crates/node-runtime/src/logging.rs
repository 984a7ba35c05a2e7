//! Logging bootstrap.
//!
//! `RUST_LOG` wins over the configured level, so a single run can be traced
//! without editing the config file.

use crate::config::LogConfig;
use crate::error::{NodeError, Result};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, else from the configured directive.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| NodeError::Logging(format!("bad level {:?}: {e}", config.level))),
    }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| NodeError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directives() {
        let config = LogConfig {
            level: "warn,sn_07_emitter=debug".into(),
            json: false,
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(env_filter(&config).is_ok());
            let bad = LogConfig {
                level: "sn_07_emitter=loud".into(),
                json: false,
            };
            assert!(matches!(env_filter(&bad), Err(NodeError::Logging(_))));
        }
    }
}
