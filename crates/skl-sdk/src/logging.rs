use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{SdkError, SdkResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> SdkResult<Level> {
        Level::from_str(&self.level)
            .map_err(|_| SdkError::Config(format!("unknown log level {:?}", self.level)))
    }
}

/// Install a global `fmt` subscriber at the configured level.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> SdkResult<()> {
    let level = config.level()?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .map_err(|e| SdkError::Logging(e.to_string()))
}
