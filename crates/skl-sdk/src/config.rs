use std::path::Path;

use serde::{Deserialize, Serialize};
use skl_crypto::HashAlgorithm;
use skl_morsel::DecodeLimits;

use crate::error::{SdkError, SdkResult};
use crate::logging::LoggingConfig;

/// Top-level configuration, usually loaded from TOML:
///
/// ```toml
/// hash = "BLAKE3"
/// path_cache_capacity = 256
///
/// [logging]
/// level = "debug"
///
/// [limits]
/// max_ledgers = 16
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SklConfig {
    /// Hash algorithm for new ledgers and morsels.
    pub hash: HashAlgorithm,
    /// Built paths kept per ledger handle.
    pub path_cache_capacity: usize,
    pub logging: LoggingConfig,
    /// Bounds applied when decoding morsels.
    pub limits: DecodeLimits,
}

impl Default for SklConfig {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::default(),
            path_cache_capacity: 128,
            logging: LoggingConfig::default(),
            limits: DecodeLimits::default(),
        }
    }
}

impl SklConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.path_cache_capacity == 0 {
            return Err(SdkError::Config("path_cache_capacity must be at least 1".into()));
        }
        if self.limits.max_ledgers == 0 {
            return Err(SdkError::Config("limits.max_ledgers must be at least 1".into()));
        }
        self.logging.level()?;
        Ok(())
    }
}
