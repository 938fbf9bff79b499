//! File-based configuration.
//!
//! ```toml
//! data_dir = "/var/lib/berth"
//!
//! [durability]
//! mode = "batched"      # "none" | "strict" | "batched"
//! interval_ms = 100
//! batch_size = 1000
//! ```

use crate::error::{Error, Result};
use berth_durability::DurabilityMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration for a [`Berth`](crate::Berth) instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BerthConfig {
    /// Directory holding the write-ahead log; in-memory when absent
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// WAL sync policy
    #[serde(default)]
    pub durability: DurabilityConfig,
}

/// The `[durability]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurabilityConfig {
    /// Sync policy name
    #[serde(default)]
    pub mode: ModeName,
    /// Maximum time between fsyncs in batched mode
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum writes between fsyncs in batched mode
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Durability mode as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    /// No WAL
    None,
    /// fsync every commit
    Strict,
    /// fsync on interval or batch size
    #[default]
    Batched,
}

fn default_interval_ms() -> u64 {
    100
}

fn default_batch_size() -> usize {
    1000
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            mode: ModeName::default(),
            interval_ms: default_interval_ms(),
            batch_size: default_batch_size(),
        }
    }
}

impl DurabilityConfig {
    /// Resolve to a [`DurabilityMode`], rejecting a zero batch size.
    pub fn to_mode(&self) -> Result<DurabilityMode> {
        Ok(match self.mode {
            ModeName::None => DurabilityMode::None,
            ModeName::Strict => DurabilityMode::Strict,
            ModeName::Batched => {
                if self.batch_size == 0 {
                    return Err(Error::Config("durability.batch_size must be at least 1".into()));
                }
                DurabilityMode::Batched {
                    interval_ms: self.interval_ms,
                    batch_size: self.batch_size,
                }
            }
        })
    }
}

impl From<DurabilityMode> for DurabilityConfig {
    fn from(mode: DurabilityMode) -> Self {
        match mode {
            DurabilityMode::None => Self {
                mode: ModeName::None,
                ..Self::default()
            },
            DurabilityMode::Strict => Self {
                mode: ModeName::Strict,
                ..Self::default()
            },
            DurabilityMode::Batched {
                interval_ms,
                batch_size,
            } => Self {
                mode: ModeName::Batched,
                interval_ms,
                batch_size,
            },
        }
    }
}

impl BerthConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.durability.to_mode()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolved durability mode.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        self.durability.to_mode()
    }
}

impl FromStr for BerthConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_toml_str(s)
    }
}
