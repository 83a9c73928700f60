//! Tile source configuration.
//!
//! ```yaml
//! level_offset: 4
//! sea_level: 32767
//! ```

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Archive native level of quadtree level 0.
pub const DEFAULT_LEVEL_OFFSET: u32 = 4;

/// Sample value that represents zero elevation in a height raster.
pub const DEFAULT_SEA_LEVEL: u16 = 32767;

/// Largest accepted level offset.
pub const MAX_LEVEL_OFFSET: u32 = 16;

/// Configuration shared by all tile sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TileSourceConfig {
    /// Added to a quadtree level to get the archive's native level.
    pub level_offset: u32,
    /// Baseline added to elevations in meters so samples stay unsigned.
    pub sea_level: u16,
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            level_offset: DEFAULT_LEVEL_OFFSET,
            sea_level: DEFAULT_SEA_LEVEL,
        }
    }
}

impl TileSourceConfig {
    /// Parse a configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Check that values are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level_offset > MAX_LEVEL_OFFSET {
            return Err(ConfigError::Invalid(format!(
                "level_offset {} exceeds {}",
                self.level_offset, MAX_LEVEL_OFFSET
            )));
        }
        Ok(())
    }
}
