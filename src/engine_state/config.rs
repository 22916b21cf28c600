//! # Engine Configuration
//!
//! Runtime configuration for the engine core. Every value that used to be a compile-time
//! constant (world extents, chunk size, view distance, scheduling intervals) lives here and
//! can be loaded from a JSON document.
//!
//! ## Example
//! ```rust
//! use blockscape::engine_state::config::{DetailLevel, EngineConfig};
//!
//! let config = EngineConfig::from_json_str(r#"{ "detail": "High", "seed": 7 }"#).unwrap();
//! assert_eq!(config.detail, DetailLevel::High);
//! assert_eq!(config.view_distance(), 4);
//! assert_eq!(config.dimensions.y, 64);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::engine_state::error::{EngineError, EngineResult};
use crate::engine_state::voxels::terrain::generation::TerrainSource;

/// Extents of the block grid, in blocks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldDimensions {
    /// Extent along X.
    pub x: usize,
    /// Extent along Y (height).
    pub y: usize,
    /// Extent along Z.
    pub z: usize,
}

impl WorldDimensions {
    /// Creates a new set of extents.
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Total number of cells in a grid of these extents.
    pub const fn volume(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl Default for WorldDimensions {
    fn default() -> Self {
        Self::new(256, 64, 256)
    }
}

/// Graphics detail presets. Each one fixes the view distance (in chunks), the interval
/// between chunk scheduling budget resets, and the block picking distance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailLevel {
    /// One chunk around the viewer.
    VeryLow,
    /// Two chunks around the viewer.
    Low,
    /// Three chunks around the viewer.
    Medium,
    /// Four chunks around the viewer.
    High,
    /// Ten chunks around the viewer.
    VeryHigh,
}

impl DetailLevel {
    /// View distance in chunks (Chebyshev radius).
    pub fn view_distance(&self) -> i32 {
        match self {
            DetailLevel::VeryLow => 1,
            DetailLevel::Low => 2,
            DetailLevel::Medium => 3,
            DetailLevel::High => 4,
            DetailLevel::VeryHigh => 10,
        }
    }

    /// Time between chunk scheduling budget resets.
    pub fn chunk_update_interval(&self) -> Duration {
        let millis = match self {
            DetailLevel::VeryLow => 800,
            DetailLevel::Low => 400,
            DetailLevel::Medium => 200,
            DetailLevel::High => 100,
            DetailLevel::VeryHigh => 50,
        };
        Duration::from_millis(millis)
    }

    /// Maximum distance at which blocks are considered for picking.
    pub fn pick_distance(&self) -> i32 {
        match self {
            DetailLevel::VeryLow | DetailLevel::Low => 4,
            DetailLevel::Medium => 6,
            DetailLevel::High | DetailLevel::VeryHigh => 8,
        }
    }
}

impl Default for DetailLevel {
    fn default() -> Self {
        DetailLevel::Medium
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extents of the block grid.
    pub dimensions: WorldDimensions,
    /// Horizontal chunk edge and vertical band height, in blocks.
    pub chunk_size: usize,
    /// Detail preset driving view distance and scheduling cadence.
    pub detail: DetailLevel,
    /// Allocate/free operations allowed per scheduling interval.
    pub max_chunk_updates: usize,
    /// Period after start-up during which the budget resets every frame.
    pub startup_burst_ms: u64,
    /// Minimum time between two lazy band builds of the same chunk.
    pub band_build_cooldown_ms: u64,
    /// Time between two lighting-only chunk refreshes. Defaults to the detail preset's
    /// scheduling interval when absent.
    pub light_refresh_interval_ms: Option<u64>,
    /// Time between two daylight factor evaluations.
    pub daylight_update_interval_ms: u64,
    /// Duration of half a day/night cycle.
    pub day_length_ms: u64,
    /// Keeps the daylight factor at full brightness.
    pub no_night: bool,
    /// Allocates every chunk and builds every band up front instead of streaming.
    pub keep_meshes: bool,
    /// Generator used for a fresh terrain.
    pub terrain_source: TerrainSource,
    /// Seed for every procedural generator.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimensions: WorldDimensions::default(),
            chunk_size: 16,
            detail: DetailLevel::default(),
            max_chunk_updates: 1,
            startup_burst_ms: 5000,
            band_build_cooldown_ms: 1000,
            light_refresh_interval_ms: None,
            daylight_update_interval_ms: 5000,
            day_length_ms: 240_000,
            no_night: false,
            keep_meshes: false,
            terrain_source: TerrainSource::Noise,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from a JSON string. Missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded engine configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that the grid can be split into whole chunks and bands.
    pub fn validate(&self) -> EngineResult<()> {
        let dims = self.dimensions;
        if dims.x == 0 || dims.y == 0 || dims.z == 0 {
            return Err(EngineError::InvalidDimensions(format!(
                "every extent must be positive, got {}x{}x{}",
                dims.x, dims.y, dims.z
            )));
        }
        if self.chunk_size == 0 {
            return Err(EngineError::InvalidDimensions(
                "chunk size must be positive".to_string(),
            ));
        }
        if dims.x % self.chunk_size != 0 || dims.z % self.chunk_size != 0 {
            return Err(EngineError::InvalidDimensions(format!(
                "horizontal extents {}x{} are not multiples of the chunk size {}",
                dims.x, dims.z, self.chunk_size
            )));
        }
        if dims.y % self.chunk_size != 0 {
            return Err(EngineError::InvalidDimensions(format!(
                "height {} is not a multiple of the band height {}",
                dims.y, self.chunk_size
            )));
        }
        if dims.y > i32::MAX as usize || dims.x > i32::MAX as usize || dims.z > i32::MAX as usize {
            return Err(EngineError::InvalidDimensions(
                "extents must fit in a signed 32-bit coordinate".to_string(),
            ));
        }
        Ok(())
    }

    /// View distance in chunks.
    pub fn view_distance(&self) -> i32 {
        self.detail.view_distance()
    }

    /// Time between chunk scheduling budget resets.
    pub fn chunk_update_interval(&self) -> Duration {
        self.detail.chunk_update_interval()
    }

    /// Time between lighting-only chunk refreshes.
    pub fn light_refresh_interval(&self) -> Duration {
        self.light_refresh_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.chunk_update_interval())
    }

    /// Period after start-up during which the budget resets every frame.
    pub fn startup_burst(&self) -> Duration {
        Duration::from_millis(self.startup_burst_ms)
    }

    /// Minimum time between two lazy band builds of one chunk.
    pub fn band_build_cooldown(&self) -> Duration {
        Duration::from_millis(self.band_build_cooldown_ms)
    }

    /// Number of chunks along X.
    pub fn chunks_x(&self) -> usize {
        self.dimensions.x / self.chunk_size
    }

    /// Number of chunks along Z.
    pub fn chunks_z(&self) -> usize {
        self.dimensions.z / self.chunk_size
    }

    /// Number of vertical bands per chunk.
    pub fn bands(&self) -> usize {
        self.dimensions.y / self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunks_x(), 16);
        assert_eq!(config.bands(), 4);
    }

    #[test]
    fn test_detail_presets() {
        assert_eq!(DetailLevel::VeryLow.view_distance(), 1);
        assert_eq!(DetailLevel::VeryHigh.view_distance(), 10);
        assert_eq!(
            DetailLevel::Low.chunk_update_interval(),
            Duration::from_millis(400)
        );
        assert_eq!(DetailLevel::High.pick_distance(), 8);
    }

    #[test]
    fn test_rejects_partial_chunks() {
        let config = EngineConfig {
            dimensions: WorldDimensions::new(100, 64, 128),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig {
            seed: 99,
            no_night: true,
            terrain_source: TerrainSource::Pyramid,
            ..EngineConfig::default()
        };
        let json = config.to_json_string().unwrap();
        let parsed = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_light_refresh_defaults_to_detail_interval() {
        let mut config = EngineConfig::default();
        assert_eq!(config.light_refresh_interval(), Duration::from_millis(200));
        config.light_refresh_interval_ms = Some(30);
        assert_eq!(config.light_refresh_interval(), Duration::from_millis(30));
    }
}
