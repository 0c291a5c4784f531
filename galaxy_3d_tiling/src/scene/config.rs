/// Scene configuration

use std::time::Duration;
use glam::Vec3;
use crate::error::{Error, Result};

/// Parameters fixed at scene creation
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Minimum corner of the tiled area
    pub origin: Vec3,
    /// Extent of the tiled area
    pub size: Vec3,
    /// Size of a top-level tile; each subdivision level halves it
    pub tile_size: Vec3,
    /// Number of levels including the top level (1 = no subdivision)
    pub num_tile_levels: u32,
    /// Maximum number of inactive tiles per thread that keep their command buffer
    pub cache_size: usize,
    /// Worker threads for visibility updates (1 = run on the calling thread)
    pub num_threads: usize,
    /// Upper bound on waiting for the previous frame; `None` waits forever
    pub max_fence_wait: Option<Duration>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            size: Vec3::splat(200.0),
            tile_size: Vec3::splat(50.0),
            num_tile_levels: 3,
            cache_size: 16,
            num_threads: 1,
            max_fence_wait: None,
        }
    }
}

impl SceneConfig {
    /// Reject configurations no grid can be built from. The thread count is
    /// checked against the tile count once the grid exists.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.tile_size.cmple(Vec3::ZERO).any() {
            return Err(Error::InvalidConfiguration(format!(
                "tile size must be positive on every axis, got {:?}", self.tile_size
            )));
        }
        if self.tile_size.cmpgt(self.size).any() {
            return Err(Error::InvalidConfiguration(format!(
                "tile size {:?} exceeds scene size {:?}", self.tile_size, self.size
            )));
        }
        if self.num_tile_levels == 0 {
            return Err(Error::InvalidConfiguration(
                "num_tile_levels must be at least 1".to_string(),
            ));
        }
        if self.num_tile_levels > 8 {
            return Err(Error::InvalidConfiguration(format!(
                "num_tile_levels {} is too deep (max 8)", self.num_tile_levels
            )));
        }
        if self.num_threads == 0 {
            return Err(Error::InvalidConfiguration(
                "num_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
