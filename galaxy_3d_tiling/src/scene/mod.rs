//! Scene module - tiled static geometry and per-tile command buffer caching.
//!
//! Objects are bucketed into a fixed octree-per-tile grid. Each frame the
//! visible tiles are found, their secondary command buffers are recorded or
//! taken from a per-thread cache, and a primary executing them is submitted.

mod cache;
mod callbacks;
mod config;
mod object;
mod scene;
mod tile;
mod tile_grid;
mod worker;

pub use cache::{RetiredCommandBuffer, TileCommandCache};
pub use callbacks::{SceneCallbacks, TileSets};
pub use config::SceneConfig;
pub use object::{ObjectInstance, ObjectKey, SceneObject};
pub use scene::Scene;
pub use tile::{SetInfo, Tile, TileId};
pub use tile_grid::TileGrid;
pub use worker::TileWorker;

// Mock callbacks for tests
#[cfg(test)]
pub(crate) mod mock_callbacks;
