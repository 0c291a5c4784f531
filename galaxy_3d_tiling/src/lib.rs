/*!
# Galaxy 3D Tiling

Tiled scene management for the Galaxy 3D engine.

Static objects are placed in a grid of tiles, each subdivided into an octree
down to a fixed depth. Every frame the scene culls tiles against the camera
frustum, records one secondary command buffer per visible tile (on worker
threads), keeps recently hidden tiles' buffers in a per-thread cache and
submits a primary command buffer executing the visible tiles nearest first.

## Architecture

- **SceneDevice**: GPU interface (command pools, submission, fences, semaphores)
- **SceneCallbacks**: application hooks recording tile draws and resource updates
- **Camera / Frustum**: view state and frustum classification
- **TileGrid**: static tile hierarchy, visibility queries, draw start indices
- **TileWorker / TileCommandCache**: per-thread recording and buffer reuse
- **Scene**: frame loop tying them together
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod camera;
pub mod device;
pub mod geometry;
pub mod scene;
mod thread_pool;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logging)
    pub use crate::engine::Engine;

    // Worker pool
    pub use crate::thread_pool::ThreadPool;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Device sub-module
    pub mod device {
        pub use crate::device::*;
    }

    // Geometry sub-module
    pub mod geometry {
        pub use crate::geometry::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
