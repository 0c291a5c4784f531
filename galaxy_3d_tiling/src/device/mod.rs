//! Device module - the GPU interface the scene drives.
//!
//! The scene never talks to a graphics API directly. Everything it needs
//! (command pools and buffers, primary recording, submission, semaphores and
//! fences) goes through the [`SceneDevice`] trait, and every GPU object is an
//! opaque handle.

mod scene_device;

pub use scene_device::*;

// Mock device for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
