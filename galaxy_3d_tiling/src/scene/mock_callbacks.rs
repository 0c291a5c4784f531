/// Mock SceneCallbacks for unit tests
///
/// Allocates real (mock) command buffers from the pools it is handed and
/// counts how often each hook runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::device::{
    ClearValue, CommandBufferId, CommandBufferLevel, CommandPoolId, RenderPassBeginInfo,
    RenderTarget, SceneDevice,
};
use crate::engine_bail;
use crate::error::Result;
use super::callbacks::{SceneCallbacks, TileSets};
use super::object::ObjectKey;

#[derive(Default)]
pub struct MockCallbacks {
    pub records: AtomicUsize,
    pub resource_updates: AtomicUsize,
    /// Return a resource command buffer from `update_resources`
    pub with_resource_updates: AtomicBool,
    /// Make `record_commands` fail
    pub fail_recording: AtomicBool,
    /// Objects seen by each `record_commands` call, in set order
    pub recorded_objects: Mutex<Vec<Vec<ObjectKey>>>,
}

impl MockCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_updates() -> Self {
        let callbacks = Self::default();
        callbacks.with_resource_updates.store(true, Ordering::SeqCst);
        callbacks
    }

    pub fn record_count(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }
}

impl SceneCallbacks for MockCallbacks {
    fn update_resources(&self, device: &dyn SceneDevice, pool: CommandPoolId) -> Result<Option<CommandBufferId>> {
        if !self.with_resource_updates.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.resource_updates.fetch_add(1, Ordering::SeqCst);
        Ok(Some(device.allocate_command_buffer(pool, CommandBufferLevel::Primary)?))
    }

    fn record_commands(
        &self,
        device: &dyn SceneDevice,
        pool: CommandPoolId,
        _target: &RenderTarget,
        sets: &TileSets<'_>,
    ) -> Result<CommandBufferId> {
        if self.fail_recording.load(Ordering::SeqCst) {
            engine_bail!("galaxy3d::test", "recording refused");
        }
        let objects: Vec<ObjectKey> = sets
            .iter()
            .flat_map(|(_, _, info)| info.objects.iter().copied())
            .collect();
        self.recorded_objects.lock().unwrap().push(objects);
        self.records.fetch_add(1, Ordering::SeqCst);
        device.allocate_command_buffer(pool, CommandBufferLevel::Secondary)
    }

    fn render_pass_begin_info(&self, target: &RenderTarget) -> RenderPassBeginInfo {
        RenderPassBeginInfo {
            render_pass: target.render_pass,
            framebuffer: target.framebuffer,
            render_area: target.render_area(),
            clear_values: vec![
                ClearValue::Color([0.0, 0.0, 0.0, 1.0]),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
        }
    }
}
