/// Scene - tiled static geometry with cached per-tile command buffers.
///
/// Objects are added once and land in the leaf tile containing their
/// position. Each frame, `update()` finds the visible tiles, records command
/// buffers for tiles that became visible (or reuses cached ones) and
/// assembles a primary command buffer executing them front to back.
/// `draw()` submits that primary.
///
/// Command buffers that drop out of use are retired with the serial of the
/// last submission that may reference them and freed once the frame fence
/// shows that submission has completed.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use slotmap::SlotMap;
use crate::camera::Camera;
use crate::device::{
    CommandBufferId, CommandBufferLevel, FenceId, FenceStatus, PipelineStage,
    RenderTarget, SceneDevice, SemaphoreId, SubmitInfo,
};
use crate::engine_bail;
use crate::error::{Error, Result};
use crate::geometry::AABB;
use crate::thread_pool::ThreadPool;
use super::callbacks::SceneCallbacks;
use super::config::SceneConfig;
use super::object::{ObjectInstance, ObjectKey, SceneObject};
use super::tile::{Tile, TileId};
use super::tile_grid::TileGrid;
use super::worker::{partition_roots, TileWorker, WorkerContext};

/// Interval of a single fence wait while blocking on the previous frame
const FENCE_POLL_INTERVAL: Duration = Duration::from_micros(1);

pub struct Scene {
    device: Arc<dyn SceneDevice>,
    callbacks: Arc<dyn SceneCallbacks>,
    camera: Camera,
    target: RenderTarget,
    config: SceneConfig,
    grid: TileGrid,
    objects: SlotMap<ObjectKey, SceneObject>,
    /// Set identifiers in registration order
    set_ids: Vec<String>,
    /// Objects were added since the last prepare
    dirty: bool,
    /// Tile contents changed since visibility was last computed
    visibility_stale: bool,
    workers: Vec<TileWorker>,
    /// `None` when running single-threaded
    thread_pool: Option<ThreadPool>,
    primary: Option<CommandBufferId>,
    /// Resource update recorded by the last `update()`, submitted by the next `draw()`
    resource_update: Option<CommandBufferId>,
    update_resources_semaphore: SemaphoreId,
    /// `update_resources_semaphore` was signaled by a draw whose frame never got submitted
    update_signal_pending: bool,
    draw_semaphore: SemaphoreId,
    fence: FenceId,
    /// A submission guarded by `fence` has not been waited on yet
    fence_active: bool,
    submitted_serial: u64,
    completed_serial: u64,
}

impl Scene {
    /// Create a scene.
    ///
    /// # Arguments
    ///
    /// * `device` - Device used for command pools, submission and synchronization
    /// * `callbacks` - Application hooks recording resources and tile draws
    /// * `camera` - Camera the scene culls against
    /// * `target` - Render pass and framebuffer the primary renders into
    /// * `config` - Grid layout, cache size and thread count
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `config` is rejected, including a thread
    /// count larger than the number of top-level tiles. Device errors while
    /// creating pools and synchronization objects are propagated.
    pub fn new(
        device: Arc<dyn SceneDevice>,
        callbacks: Arc<dyn SceneCallbacks>,
        camera: Camera,
        target: RenderTarget,
        config: SceneConfig,
    ) -> Result<Self> {
        if let Err(e) = config.validate() {
            crate::engine_error!("galaxy3d::Scene", "Rejected scene configuration: {}", e);
            return Err(e);
        }

        let grid = TileGrid::new(config.origin, config.size, config.tile_size, config.num_tile_levels);
        if config.num_threads > grid.root_count() {
            crate::engine_error!(
                "galaxy3d::Scene",
                "{} threads requested for {} top-level tiles",
                config.num_threads, grid.root_count()
            );
            return Err(Error::InvalidConfiguration(format!(
                "num_threads {} exceeds the number of top-level tiles {}",
                config.num_threads, grid.root_count()
            )));
        }

        let thread_pool = if config.num_threads > 1 {
            Some(ThreadPool::new(config.num_threads)?)
        } else {
            None
        };

        let workers = create_workers(&*device, &grid, &config)?;
        let (update_resources_semaphore, draw_semaphore, fence) = match create_sync_objects(&*device) {
            Ok(sync) => sync,
            Err(e) => {
                for worker in &workers {
                    device.destroy_command_pool(worker.pool());
                }
                return Err(e);
            }
        };

        crate::engine_info!(
            "galaxy3d::Scene",
            "Created scene: {} top-level tiles, {} tiles total, {} thread(s), cache size {}",
            grid.root_count(), grid.tile_count(), config.num_threads, config.cache_size
        );

        Ok(Self {
            device,
            callbacks,
            camera,
            target,
            config,
            grid,
            objects: SlotMap::with_key(),
            set_ids: Vec::new(),
            dirty: false,
            visibility_stale: false,
            workers,
            thread_pool,
            primary: None,
            resource_update: None,
            update_resources_semaphore,
            update_signal_pending: false,
            draw_semaphore,
            fence,
            fence_active: false,
            submitted_serial: 0,
            completed_serial: 0,
        })
    }

    // ===== OBJECTS =====

    /// Add a static object under `set_id`.
    ///
    /// Set identifiers are registered in first-use order; that order decides
    /// instance layout and `model_index`.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if the object's position is outside the scene area.
    pub fn add_object(&mut self, set_id: &str, object: SceneObject) -> Result<ObjectKey> {
        let key = self.objects.insert(object);
        if let Err(e) = self.grid.insert(set_id, key, &self.objects[key]) {
            crate::engine_warn!("galaxy3d::Scene", "Object not added to set '{}': {}", set_id, e);
            self.objects.remove(key);
            return Err(e);
        }

        if !self.set_ids.iter().any(|id| id == set_id) {
            self.set_ids.push(set_id.to_string());
        }
        self.dirty = true;
        Ok(key)
    }

    /// Rebuild tile lists and start indices if objects were added.
    ///
    /// Runs automatically from `update()`. Returns `true` if it did any work.
    pub fn prepare(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.grid.prepare(&self.set_ids);
        self.dirty = false;
        self.visibility_stale = true;
        true
    }

    /// `true` if `aabb` overlaps any object
    pub fn check_collision(&self, aabb: &AABB) -> bool {
        self.grid.check_collision(aabb, &self.objects)
    }

    /// Per-object instance data, indexed by draw start index.
    pub fn object_instances(&mut self) -> Vec<ObjectInstance> {
        self.collect_instances(false)
    }

    /// Instance data of shadow casters, indexed by shadow caster start index.
    pub fn shadow_caster_instances(&mut self) -> Vec<ObjectInstance> {
        self.collect_instances(true)
    }

    /// `object_instances()` as raw bytes, ready for upload
    pub fn object_instance_bytes(&mut self) -> Vec<u8> {
        bytemuck::cast_slice(&self.object_instances()).to_vec()
    }

    /// Top-level lists are the depth-first concatenation of their leaves,
    /// so walking them per set in tile order yields start index order.
    fn collect_instances(&mut self, shadow_casters_only: bool) -> Vec<ObjectInstance> {
        self.prepare();
        let mut instances = Vec::with_capacity(self.objects.len());
        for (model_index, set_id) in self.set_ids.iter().enumerate() {
            for root in self.grid.roots() {
                let Some(info) = self.grid.tile(root).set(set_id) else {
                    continue;
                };
                for key in &info.objects {
                    let Some(object) = self.objects.get(*key) else {
                        continue;
                    };
                    if shadow_casters_only && !object.casts_shadows {
                        continue;
                    }
                    instances.push(ObjectInstance::new(object, model_index as u32));
                }
            }
        }
        instances
    }

    // ===== FRAME =====

    /// Advance the scene by one frame.
    ///
    /// Prepares pending objects, frees command buffers the GPU has finished
    /// with, collects resource updates and, when the camera moved or tile
    /// contents changed, recomputes visibility and rebuilds the primary
    /// command buffer.
    pub fn update(&mut self) -> Result<()> {
        self.prepare();

        if self.fence_active && self.device.fence_status(self.fence)? == FenceStatus::Signaled {
            self.frame_completed()?;
        }

        let pool = self.workers[0].pool();
        if let Some(cb) = self.callbacks.update_resources(&*self.device, pool)? {
            // Never submitted, so no frame can still reference it
            if let Some(stale) = self.resource_update.replace(cb) {
                self.workers[0].cache_mut().retire(stale, None, self.submitted_serial);
            }
        }

        if self.visibility_stale || self.camera.is_dirty() {
            let result = self.update_visibility().and_then(|changed| {
                if changed || self.primary.is_none() {
                    self.build_primary()
                } else {
                    Ok(())
                }
            });
            if let Err(e) = result {
                // Workers may have retired buffers the current primary executes
                self.discard_primary();
                return Err(e);
            }
            self.visibility_stale = false;
            self.camera.reset_dirty();
        }

        Ok(())
    }

    /// Run every worker over its tiles, on the pool when there is one.
    fn update_visibility(&mut self) -> Result<bool> {
        let ranges: Vec<Range<usize>> = self.workers.iter().map(|w| w.roots()).collect();
        let ctx = WorkerContext {
            device: &*self.device,
            callbacks: &*self.callbacks,
            target: &self.target,
            frustum: self.camera.frustum(),
            set_ids: &self.set_ids,
            objects: &self.objects,
            submitted_serial: self.submitted_serial,
        };
        let spans = self.grid.split_spans(&ranges);

        let results: Vec<Result<bool>> = match &self.thread_pool {
            Some(pool) => {
                let jobs: Vec<_> = self.workers.iter_mut().zip(spans).collect();
                pool.run_jobs(jobs, |_, (worker, mut span)| worker.update(&mut span, &ctx))
            }
            None => self
                .workers
                .iter_mut()
                .zip(spans)
                .map(|(worker, mut span)| worker.update(&mut span, &ctx))
                .collect(),
        };

        let mut changed = false;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(worker_changed) => changed |= worker_changed,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(changed),
        }
    }

    /// Retire the primary so `draw()` refuses to submit until `update()` records a new one.
    fn discard_primary(&mut self) {
        if let Some(old) = self.primary.take() {
            self.workers[0].cache_mut().retire(old, None, self.submitted_serial);
            crate::engine_warn!("galaxy3d::Scene", "Discarded primary after a failed update");
        }
    }

    /// Record a primary executing every active tile, nearest first.
    fn build_primary(&mut self) -> Result<()> {
        let eye = self.camera.position();
        let mut tiles: Vec<(f32, TileId)> = self
            .workers
            .iter()
            .flat_map(|worker| worker.cache().active())
            .map(|id| (self.grid.tile(id).bounds().center().distance_squared(eye), id))
            .collect();
        tiles.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let secondaries: Vec<CommandBufferId> = tiles
            .iter()
            .filter_map(|(_, id)| self.grid.tile(*id).command_buffer())
            .collect();

        let pool = self.workers[0].pool();
        let primary = self.device.allocate_command_buffer(pool, CommandBufferLevel::Primary)?;
        let begin_info = self.callbacks.render_pass_begin_info(&self.target);
        if let Err(e) = self.device.record_primary(primary, &begin_info, &secondaries) {
            self.device.free_command_buffers(pool, &[primary]);
            return Err(e);
        }

        if let Some(old) = self.primary.replace(primary) {
            self.workers[0].cache_mut().retire(old, None, self.submitted_serial);
        }

        crate::engine_trace!(
            "galaxy3d::Scene",
            "Recorded primary with {} tile(s)",
            secondaries.len()
        );
        Ok(())
    }

    /// Submit the frame recorded by the last `update()`.
    ///
    /// A pending resource update is submitted first and the frame waits on
    /// it before writing color output. Returns the semaphore signaled when
    /// the frame finishes rendering.
    ///
    /// # Errors
    ///
    /// - `BackendError` if `update()` has not recorded a frame yet
    /// - `Timeout` if the previous frame exceeds `max_fence_wait`
    /// - device errors from submission and fence waits
    pub fn draw(&mut self) -> Result<SemaphoreId> {
        let Some(primary) = self.primary else {
            engine_bail!("galaxy3d::Scene", "draw() called before update() recorded a frame");
        };

        if let Some(cb) = self.resource_update.take() {
            // A signal left by a timed-out draw is consumed before signaling again
            let pending_wait = [(self.update_resources_semaphore, PipelineStage::TopOfPipe)];
            let update_waits: &[(SemaphoreId, PipelineStage)] =
                if self.update_signal_pending { &pending_wait } else { &[] };

            // Freed once the frame submitted below completes
            self.workers[0].cache_mut().retire(cb, None, self.submitted_serial + 1);
            self.device.submit(&SubmitInfo {
                command_buffers: &[cb],
                wait_semaphores: update_waits,
                signal_semaphores: &[self.update_resources_semaphore],
                fence: None,
            })?;
            self.update_signal_pending = true;
        }

        // On timeout the signal stays pending and the next draw waits on it
        self.wait_for_previous_frame()?;

        let mut wait_semaphores = Vec::new();
        if self.update_signal_pending {
            wait_semaphores.push((self.update_resources_semaphore, PipelineStage::ColorAttachmentOutput));
        }
        self.device.submit(&SubmitInfo {
            command_buffers: &[primary],
            wait_semaphores: &wait_semaphores,
            signal_semaphores: &[self.draw_semaphore],
            fence: Some(self.fence),
        })?;
        self.update_signal_pending = false;
        self.fence_active = true;
        self.submitted_serial += 1;

        Ok(self.draw_semaphore)
    }

    /// Block until the last submitted frame completes, then reclaim.
    fn wait_for_previous_frame(&mut self) -> Result<()> {
        if !self.fence_active {
            return Ok(());
        }

        let start = Instant::now();
        loop {
            match self.device.wait_for_fence(self.fence, FENCE_POLL_INTERVAL)? {
                FenceStatus::Signaled => break,
                FenceStatus::NotReady | FenceStatus::Timeout => {
                    if let Some(max_wait) = self.config.max_fence_wait {
                        if start.elapsed() >= max_wait {
                            crate::engine_error!(
                                "galaxy3d::Scene",
                                "Frame {} still running after {:?}",
                                self.submitted_serial, max_wait
                            );
                            return Err(Error::Timeout(format!(
                                "frame {} did not complete within {:?}",
                                self.submitted_serial, max_wait
                            )));
                        }
                    }
                }
            }
        }

        self.frame_completed()
    }

    /// The frame fence signaled: everything up to `submitted_serial` is done.
    fn frame_completed(&mut self) -> Result<()> {
        self.device.reset_fence(self.fence)?;
        self.fence_active = false;
        self.completed_serial = self.submitted_serial;

        let mut freed = 0;
        for worker in &mut self.workers {
            freed += worker.reclaim(&*self.device, self.completed_serial);
        }
        if freed > 0 {
            crate::engine_trace!(
                "galaxy3d::Scene",
                "Freed {} command buffer(s) after frame {}",
                freed, self.completed_serial
            );
        }
        Ok(())
    }

    // ===== GETTERS =====

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera; any change triggers a visibility update on the next `update()`.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn object(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Set identifiers in registration order
    pub fn set_ids(&self) -> &[String] {
        &self.set_ids
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        self.grid.tile(id)
    }

    pub fn workers(&self) -> &[TileWorker] {
        &self.workers
    }

    /// Tiles drawn by the current primary, in tile id order
    pub fn active_tiles(&self) -> Vec<TileId> {
        let mut tiles: Vec<TileId> = self.workers.iter().flat_map(|w| w.cache().active()).collect();
        tiles.sort();
        tiles
    }

    pub fn primary_command_buffer(&self) -> Option<CommandBufferId> {
        self.primary
    }

    pub fn draw_semaphore(&self) -> SemaphoreId {
        self.draw_semaphore
    }

    /// Number of frames submitted so far
    pub fn submitted_serial(&self) -> u64 {
        self.submitted_serial
    }

    /// Last frame known to have completed on the GPU
    pub fn completed_serial(&self) -> u64 {
        self.completed_serial
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_previous_frame() {
            crate::engine_warn!("galaxy3d::Scene", "Dropping scene without a completed frame: {}", e);
        }

        let ranges: Vec<Range<usize>> = self.workers.iter().map(|w| w.roots()).collect();
        let mut spans = self.grid.split_spans(&ranges);
        for (worker, span) in self.workers.iter_mut().zip(spans.iter_mut()) {
            worker.release(span, &*self.device);
        }

        let pool = self.workers[0].pool();
        let leftovers: Vec<CommandBufferId> =
            self.primary.take().into_iter().chain(self.resource_update.take()).collect();
        if !leftovers.is_empty() {
            self.device.free_command_buffers(pool, &leftovers);
        }

        for worker in &self.workers {
            self.device.destroy_command_pool(worker.pool());
        }
        self.device.destroy_semaphore(self.update_resources_semaphore);
        self.device.destroy_semaphore(self.draw_semaphore);
        self.device.destroy_fence(self.fence);

        crate::engine_debug!("galaxy3d::Scene", "Scene destroyed after {} frame(s)", self.submitted_serial);
    }
}

/// One command pool per worker; pools created before a failure are destroyed.
fn create_workers(device: &dyn SceneDevice, grid: &TileGrid, config: &SceneConfig) -> Result<Vec<TileWorker>> {
    let ranges = partition_roots(grid.root_count(), config.num_threads);
    let mut workers: Vec<TileWorker> = Vec::with_capacity(ranges.len());

    for (id, roots) in ranges.into_iter().enumerate() {
        match device.create_command_pool() {
            Ok(pool) => workers.push(TileWorker::new(id, roots, pool, config.cache_size)),
            Err(e) => {
                crate::engine_error!("galaxy3d::Scene", "Failed to create command pool {}: {}", id, e);
                for worker in &workers {
                    device.destroy_command_pool(worker.pool());
                }
                return Err(e);
            }
        }
    }
    Ok(workers)
}

/// Resource-update semaphore, draw semaphore and frame fence
fn create_sync_objects(device: &dyn SceneDevice) -> Result<(SemaphoreId, SemaphoreId, FenceId)> {
    let update_resources = device.create_semaphore()?;
    let draw = match device.create_semaphore() {
        Ok(semaphore) => semaphore,
        Err(e) => {
            device.destroy_semaphore(update_resources);
            return Err(e);
        }
    };
    match device.create_fence() {
        Ok(fence) => Ok((update_resources, draw, fence)),
        Err(e) => {
            device.destroy_semaphore(update_resources);
            device.destroy_semaphore(draw);
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
