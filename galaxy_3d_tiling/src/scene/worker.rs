/// TileWorker - visibility and command recording for a run of top-level tiles.
///
/// The scene splits its top-level tiles into one contiguous range per
/// thread. Each worker owns a command pool, the tiles of its range (through
/// a `TileSpan` handed to it for the duration of an update) and a
/// `TileCommandCache`. Workers never touch each other's tiles.

use std::ops::Range;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::Frustum;
use crate::device::{CommandPoolId, RenderTarget, SceneDevice};
use crate::error::Result;
use super::cache::TileCommandCache;
use super::callbacks::{SceneCallbacks, TileSets};
use super::object::{ObjectKey, SceneObject};
use super::tile::TileId;
use super::tile_grid::TileSpan;

/// Read-only frame state shared by all workers during an update
pub(crate) struct WorkerContext<'a> {
    pub device: &'a dyn SceneDevice,
    pub callbacks: &'a dyn SceneCallbacks,
    pub target: &'a RenderTarget,
    pub frustum: &'a Frustum,
    pub set_ids: &'a [String],
    pub objects: &'a SlotMap<ObjectKey, SceneObject>,
    /// Serial of the most recent submission; retired buffers are tagged with it
    pub submitted_serial: u64,
}

/// Per-thread tile state
pub struct TileWorker {
    id: usize,
    roots: Range<usize>,
    pool: CommandPoolId,
    /// Tiles found visible by the last update, in top-level tile order
    visible: Vec<TileId>,
    cache: TileCommandCache,
}

/// Split `root_count` top-level tiles into `num_threads` contiguous ranges.
///
/// Every range gets `root_count / num_threads` tiles; the last one also takes
/// the remainder.
pub(crate) fn partition_roots(root_count: usize, num_threads: usize) -> Vec<Range<usize>> {
    let work_size = root_count / num_threads;
    (0..num_threads)
        .map(|i| {
            let start = i * work_size;
            let end = if i + 1 == num_threads { root_count } else { start + work_size };
            start..end
        })
        .collect()
}

impl TileWorker {
    pub(crate) fn new(id: usize, roots: Range<usize>, pool: CommandPoolId, cache_size: usize) -> Self {
        Self {
            id,
            roots,
            pool,
            visible: Vec::new(),
            cache: TileCommandCache::new(cache_size),
        }
    }

    // ===== GETTERS =====

    pub fn id(&self) -> usize {
        self.id
    }

    /// Top-level tiles owned by this worker
    pub fn roots(&self) -> Range<usize> {
        self.roots.clone()
    }

    pub fn pool(&self) -> CommandPoolId {
        self.pool
    }

    pub fn visible(&self) -> &[TileId] {
        &self.visible
    }

    pub fn cache(&self) -> &TileCommandCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut TileCommandCache {
        &mut self.cache
    }

    // ===== UPDATE =====

    /// Recompute visibility for this worker's tiles and keep command buffers in step.
    ///
    /// Tiles leaving the view move to the cache; the ones that expire from it
    /// have their command buffers retired. Tiles entering the view reuse
    /// their cached command buffer when it is still valid and are recorded
    /// otherwise. Visible tiles whose contents changed are re-recorded.
    ///
    /// Returns `true` if the set of active tiles or any of their command
    /// buffers changed.
    pub(crate) fn update(&mut self, span: &mut TileSpan<'_>, ctx: &WorkerContext<'_>) -> Result<bool> {
        let current = span.view().find_visible_tiles(ctx.frustum.bounds(), ctx.frustum);
        let current_set: FxHashSet<TileId> = current.iter().copied().collect();
        let mut changed = false;

        for &id in &self.visible {
            if current_set.contains(&id) || !self.cache.is_active(id) {
                continue;
            }
            changed = true;
            if let Some(expired) = self.cache.deactivate(id) {
                if let Some(cb) = span.get_mut(expired).command_buffer.take() {
                    self.cache.retire(cb, Some(expired), ctx.submitted_serial);
                }
            }
        }

        // Set before recording so a failed update still deactivates these tiles next time
        self.visible = current.clone();

        let mut recorded = 0usize;
        let mut reused = 0usize;
        for &id in &current {
            if self.cache.is_active(id) {
                if span.get(id).dirty {
                    self.record(span, id, ctx)?;
                    recorded += 1;
                    changed = true;
                }
                continue;
            }

            changed = true;
            let was_cached = self.cache.take_cached(id);
            let tile = span.get(id);
            if was_cached && tile.command_buffer.is_some() && !tile.dirty {
                reused += 1;
            } else {
                self.record(span, id, ctx)?;
                recorded += 1;
            }
            self.cache.activate(id);
        }

        if changed {
            crate::engine_trace!(
                "galaxy3d::TileWorker",
                "Worker {}: {} visible, {} recorded, {} reused, {} cached",
                self.id, current.len(), recorded, reused, self.cache.cached_count()
            );
        }

        Ok(changed)
    }

    /// Record a tile's command buffer, retiring the previous one.
    fn record(&mut self, span: &mut TileSpan<'_>, id: TileId, ctx: &WorkerContext<'_>) -> Result<()> {
        let tile = span.get_mut(id);
        if let Some(old) = tile.command_buffer.take() {
            self.cache.retire(old, Some(id), ctx.submitted_serial);
        }

        let sets = TileSets::new(&tile.sets, ctx.set_ids, ctx.objects);
        let cb = ctx.callbacks.record_commands(ctx.device, self.pool, ctx.target, &sets)?;
        tile.command_buffer = Some(cb);
        tile.dirty = false;
        Ok(())
    }

    // ===== RECLAMATION =====

    /// Free retired command buffers the GPU has finished with.
    pub(crate) fn reclaim(&mut self, device: &dyn SceneDevice, completed_serial: u64) -> usize {
        let reclaimed = self.cache.take_reclaimable(completed_serial);
        if !reclaimed.is_empty() {
            device.free_command_buffers(self.pool, &reclaimed);
        }
        reclaimed.len()
    }

    /// Free every command buffer this worker owns. The GPU must be idle.
    pub(crate) fn release(&mut self, span: &mut TileSpan<'_>, device: &dyn SceneDevice) {
        let mut buffers = self.cache.take_all_retired();
        buffers.extend(span.tiles_mut().filter_map(|tile| tile.command_buffer.take()));
        self.cache.clear();
        self.visible.clear();
        if !buffers.is_empty() {
            device.free_command_buffers(self.pool, &buffers);
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
