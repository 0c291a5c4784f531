/// TileCommandCache - per-worker bookkeeping of recorded tile command buffers.
///
/// A visible tile is *active*. A tile that leaves the view moves to the front
/// of the *cached* list and keeps its command buffer, so it can come back
/// without being re-recorded. Once the cached list is full, the least
/// recently deactivated tile expires and its command buffer is retired.
///
/// Retired command buffers are not freed right away: the GPU may still be
/// executing a frame that references them. Each one is tagged with the serial
/// of the last submission that could use it and handed back once that
/// submission has completed.

use std::collections::VecDeque;
use rustc_hash::FxHashSet;
use crate::device::CommandBufferId;
use super::tile::TileId;

/// Command buffer waiting for the GPU to finish with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetiredCommandBuffer {
    pub command_buffer: CommandBufferId,
    /// Tile the buffer was recorded for (`None` for primaries and resource updates)
    pub tile: Option<TileId>,
    /// Serial of the last submission that may reference the buffer
    pub last_use: u64,
}

/// Active set, LRU cache of inactive tiles and free list of one worker
#[derive(Debug, Default)]
pub struct TileCommandCache {
    active: FxHashSet<TileId>,
    /// Most recently deactivated first
    cached: VecDeque<TileId>,
    max_size: usize,
    free_list: Vec<RetiredCommandBuffer>,
}

impl TileCommandCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            active: FxHashSet::default(),
            cached: VecDeque::with_capacity(max_size),
            max_size,
            free_list: Vec::new(),
        }
    }

    // ===== GETTERS =====

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_active(&self, tile: TileId) -> bool {
        self.active.contains(&tile)
    }

    pub fn is_cached(&self, tile: TileId) -> bool {
        self.cached.contains(&tile)
    }

    pub fn active(&self) -> impl Iterator<Item = TileId> + '_ {
        self.active.iter().copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Cached tiles, most recently deactivated first
    pub fn cached(&self) -> impl Iterator<Item = TileId> + '_ {
        self.cached.iter().copied()
    }

    pub fn cached_count(&self) -> usize {
        self.cached.len()
    }

    pub fn free_list(&self) -> &[RetiredCommandBuffer] {
        &self.free_list
    }

    // ===== ACTIVE / CACHED =====

    /// Remove `tile` from the cached list. Returns `true` if it was there.
    pub fn take_cached(&mut self, tile: TileId) -> bool {
        match self.cached.iter().position(|t| *t == tile) {
            Some(pos) => {
                self.cached.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn activate(&mut self, tile: TileId) {
        self.active.insert(tile);
    }

    /// Move `tile` from the active set to the front of the cached list.
    ///
    /// Returns the tile whose command buffer expired as a result: the least
    /// recently deactivated one when the list was full, or `tile` itself when
    /// caching is disabled.
    pub fn deactivate(&mut self, tile: TileId) -> Option<TileId> {
        self.active.remove(&tile);

        if self.max_size == 0 {
            return Some(tile);
        }

        let expired = if self.cached.len() >= self.max_size {
            self.cached.pop_back()
        } else {
            None
        };
        self.cached.push_front(tile);
        expired
    }

    /// Forget every active and cached tile. Retired buffers are kept.
    pub fn clear(&mut self) -> Vec<TileId> {
        let mut tiles: Vec<TileId> = self.active.drain().collect();
        tiles.extend(self.cached.drain(..));
        tiles
    }

    // ===== FREE LIST =====

    pub fn retire(&mut self, command_buffer: CommandBufferId, tile: Option<TileId>, last_use: u64) {
        self.free_list.push(RetiredCommandBuffer { command_buffer, tile, last_use });
    }

    /// Remove and return the buffers whose last use is at or before `completed_serial`.
    pub fn take_reclaimable(&mut self, completed_serial: u64) -> Vec<CommandBufferId> {
        let mut reclaimed = Vec::new();
        self.free_list.retain(|retired| {
            if retired.last_use <= completed_serial {
                reclaimed.push(retired.command_buffer);
                false
            } else {
                true
            }
        });
        reclaimed
    }

    /// Remove and return every retired buffer regardless of GPU progress
    pub fn take_all_retired(&mut self) -> Vec<CommandBufferId> {
        self.free_list.drain(..).map(|retired| retired.command_buffer).collect()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
