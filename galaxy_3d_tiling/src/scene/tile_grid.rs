/// TileGrid - the scene's static tile hierarchy.
///
/// The scene area is cut into a `w × h × d` grid of top-level tiles and each
/// tile is subdivided into octants down to a fixed number of levels. All
/// tiles are allocated up front in one flat arena: every top-level tile owns
/// a contiguous, depth-first block of `nodes_per_root` entries (itself, then
/// its subtrees). Contiguous root ranges therefore map to contiguous arena
/// ranges, which is what lets worker threads own disjoint `&mut [Tile]`.
///
/// Top-level tiles are ordered `y * w * d + z * w + x`; children follow the
/// octant order `(y << 2) + (z << 1) + x`.

use std::ops::Range;
use glam::{UVec3, Vec3};
use slotmap::SlotMap;
use crate::camera::{Frustum, FrustumTest};
use crate::error::{Error, Result};
use crate::geometry::AABB;
use super::object::{ObjectKey, SceneObject};
use super::tile::{octant_of, octant_offset, SetInfo, Tile, TileId};

/// Static tile hierarchy
pub struct TileGrid {
    origin: Vec3,
    size: Vec3,
    tile_size: Vec3,
    dims: UVec3,
    num_levels: u32,
    nodes_per_root: usize,
    tiles: Vec<Tile>,
}

/// Total node count of a subtree with `depth` levels below its root
fn subtree_node_count(depth: u32) -> usize {
    let mut count = 0usize;
    let mut level_count = 1usize;
    for _ in 0..=depth {
        count += level_count;
        level_count *= 8;
    }
    count
}

impl TileGrid {
    /// Build the grid. Callers validate the parameters first (see `SceneConfig`).
    pub fn new(origin: Vec3, size: Vec3, tile_size: Vec3, num_levels: u32) -> Self {
        debug_assert!(num_levels >= 1);
        debug_assert!(tile_size.cmpgt(Vec3::ZERO).all());

        let dims = ((size + tile_size * 0.5) / tile_size).trunc().max(Vec3::ONE).as_uvec3();
        let nodes_per_root = subtree_node_count(num_levels - 1);
        let root_count = (dims.x * dims.y * dims.z) as usize;
        let mut tiles = Vec::with_capacity(root_count * nodes_per_root);

        for ty in 0..dims.y {
            for tz in 0..dims.z {
                for tx in 0..dims.x {
                    let index = ty * dims.x * dims.z + tz * dims.x + tx;
                    let offset = origin + Vec3::new(tx as f32, ty as f32, tz as f32) * tile_size;
                    Self::build_recursive(&mut tiles, 0, index, None, offset, tile_size, num_levels - 1);
                }
            }
        }

        debug_assert_eq!(tiles.len(), root_count * nodes_per_root);

        crate::engine_debug!(
            "galaxy3d::TileGrid",
            "Built {}x{}x{} grid, {} levels, {} tiles",
            dims.x, dims.y, dims.z, num_levels, tiles.len()
        );

        Self {
            origin,
            size,
            tile_size,
            dims,
            num_levels,
            nodes_per_root,
            tiles,
        }
    }

    /// Depth-first construction of one tile and its subtree.
    fn build_recursive(
        tiles: &mut Vec<Tile>,
        level: u32,
        index: u32,
        parent: Option<TileId>,
        offset: Vec3,
        size: Vec3,
        remaining_levels: u32,
    ) {
        let id = TileId(tiles.len());
        tiles.push(Tile::new(level, index, parent, offset, size));

        if remaining_levels == 0 {
            return;
        }

        let child_size = size * 0.5;
        tiles[id.0].first_child = Some(TileId(tiles.len()));
        tiles[id.0].child_stride = subtree_node_count(remaining_levels - 1);

        for octant in 0..8 {
            Self::build_recursive(
                tiles,
                level + 1,
                octant as u32,
                Some(id),
                octant_offset(offset, child_size, octant),
                child_size,
                remaining_levels - 1,
            );
        }
    }

    // ===== GETTERS =====

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn tile_size(&self) -> Vec3 {
        self.tile_size
    }

    /// Number of top-level tiles along each axis
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn num_levels(&self) -> u32 {
        self.num_levels
    }

    /// Number of top-level tiles
    pub fn root_count(&self) -> usize {
        (self.dims.x * self.dims.y * self.dims.z) as usize
    }

    /// Number of tiles over all levels
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn root(&self, index: usize) -> TileId {
        debug_assert!(index < self.root_count());
        TileId(index * self.nodes_per_root)
    }

    pub fn roots(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..self.root_count()).map(move |i| TileId(i * self.nodes_per_root))
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Read-only view over every tile
    pub(crate) fn view(&self) -> TileView<'_> {
        TileView {
            first_root: 0,
            nodes_per_root: self.nodes_per_root,
            tiles: &self.tiles,
        }
    }

    /// Split the arena into disjoint mutable spans, one per root range.
    ///
    /// `ranges` must be consecutive and cover every top-level tile.
    pub(crate) fn split_spans(&mut self, ranges: &[Range<usize>]) -> Vec<TileSpan<'_>> {
        debug_assert_eq!(ranges.first().map(|r| r.start), Some(0));
        debug_assert_eq!(ranges.last().map(|r| r.end), Some(self.root_count()));

        let nodes_per_root = self.nodes_per_root;
        let mut rest: &mut [Tile] = &mut self.tiles;
        let mut spans = Vec::with_capacity(ranges.len());

        for range in ranges {
            let (head, tail) = rest.split_at_mut(range.len() * nodes_per_root);
            spans.push(TileSpan {
                first_root: range.start,
                nodes_per_root,
                tiles: head,
            });
            rest = tail;
        }

        spans
    }

    // ===== INSERTION =====

    /// Grid index of the top-level tile containing `position`.
    ///
    /// Positions on the far boundary of the scene area fall into the last tile.
    pub fn locate_root(&self, position: Vec3) -> Result<usize> {
        let cell = ((position - self.origin) / self.tile_size).floor();
        let far = self.origin + self.size;
        let mut coords = [0u32; 3];

        for axis in 0..3 {
            let dim = self.dims[axis];
            let c = cell[axis];
            if c < 0.0 || c.is_nan() {
                return Err(Error::OutOfBounds(format!("position {:?} is outside the scene", position)));
            }
            coords[axis] = if (c as u32) < dim {
                c as u32
            } else if position[axis] <= far[axis] {
                dim - 1
            } else {
                return Err(Error::OutOfBounds(format!("position {:?} is outside the scene", position)));
            };
        }

        let [x, y, z] = coords;
        Ok((y * self.dims.x * self.dims.z + z * self.dims.x + x) as usize)
    }

    /// Place an object in the leaf tile containing its position.
    ///
    /// Every tile on the path from the top-level tile to the leaf counts the
    /// object, grows its bounds and is marked dirty. The object is prepended
    /// to the leaf's list for `set_id`. Returns the leaf.
    pub fn insert(&mut self, set_id: &str, key: ObjectKey, object: &SceneObject) -> Result<TileId> {
        let root = self.locate_root(object.position)?;
        let world_bounds = object.world_bounds();
        let mut id = TileId(root * self.nodes_per_root);

        loop {
            let tile = &mut self.tiles[id.0];
            tile.obj_count += 1;
            if object.casts_shadows {
                tile.shadow_caster_count += 1;
            }
            tile.dirty = true;
            tile.fit_bounds(&world_bounds);

            let Some(first_child) = tile.first_child else {
                let info = tile.sets.entry(set_id.to_string()).or_default();
                info.objects.insert(0, key);
                info.count += 1;
                if object.casts_shadows {
                    info.shadow_caster_count += 1;
                }
                return Ok(id);
            };

            let octant = octant_of(tile.offset, tile.size * 0.5, object.position);
            id = TileId(first_child.0 + octant * tile.child_stride);
        }
    }

    // ===== PREPARATION =====

    /// Rebuild per-set lists of interior tiles and assign start indices.
    ///
    /// Afterwards every tile has an entry for every set id. An interior
    /// tile's list is its children's lists concatenated in octant order.
    /// Start indices count objects per set id in `set_ids` order, walking
    /// top-level tiles in index order and each subtree depth first.
    pub fn prepare(&mut self, set_ids: &[String]) {
        for tile in &mut self.tiles {
            for set_id in set_ids {
                if !tile.sets.contains_key(set_id) {
                    tile.sets.insert(set_id.clone(), SetInfo::default());
                }
            }
        }

        // Children always sit after their parent in the arena
        for index in (0..self.tiles.len()).rev() {
            let (head, tail) = self.tiles.split_at_mut(index + 1);
            let tile = &mut head[index];
            let Some(first_child) = tile.first_child else {
                continue;
            };
            let stride = tile.child_stride;
            let child_base = first_child.0 - index - 1;
            let empty = tile.obj_count == 0;

            for (set_id, info) in tile.sets.iter_mut() {
                info.objects.clear();
                info.count = 0;
                info.shadow_caster_count = 0;
                if empty {
                    continue;
                }
                for octant in 0..8 {
                    if let Some(child_info) = tail[child_base + octant * stride].sets.get(set_id) {
                        info.objects.extend_from_slice(&child_info.objects);
                        info.count += child_info.count;
                        info.shadow_caster_count += child_info.shadow_caster_count;
                    }
                }
            }
        }

        let mut start = 0u32;
        let mut shadow_start = 0u32;
        for set_id in set_ids {
            for root in 0..self.root_count() {
                let id = TileId(root * self.nodes_per_root);
                self.assign_start_indices(id, set_id, &mut start, &mut shadow_start);
            }
        }

        crate::engine_debug!(
            "galaxy3d::TileGrid",
            "Prepared {} set(s), {} object(s), {} shadow caster(s)",
            set_ids.len(), start, shadow_start
        );
    }

    fn assign_start_indices(&mut self, id: TileId, set_id: &str, start: &mut u32, shadow_start: &mut u32) {
        let tile = &mut self.tiles[id.0];
        let Some(info) = tile.sets.get_mut(set_id) else {
            debug_assert!(false, "tile {:?} has no entry for set '{}'", id, set_id);
            return;
        };
        // Recorded draws embed their start indices
        if tile.obj_count > 0
            && (info.start_index != *start || info.shadow_caster_start_index != *shadow_start)
        {
            tile.dirty = true;
        }
        info.start_index = *start;
        info.shadow_caster_start_index = *shadow_start;

        if tile.obj_count == 0 {
            return;
        }

        match tile.first_child {
            None => {
                *start += info.count;
                *shadow_start += info.shadow_caster_count;
            }
            Some(_) => {
                let children: Vec<TileId> = tile.children().collect();
                for child in children {
                    self.assign_start_indices(child, set_id, start, shadow_start);
                }
            }
        }
    }

    // ===== QUERIES =====

    /// `true` if `aabb` overlaps the world bounds of any object.
    ///
    /// Only non-empty tiles whose bounds overlap `aabb` are descended into.
    pub fn check_collision(&self, aabb: &AABB, objects: &SlotMap<ObjectKey, SceneObject>) -> bool {
        self.roots().any(|root| self.tile_collides(root, aabb, objects))
    }

    fn tile_collides(&self, id: TileId, aabb: &AABB, objects: &SlotMap<ObjectKey, SceneObject>) -> bool {
        let tile = &self.tiles[id.0];
        if tile.obj_count == 0 || !tile.bounds.intersects(aabb) {
            return false;
        }

        if !tile.is_leaf() {
            return tile.children().any(|child| self.tile_collides(child, aabb, objects));
        }

        tile.sets
            .values()
            .flat_map(|info| info.objects.iter())
            .filter_map(|key| objects.get(*key))
            .any(|object| object.world_bounds().intersects(aabb))
    }
}

// ===== VISIBILITY =====

/// Read-only access to the tiles of a run of top-level tiles
#[derive(Clone, Copy)]
pub(crate) struct TileView<'a> {
    first_root: usize,
    nodes_per_root: usize,
    tiles: &'a [Tile],
}

impl<'a> TileView<'a> {
    pub(crate) fn get(&self, id: TileId) -> &'a Tile {
        &self.tiles[id.0 - self.first_root * self.nodes_per_root]
    }

    pub(crate) fn roots(&self) -> impl Iterator<Item = TileId> + 'a {
        let first = self.first_root;
        let stride = self.nodes_per_root;
        let count = self.tiles.len() / stride;
        (first..first + count).map(move |i| TileId(i * stride))
    }

    /// Tiles to draw for `frustum`, in top-level tile order.
    ///
    /// Top-level tiles are first rejected against `visible_box` (the
    /// frustum's bounding box). INSIDE tiles are taken whole, INTERSECT tiles
    /// are refined into subtiles.
    pub(crate) fn find_visible_tiles(&self, visible_box: &AABB, frustum: &Frustum) -> Vec<TileId> {
        let mut visible = Vec::new();
        for root in self.roots() {
            match tile_visibility(self.get(root), Some(visible_box), frustum) {
                FrustumTest::Inside => visible.push(root),
                FrustumTest::Intersect => self.collect_visible_subtiles(root, frustum, &mut visible),
                FrustumTest::Outside => {}
            }
        }
        visible
    }

    /// Refine a partially visible tile.
    ///
    /// Leaves are taken whole. If no non-empty child is OUTSIDE, the tile
    /// itself is taken (one draw instead of up to eight). Otherwise INSIDE
    /// children are taken and INTERSECT children are refined further.
    fn collect_visible_subtiles(&self, id: TileId, frustum: &Frustum, visible: &mut Vec<TileId>) {
        let tile = self.get(id);
        if tile.is_leaf() {
            visible.push(id);
            return;
        }

        let mut results = [(id, FrustumTest::Outside); 8];
        let mut take_whole = true;
        for (octant, child_id) in tile.children().enumerate() {
            let child = self.get(child_id);
            let test = tile_visibility(child, None, frustum);
            if test == FrustumTest::Outside && child.obj_count > 0 {
                take_whole = false;
            }
            results[octant] = (child_id, test);
        }

        if take_whole {
            visible.push(id);
            return;
        }

        for (child_id, test) in results {
            match test {
                FrustumTest::Inside => visible.push(child_id),
                FrustumTest::Intersect => self.collect_visible_subtiles(child_id, frustum, visible),
                FrustumTest::Outside => {}
            }
        }
    }
}

/// Visibility of one tile; empty tiles are always OUTSIDE.
pub(crate) fn tile_visibility(tile: &Tile, visible_box: Option<&AABB>, frustum: &Frustum) -> FrustumTest {
    if tile.obj_count == 0 {
        return FrustumTest::Outside;
    }
    frustum.classify_aabb_in_box(&tile.bounds, visible_box)
}

/// Mutable access to the tiles of a run of top-level tiles, owned by one worker
pub(crate) struct TileSpan<'a> {
    first_root: usize,
    nodes_per_root: usize,
    tiles: &'a mut [Tile],
}

impl<'a> TileSpan<'a> {
    pub(crate) fn view(&self) -> TileView<'_> {
        TileView {
            first_root: self.first_root,
            nodes_per_root: self.nodes_per_root,
            tiles: &*self.tiles,
        }
    }

    pub(crate) fn get(&self, id: TileId) -> &Tile {
        &self.tiles[id.0 - self.first_root * self.nodes_per_root]
    }

    pub(crate) fn get_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0 - self.first_root * self.nodes_per_root]
    }

    pub(crate) fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> + '_ {
        self.tiles.iter_mut()
    }
}

#[cfg(test)]
#[path = "tile_grid_tests.rs"]
mod tests;
