/// Tile - one cell of the scene grid at some subdivision level.
///
/// Tiles live in a flat arena owned by `TileGrid` and refer to each other by
/// [`TileId`]. Only leaf tiles receive objects directly; the per-set lists of
/// interior tiles are rebuilt from their children when the scene is prepared.

use glam::Vec3;
use rustc_hash::FxHashMap;
use crate::device::CommandBufferId;
use crate::geometry::AABB;
use super::object::ObjectKey;

/// Position of a tile in the grid arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) usize);

impl TileId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Objects of one set identifier inside a tile and their draw range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetInfo {
    /// Object keys, in draw order
    pub objects: Vec<ObjectKey>,
    /// Position of the first object in the scene-wide instance ordering
    pub start_index: u32,
    pub count: u32,
    /// Same as `start_index`, counting shadow casters only
    pub shadow_caster_start_index: u32,
    pub shadow_caster_count: u32,
}

/// A tile and its bookkeeping
#[derive(Debug)]
pub struct Tile {
    pub(crate) level: u32,
    /// Grid index for top-level tiles, octant (0..8) for subtiles
    pub(crate) index: u32,
    pub(crate) parent: Option<TileId>,
    /// Minimum corner of the tile's grid cell
    pub(crate) offset: Vec3,
    /// Extent of the grid cell at this level
    pub(crate) size: Vec3,
    /// Bounds of the objects in this tile (placeholder at the cell center while empty)
    pub(crate) bounds: AABB,
    /// Contents changed since a command buffer was last recorded
    pub(crate) dirty: bool,
    pub(crate) obj_count: u32,
    pub(crate) shadow_caster_count: u32,
    pub(crate) sets: FxHashMap<String, SetInfo>,
    pub(crate) first_child: Option<TileId>,
    /// Arena distance between consecutive children
    pub(crate) child_stride: usize,
    pub(crate) command_buffer: Option<CommandBufferId>,
}

impl Tile {
    pub(crate) fn new(level: u32, index: u32, parent: Option<TileId>, offset: Vec3, size: Vec3) -> Self {
        Self {
            level,
            index,
            parent,
            offset,
            size,
            bounds: AABB::from_point(offset + size * 0.5),
            dirty: false,
            obj_count: 0,
            shadow_caster_count: 0,
            sets: FxHashMap::default(),
            first_child: None,
            child_stride: 0,
            command_buffer: None,
        }
    }

    // ===== GETTERS =====

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn parent(&self) -> Option<TileId> {
        self.parent
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn obj_count(&self) -> u32 {
        self.obj_count
    }

    pub fn shadow_caster_count(&self) -> u32 {
        self.shadow_caster_count
    }

    pub fn set(&self, set_id: &str) -> Option<&SetInfo> {
        self.sets.get(set_id)
    }

    pub fn sets(&self) -> &FxHashMap<String, SetInfo> {
        &self.sets
    }

    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Child in `octant` (index `(y << 2) + (z << 1) + x`)
    pub fn child(&self, octant: usize) -> Option<TileId> {
        debug_assert!(octant < 8);
        self.first_child.map(|first| TileId(first.0 + octant * self.child_stride))
    }

    /// The 8 children in octant order (empty for leaves)
    pub fn children(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..8).filter_map(move |octant| self.child(octant))
    }

    /// Command buffer recorded for this tile, if any
    pub fn command_buffer(&self) -> Option<CommandBufferId> {
        self.command_buffer
    }

    /// Grow the bounds to include `aabb`; the first object replaces the placeholder.
    pub(crate) fn fit_bounds(&mut self, aabb: &AABB) {
        self.bounds = if self.obj_count <= 1 { *aabb } else { self.bounds.union(aabb) };
    }
}

/// Octant containing `position` inside a tile whose children have size `child_size`.
pub(crate) fn octant_of(offset: Vec3, child_size: Vec3, position: Vec3) -> usize {
    let cell = ((position - offset) / child_size).floor().clamp(Vec3::ZERO, Vec3::ONE);
    let (x, y, z) = (cell.x as usize, cell.y as usize, cell.z as usize);
    (y << 2) + (z << 1) + x
}

/// Offset of the child in `octant` inside a tile at `offset`.
pub(crate) fn octant_offset(offset: Vec3, child_size: Vec3, octant: usize) -> Vec3 {
    let x = (octant & 1) as f32;
    let z = ((octant >> 1) & 1) as f32;
    let y = ((octant >> 2) & 1) as f32;
    offset + Vec3::new(x, y, z) * child_size
}
