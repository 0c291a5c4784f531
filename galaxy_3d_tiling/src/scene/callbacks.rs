/// SceneCallbacks - application hooks invoked by the scene.
///
/// The scene decides *which* tiles are drawn and *when* their command
/// buffers are recorded; the application decides *what* goes into them.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::device::{CommandBufferId, CommandPoolId, RenderPassBeginInfo, RenderTarget, SceneDevice};
use crate::error::Result;
use super::object::{ObjectKey, SceneObject};
use super::tile::SetInfo;

/// Hooks called during `Scene::update`
///
/// `record_commands` runs on worker threads, concurrently for tiles owned by
/// different workers. Each worker passes its own command pool.
pub trait SceneCallbacks: Send + Sync {
    /// Record per-frame resource uploads.
    ///
    /// Returns the command buffer to submit before the frame, or `None` if
    /// nothing needs updating. The scene takes ownership of the buffer and
    /// frees it to `pool` once the GPU is done with it.
    fn update_resources(&self, device: &dyn SceneDevice, pool: CommandPoolId) -> Result<Option<CommandBufferId>>;

    /// Allocate and record a secondary command buffer drawing one tile.
    ///
    /// The buffer must be allocated from `pool`; the scene frees it there.
    fn record_commands(
        &self,
        device: &dyn SceneDevice,
        pool: CommandPoolId,
        target: &RenderTarget,
        sets: &TileSets<'_>,
    ) -> Result<CommandBufferId>;

    /// Render pass parameters for the frame's primary command buffer
    fn render_pass_begin_info(&self, target: &RenderTarget) -> RenderPassBeginInfo;
}

/// Contents of one tile, handed to `SceneCallbacks::record_commands`
pub struct TileSets<'a> {
    sets: &'a FxHashMap<String, SetInfo>,
    set_ids: &'a [String],
    objects: &'a SlotMap<ObjectKey, SceneObject>,
}

impl<'a> TileSets<'a> {
    pub(crate) fn new(
        sets: &'a FxHashMap<String, SetInfo>,
        set_ids: &'a [String],
        objects: &'a SlotMap<ObjectKey, SceneObject>,
    ) -> Self {
        Self { sets, set_ids, objects }
    }

    /// Sets in registration order, with their registration index (the
    /// `model_index` of their instances). Sets absent from the tile are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &'a str, &'a SetInfo)> + '_ {
        let sets = self.sets;
        self.set_ids
            .iter()
            .enumerate()
            .filter_map(move |(index, id)| sets.get(id).map(|info| (index as u32, id.as_str(), info)))
    }

    pub fn get(&self, set_id: &str) -> Option<&'a SetInfo> {
        self.sets.get(set_id)
    }

    pub fn object(&self, key: ObjectKey) -> Option<&'a SceneObject> {
        self.objects.get(key)
    }

    /// Total object count over every set
    pub fn object_count(&self) -> u32 {
        self.sets.values().map(|info| info.count).sum()
    }
}
