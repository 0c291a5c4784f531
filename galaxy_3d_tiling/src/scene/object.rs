/// Scene objects and their GPU instance records
///
/// Objects are static: once added to a scene their transform and bounds never
/// change, so the tile an object lands in is decided once at insertion.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use slotmap::new_key_type;
use crate::geometry::AABB;

new_key_type! {
    /// Stable key of an object inside a scene
    pub struct ObjectKey;
}

/// A static object placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// World-space position; decides which tile owns the object
    pub position: Vec3,
    /// Euler angles in degrees, applied Z·Y·X
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Bounds in model space
    pub local_bounds: AABB,
    /// First material slot used by the object's model
    pub material_index_base: u32,
    pub casts_shadows: bool,
    pub receives_shadows: bool,
}

impl SceneObject {
    /// Object at `position` with identity rotation and scale, casting and receiving shadows.
    pub fn new(position: Vec3, local_bounds: AABB) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            local_bounds,
            material_index_base: 0,
            casts_shadows: true,
            receives_shadows: true,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_material_index_base(mut self, index: u32) -> Self {
        self.material_index_base = index;
        self
    }

    pub fn with_shadows(mut self, casts: bool, receives: bool) -> Self {
        self.casts_shadows = casts;
        self.receives_shadows = receives;
        self
    }

    /// translate * rotate(Z·Y·X) * scale
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_scale(self.scale)
    }

    /// World-space bounds
    pub fn world_bounds(&self) -> AABB {
        self.local_bounds.transformed(&self.model_matrix())
    }
}

/// Per-object record uploaded to the GPU, laid out by draw start index.
///
/// 80 bytes, std430 compatible.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectInstance {
    pub model: [[f32; 4]; 4],
    pub material_index_base: u32,
    /// Registration index of the object's set identifier
    pub model_index: u32,
    /// 1 if the object receives shadows
    pub receives_shadows: u32,
    pub _padding: u32,
}

impl ObjectInstance {
    pub fn new(object: &SceneObject, model_index: u32) -> Self {
        Self {
            model: object.model_matrix().to_cols_array_2d(),
            material_index_base: object.material_index_base,
            model_index,
            receives_shadows: object.receives_shadows as u32,
            _padding: 0,
        }
    }
}
