/// Camera - position, orientation and projection, with dirty tracking.
///
/// Every mutation recomputes the view matrix and the frustum immediately and
/// records what changed in [`CameraDirty`]. The scene reads the dirty state
/// once per update to decide whether tile visibility must be recomputed, then
/// clears it with [`Camera::reset_dirty`].
///
/// Rotation is stored in degrees (x = pitch, y = yaw, z = roll) and applied
/// in Z·Y·X order. With a zero rotation the camera looks down -Z with +Y up.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use super::frustum::Frustum;

bitflags! {
    /// What changed since the last [`Camera::reset_dirty`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CameraDirty: u32 {
        const PROJECTION = 1 << 0;
        const POSITION   = 1 << 1;
        const VIEW_DIR   = 1 << 2;
    }
}

/// Projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y_degrees, aspect_ratio, near, far } => {
                Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect_ratio, near, far)
            }
            Projection::Orthographic { left, right, bottom, top, near, far } => {
                Mat4::orthographic_rh(left, right, bottom, top, near, far)
            }
        }
    }

    pub fn near(&self) -> f32 {
        match *self {
            Projection::Perspective { near, .. } | Projection::Orthographic { near, .. } => near,
        }
    }

    pub fn far(&self) -> f32 {
        match *self {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => far,
        }
    }
}

/// Scene camera.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    rotation: Vec3,
    projection: Projection,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    frustum: Frustum,
    dirty: CameraDirty,
}

/// Wrap an angle into (-360, 360)
fn wrap_degrees(angle: f32) -> f32 {
    angle % 360.0
}

impl Camera {
    /// Create a camera. New cameras are fully dirty.
    pub fn new(position: Vec3, rotation: Vec3, projection: Projection) -> Self {
        let mut camera = Self {
            position,
            rotation,
            projection,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: projection.matrix(),
            frustum: Frustum::from_view_projection(&projection.matrix()),
            dirty: CameraDirty::all(),
        };
        camera.recompute();
        camera
    }

    fn rotation_matrix(&self) -> Mat4 {
        Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
    }

    fn recompute(&mut self) {
        let rotation = self.rotation_matrix();
        let forward = rotation.transform_vector3(Vec3::NEG_Z);
        let up = rotation.transform_vector3(Vec3::Y);
        self.view_matrix = Mat4::look_to_rh(self.position, forward, up);
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix());
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler angles in degrees (pitch, yaw, roll).
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Unit vector the camera looks along.
    pub fn view_direction(&self) -> Vec3 {
        self.rotation_matrix().transform_vector3(Vec3::NEG_Z).normalize()
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// World-space frustum for the current state.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_flags(&self) -> CameraDirty {
        self.dirty
    }

    pub fn reset_dirty(&mut self) {
        self.dirty = CameraDirty::empty();
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty |= CameraDirty::POSITION;
        self.recompute();
    }

    /// Translate by `delta` in world space.
    pub fn move_by(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = Vec3::new(
            wrap_degrees(rotation.x),
            wrap_degrees(rotation.y),
            wrap_degrees(rotation.z),
        );
        self.dirty |= CameraDirty::VIEW_DIR;
        self.recompute();
    }

    /// Add `delta` degrees to the current rotation.
    pub fn rotate(&mut self, delta: Vec3) {
        self.set_rotation(self.rotation + delta);
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.projection_matrix = projection.matrix();
        self.dirty |= CameraDirty::PROJECTION;
        self.recompute();
    }

    /// Rotate so the camera looks at `target` (roll is reset).
    pub fn look_at(&mut self, target: Vec3) {
        let direction = (target - self.position).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        let pitch = direction.y.clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = (-direction.x).atan2(-direction.z).to_degrees();
        self.set_rotation(Vec3::new(pitch, yaw, 0.0));
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
