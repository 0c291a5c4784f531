//! Camera module - camera state and the view frustum.
//!
//! The camera is owned by the scene and driven by the caller; the scene only
//! reads its frustum and dirty state.

mod camera;
mod frustum;

pub use camera::{Camera, CameraDirty, Projection};
pub use frustum::{
    Frustum, FrustumTest,
    plane_distance, plane_from_points,
    PLANE_FAR, PLANE_NEAR, PLANE_LEFT, PLANE_RIGHT, PLANE_TOP, PLANE_BOTTOM,
    VERTEX_FTR, VERTEX_FTL, VERTEX_FBR, VERTEX_FBL,
    VERTEX_NTR, VERTEX_NTL, VERTEX_NBR, VERTEX_NBL,
};
