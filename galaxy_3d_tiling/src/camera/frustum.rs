/// Frustum - eight corner vertices, six clipping planes and a bounding box.
///
/// Each plane is represented as a Vec4 (A, B, C, D) where:
/// - (A, B, C) is the inward-pointing unit normal
/// - D is the signed distance
/// - A point P is inside the frustum if dot(plane, P_homogeneous) >= 0 for all planes
///
/// Planes are always stored in the order far, near, left, right, top, bottom;
/// box classification tests them in that order.

use glam::{Mat4, Vec3, Vec4};
use crate::geometry::AABB;

/// Result of a 3-way frustum/box classification.
///
/// - `Outside` → skip the whole tile
/// - `Inside` → take the whole tile
/// - `Intersect` → refine into subtiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumTest {
    /// Box is entirely outside the frustum
    Outside,
    /// Box is entirely inside the frustum
    Inside,
    /// Box straddles at least one plane
    Intersect,
}

/// Frustum plane indices
pub const PLANE_FAR: usize = 0;
pub const PLANE_NEAR: usize = 1;
pub const PLANE_LEFT: usize = 2;
pub const PLANE_RIGHT: usize = 3;
pub const PLANE_TOP: usize = 4;
pub const PLANE_BOTTOM: usize = 5;

/// Frustum vertex indices (Far/Near, Top/Bottom, Right/Left)
pub const VERTEX_FTR: usize = 0;
pub const VERTEX_FTL: usize = 1;
pub const VERTEX_FBR: usize = 2;
pub const VERTEX_FBL: usize = 3;
pub const VERTEX_NTR: usize = 4;
pub const VERTEX_NTL: usize = 5;
pub const VERTEX_NBR: usize = 6;
pub const VERTEX_NBL: usize = 7;

/// Plane through three points, normal = normalize((p2 - p0) x (p1 - p0)).
///
/// Returns a zero plane for degenerate (collinear) input.
pub fn plane_from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec4 {
    let normal = (p2 - p0).cross(p1 - p0).normalize_or_zero();
    normal.extend(-normal.dot(p0))
}

/// Signed distance from `point` to `plane` (positive on the normal side).
#[inline]
pub fn plane_distance(plane: Vec4, point: Vec3) -> f32 {
    plane.truncate().dot(point) + plane.w
}

/// Camera frustum used for tile visibility.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Corner vertices, indexed by the `VERTEX_*` constants
    pub vertices: [Vec3; 8],
    /// Frustum planes: far, near, left, right, top, bottom
    pub planes: [Vec4; 6],
    bounds: AABB,
}

impl Frustum {
    /// Build planes and bounding box from the 8 corner vertices.
    pub fn from_vertices(vertices: [Vec3; 8]) -> Self {
        let v = &vertices;
        let planes = [
            plane_from_points(v[VERTEX_FTL], v[VERTEX_FTR], v[VERTEX_FBR]),
            plane_from_points(v[VERTEX_NTL], v[VERTEX_NBR], v[VERTEX_NTR]),
            plane_from_points(v[VERTEX_NTL], v[VERTEX_FTL], v[VERTEX_FBL]),
            plane_from_points(v[VERTEX_NTR], v[VERTEX_FBR], v[VERTEX_FTR]),
            plane_from_points(v[VERTEX_NTL], v[VERTEX_FTR], v[VERTEX_FTL]),
            plane_from_points(v[VERTEX_NBL], v[VERTEX_FBL], v[VERTEX_FBR]),
        ];

        let bounds = AABB::from_points(&vertices).unwrap_or_else(|| AABB::from_point(vertices[0]));

        Self { vertices, planes, bounds }
    }

    /// Frustum of a view-projection matrix (depth range [0, 1]).
    ///
    /// Unprojects the NDC cube corners, so it works for both perspective
    /// and orthographic projections.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let inverse = vp.inverse();
        let corner = |x: f32, y: f32, z: f32| inverse.project_point3(Vec3::new(x, y, z));

        let mut vertices = [Vec3::ZERO; 8];
        vertices[VERTEX_FTR] = corner(1.0, 1.0, 1.0);
        vertices[VERTEX_FTL] = corner(-1.0, 1.0, 1.0);
        vertices[VERTEX_FBR] = corner(1.0, -1.0, 1.0);
        vertices[VERTEX_FBL] = corner(-1.0, -1.0, 1.0);
        vertices[VERTEX_NTR] = corner(1.0, 1.0, 0.0);
        vertices[VERTEX_NTL] = corner(-1.0, 1.0, 0.0);
        vertices[VERTEX_NBR] = corner(1.0, -1.0, 0.0);
        vertices[VERTEX_NBL] = corner(-1.0, -1.0, 0.0);

        Self::from_vertices(vertices)
    }

    /// Axis-aligned box enclosing the 8 vertices.
    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    /// Classify a box against the six planes.
    ///
    /// For each plane, the corners are tested until both an inside and an
    /// outside corner have been seen. A plane with every corner outside
    /// rejects the box immediately.
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let corners = aabb.corners();
        let mut result = FrustumTest::Inside;

        for plane in &self.planes {
            let mut inside = 0;
            let mut outside = 0;

            for corner in &corners {
                if plane_distance(*plane, *corner) < 0.0 {
                    outside += 1;
                } else {
                    inside += 1;
                }
                if inside > 0 && outside > 0 {
                    break;
                }
            }

            if inside == 0 {
                return FrustumTest::Outside;
            }
            if outside > 0 {
                result = FrustumTest::Intersect;
            }
        }

        result
    }

    /// Coarse reject against `visible_box` (if any), then [`classify_aabb`](Self::classify_aabb).
    pub fn classify_aabb_in_box(&self, aabb: &AABB, visible_box: Option<&AABB>) -> FrustumTest {
        match visible_box {
            Some(visible) if !visible.intersects(aabb) => FrustumTest::Outside,
            _ => self.classify_aabb(aabb),
        }
    }

    /// `true` if `point` is on the inner side of every plane.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane_distance(*plane, point) >= 0.0)
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
