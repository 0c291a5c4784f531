use super::*;

fn unit_box() -> AABB {
    AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0))
}

// ============================================================================
// Tests: construction
// ============================================================================

#[test]
fn test_aabb_from_center_extent() {
    let aabb = AABB::from_center_extent(Vec3::new(5.0, 0.0, -2.0), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(aabb.min, Vec3::new(4.0, -2.0, -5.0));
    assert_eq!(aabb.max, Vec3::new(6.0, 2.0, 1.0));
    assert_eq!(aabb.center(), Vec3::new(5.0, 0.0, -2.0));
    assert_eq!(aabb.half_extent(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_aabb_corners_cover_all_combinations() {
    let aabb = AABB::new(Vec3::new(0.0, 1.0, 2.0), Vec3::new(10.0, 11.0, 12.0));
    let corners = aabb.corners();

    assert_eq!(corners[0], aabb.min);
    assert_eq!(corners[7], aabb.max);
    assert_eq!(corners[1], Vec3::new(10.0, 1.0, 2.0));
    assert_eq!(corners[2], Vec3::new(0.0, 11.0, 2.0));
    assert_eq!(corners[4], Vec3::new(0.0, 1.0, 12.0));
    for i in 0..8 {
        for j in (i + 1)..8 {
            assert_ne!(corners[i], corners[j]);
        }
    }
}

#[test]
fn test_aabb_from_points() {
    assert!(AABB::from_points(&[]).is_none());

    let aabb = AABB::from_points(&[
        Vec3::new(1.0, -3.0, 2.0),
        Vec3::new(-4.0, 5.0, 0.0),
        Vec3::new(0.0, 0.0, 9.0),
    ])
    .unwrap();
    assert_eq!(aabb.min, Vec3::new(-4.0, -3.0, 0.0));
    assert_eq!(aabb.max, Vec3::new(1.0, 5.0, 9.0));
}

// ============================================================================
// Tests: union
// ============================================================================

#[test]
fn test_aabb_union_encloses_both() {
    let a = unit_box();
    let b = AABB::new(Vec3::new(3.0, -2.0, 0.0), Vec3::new(4.0, 0.0, 0.5));
    let u = a.union(&b);

    assert!(u.contains(&a));
    assert!(u.contains(&b));
    assert_eq!(u.min, Vec3::new(-1.0, -2.0, -1.0));
    assert_eq!(u.max, Vec3::new(4.0, 1.0, 1.0));
}

#[test]
fn test_aabb_repeated_union_is_exact() {
    let mut acc = AABB::from_point(Vec3::new(0.1, 0.1, 0.1));
    for i in 0..1000 {
        let p = Vec3::splat(0.1 + (i % 7) as f32 * 0.3);
        acc = acc.union(&AABB::from_point(p));
    }
    assert_eq!(acc.min, Vec3::splat(0.1));
    assert_eq!(acc.max, Vec3::splat(0.1 + 6.0 * 0.3));
}

// ============================================================================
// Tests: containment / intersection
// ============================================================================

#[test]
fn test_aabb_contains() {
    let outer = unit_box();
    let inner = AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5));
    assert!(outer.contains(&inner));
    assert!(!inner.contains(&outer));
    assert!(outer.contains(&outer));
    assert!(outer.contains_point(Vec3::new(1.0, 0.0, -1.0)));
    assert!(!outer.contains_point(Vec3::new(1.01, 0.0, 0.0)));
}

#[test]
fn test_aabb_intersects_touching_and_disjoint() {
    let a = unit_box();
    let touching = AABB::new(Vec3::new(1.0, -1.0, -1.0), Vec3::new(2.0, 1.0, 1.0));
    let disjoint = AABB::new(Vec3::new(1.5, -1.0, -1.0), Vec3::new(2.0, 1.0, 1.0));

    assert!(a.intersects(&touching));
    assert!(touching.intersects(&a));
    assert!(!a.intersects(&disjoint));
}

// ============================================================================
// Tests: transformed
// ============================================================================

#[test]
fn test_aabb_transformed_translation_and_scale() {
    let m = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
    let t = unit_box().transformed(&m);
    assert_eq!(t.min, Vec3::new(8.0, -2.0, -2.0));
    assert_eq!(t.max, Vec3::new(12.0, 2.0, 2.0));
}

#[test]
fn test_aabb_transformed_rotation_grows_box() {
    let m = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
    let t = unit_box().transformed(&m);
    let expected = std::f32::consts::SQRT_2;
    assert!((t.max.x - expected).abs() < 1e-5);
    assert!((t.max.z - expected).abs() < 1e-5);
    assert!((t.max.y - 1.0).abs() < 1e-5);
}
