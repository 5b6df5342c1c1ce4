//! Equal-area cube-to-sphere correction.

use glam::Vec3;

/// Maps a point on the unit cube surface onto the unit sphere.
///
/// Applied component-wise; unlike plain normalization this keeps grid cells
/// close to equal area near the cube corners.
///
/// # Example
/// ```
/// use glam::Vec3;
/// use terrasphere::geometry::cube_to_sphere;
///
/// let p = cube_to_sphere(Vec3::new(1.0, -0.5, 0.25));
/// assert!((p.length() - 1.0).abs() < 1e-6);
/// ```
pub fn cube_to_sphere(cube: Vec3) -> Vec3 {
    let x2 = cube.x * cube.x;
    let y2 = cube.y * cube.y;
    let z2 = cube.z * cube.z;

    Vec3::new(
        cube.x * (1.0 - y2 / 2.0 - z2 / 2.0 + y2 * z2 / 3.0).max(0.0).sqrt(),
        cube.y * (1.0 - z2 / 2.0 - x2 / 2.0 + z2 * x2 / 3.0).max(0.0).sqrt(),
        cube.z * (1.0 - x2 / 2.0 - y2 / 2.0 + x2 * y2 / 3.0).max(0.0).sqrt(),
    )
}

/// Normalizes `v`, substituting +Y when it is too short to carry a direction.
pub fn normalize_or_up(v: Vec3) -> Vec3 {
    let len = v.length();
    if len < 1e-8 || !len.is_finite() {
        Vec3::Y
    } else {
        v / len
    }
}
