//! Direction <-> cubemap face coordinate conversion.

use glam::Vec3;

use super::face::CubeFaceId;
use super::spherify::normalize_or_up;

/// A 2D coordinate within a cube face, with UV in [0, 1] range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCoord {
    /// The cube face this coordinate belongs to.
    pub face: CubeFaceId,
    /// U coordinate, nominally in [0, 1].
    pub u: f32,
    /// V coordinate, nominally in [0, 1].
    pub v: f32,
}

impl FaceCoord {
    /// Creates a new face coordinate.
    pub fn new(face: CubeFaceId, u: f32, v: f32) -> Self {
        Self { face, u, v }
    }

    /// Converts this face coordinate back to a unit direction.
    pub fn to_direction(self) -> Vec3 {
        face_uv_to_direction(self.face, self.u, self.v)
    }
}

/// Projects a direction onto the cubemap.
///
/// The dominant axis is chosen by an ordered chain: z wins ties against x
/// and y, then y wins ties against x. Seam texels at face boundaries are
/// assigned by this order, so it must match the kernel's addressing.
///
/// The returned u and v are not clamped; a unit direction always yields
/// values in [0, 1].
pub fn direction_to_face_uv(direction: Vec3) -> FaceCoord {
    let Vec3 { x, y, z } = direction;
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());

    let (face, u, v) = if az >= ax && az >= ay {
        if z >= 0.0 {
            (CubeFaceId::PosZ, -x / z, -y / z)
        } else {
            (CubeFaceId::NegZ, x / -z, -y / -z)
        }
    } else if ay >= ax && ay >= az {
        if y >= 0.0 {
            (CubeFaceId::PosY, x / y, z / y)
        } else {
            (CubeFaceId::NegY, x / -y, -z / -y)
        }
    } else if x >= 0.0 {
        (CubeFaceId::PosX, z / x, -y / x)
    } else {
        (CubeFaceId::NegX, -z / -x, -y / -x)
    };

    FaceCoord::new(face, (u + 1.0) * 0.5, (v + 1.0) * 0.5)
}

/// Inverse of [`direction_to_face_uv`]: unit direction for a face coordinate
/// with u and v in [0, 1].
pub fn face_uv_to_direction(face: CubeFaceId, u: f32, v: f32) -> Vec3 {
    let basis = face.cubemap_basis();
    normalize_or_up(basis.cube_point(2.0 * u - 1.0, 2.0 * v - 1.0))
}

/// Face coordinate addressed by texel `i` along one axis of a tile.
///
/// Texel 0 sits on one face edge and texel `tile_size - 1` on the other,
/// which is the convention the bilinear sampler inverts.
pub fn texel_to_uv(i: u32, tile_size: u32) -> f32 {
    if tile_size <= 1 {
        0.5
    } else {
        i as f32 / (tile_size - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_directions_hit_face_centers() {
        let cases = [
            (Vec3::NEG_Z, CubeFaceId::NegZ),
            (Vec3::Z, CubeFaceId::PosZ),
            (Vec3::NEG_Y, CubeFaceId::NegY),
            (Vec3::Y, CubeFaceId::PosY),
            (Vec3::NEG_X, CubeFaceId::NegX),
            (Vec3::X, CubeFaceId::PosX),
        ];
        for (dir, expected) in cases {
            let c = direction_to_face_uv(dir);
            assert_eq!(c.face, expected, "wrong face for {:?}", dir);
            assert!((c.u - 0.5).abs() < 1e-6 && (c.v - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_roundtrip_interior_directions() {
        for face in CubeFaceId::all() {
            for &u in &[0.05, 0.2, 0.35, 0.5, 0.65, 0.8, 0.95] {
                for &v in &[0.05, 0.2, 0.35, 0.5, 0.65, 0.8, 0.95] {
                    let dir = face_uv_to_direction(face, u, v);
                    assert!((dir.length() - 1.0).abs() < 1e-6);

                    let c = direction_to_face_uv(dir);
                    assert_eq!(c.face, face, "face mismatch at ({}, {})", u, v);
                    assert!(
                        (c.u - u).abs() < 1e-5 && (c.v - v).abs() < 1e-5,
                        "{:?}: ({}, {}) came back as ({}, {})",
                        face,
                        u,
                        v,
                        c.u,
                        c.v
                    );

                    let back = c.to_direction();
                    assert!((back - dir).length() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_tie_break_prefers_z_then_y() {
        // |x| == |y| == |z|: z wins.
        let c = direction_to_face_uv(Vec3::new(1.0, 1.0, 1.0).normalize());
        assert_eq!(c.face, CubeFaceId::PosZ);
        let c = direction_to_face_uv(Vec3::new(1.0, -1.0, -1.0).normalize());
        assert_eq!(c.face, CubeFaceId::NegZ);

        // |x| == |y| > |z|: y wins.
        let c = direction_to_face_uv(Vec3::new(1.0, 1.0, 0.5).normalize());
        assert_eq!(c.face, CubeFaceId::PosY);
        let c = direction_to_face_uv(Vec3::new(-1.0, -1.0, 0.0).normalize());
        assert_eq!(c.face, CubeFaceId::NegY);

        // x only when strictly dominant.
        let c = direction_to_face_uv(Vec3::new(-1.0, 0.99, 0.99).normalize());
        assert_eq!(c.face, CubeFaceId::NegX);
    }

    #[test]
    fn test_zero_sign_selects_positive_face() {
        // Zero vector: z branch taken, z >= 0.
        let c = direction_to_face_uv(Vec3::ZERO);
        assert_eq!(c.face, CubeFaceId::PosZ);
    }

    #[test]
    fn test_unit_directions_stay_in_unit_square() {
        let mut state = 12345u32;
        let mut next = || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        };
        for _ in 0..2000 {
            let d = Vec3::new(next(), next(), next());
            if d.length() < 1e-3 {
                continue;
            }
            let c = direction_to_face_uv(d.normalize());
            assert!((0.0..=1.0).contains(&c.u) && (0.0..=1.0).contains(&c.v), "{:?}", c);
        }
    }

    #[test]
    fn test_texel_to_uv_spans_edges() {
        assert_eq!(texel_to_uv(0, 4), 0.0);
        assert_eq!(texel_to_uv(3, 4), 1.0);
        assert!((texel_to_uv(1, 4) - 1.0 / 3.0).abs() < 1e-7);
        assert_eq!(texel_to_uv(0, 1), 0.5);
    }
}
