//! Bilinear height lookup by direction.

use glam::Vec3;

use super::field::HeightField;
use crate::geometry::direction_to_face_uv;

/// Samples the height field in the direction of `direction`.
///
/// The direction is projected onto its cubemap face and the four nearest
/// texels of that face are blended. Texel coordinates are clamped to the
/// tile, and a NaN coordinate clamps to texel 0, so any input direction
/// (including zero or non-finite vectors) yields an in-bounds lookup.
/// Neighbouring faces are never consulted.
pub fn sample_height(field: &HeightField, direction: Vec3) -> f32 {
    let coord = direction_to_face_uv(direction);
    let tile = field.tile_size();
    let max = (tile - 1) as f32;

    // f32::max returns the non-NaN operand.
    let fx = (coord.u * max).max(0.0).min(max);
    let fy = (coord.v * max).max(0.0).min(max);

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(tile - 1);
    let y1 = (y0 + 1).min(tile - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let face = coord.face;
    let h00 = field.get(face, x0, y0);
    let h10 = field.get(face, x1, y0);
    let h01 = field.get(face, x0, y1);
    let h11 = field.get(face, x1, y1);

    let top = h00 + (h10 - h00) * tx;
    let bottom = h01 + (h11 - h01) * tx;
    top + (bottom - top) * ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{face_uv_to_direction, texel_to_uv, CubeFaceId};

    fn ramp(tile: u32) -> HeightField {
        let data = (0..6 * tile * tile).map(|i| i as f32).collect();
        HeightField::new(tile, data).unwrap()
    }

    #[test]
    fn test_exact_texel_returns_value() {
        let field = ramp(5);
        for face in CubeFaceId::all() {
            for (x, y) in [(1, 1), (2, 3), (3, 2)] {
                let dir = face_uv_to_direction(face, texel_to_uv(x, 5), texel_to_uv(y, 5));
                let h = sample_height(&field, dir);
                assert!((h - field.get(face, x, y)).abs() < 1e-3, "{face:?} {x} {y}: {h}");
            }
        }
    }

    #[test]
    fn test_midpoint_blends_neighbours() {
        let mut field = HeightField::filled(3, 0.0).unwrap();
        field.set(CubeFaceId::PosX, 1, 1, 1.0);
        field.set(CubeFaceId::PosX, 2, 1, 3.0);
        let u = 0.75;
        let v = 0.5;
        let h = sample_height(&field, face_uv_to_direction(CubeFaceId::PosX, u, v));
        assert!((h - 2.0).abs() < 1e-4, "{h}");
    }

    #[test]
    fn test_upper_edge_clamps_to_last_texel() {
        // x == -z puts u exactly at 1 on +Z, so x0 and x1 are both tile - 1.
        let tile = 5;
        let mut field = HeightField::filled(tile, 0.0).unwrap();
        for y in 0..tile {
            field.set(CubeFaceId::PosZ, tile - 1, y, 9.0);
        }
        let dir = Vec3::new(-1.0, 0.3, 1.0);
        assert_eq!(direction_to_face_uv(dir).face, CubeFaceId::PosZ);
        assert_eq!(direction_to_face_uv(dir).u, 1.0);
        assert_eq!(sample_height(&field, dir), 9.0);

        let field = ramp(tile);
        let h = sample_height(&field, Vec3::new(-1.0, 0.0, 1.0));
        assert_eq!(h, field.get(CubeFaceId::PosZ, tile - 1, 2));
    }

    #[test]
    fn test_degenerate_directions_stay_in_bounds() {
        let field = ramp(4);
        let inputs = [
            Vec3::ZERO,
            Vec3::splat(f32::NAN),
            Vec3::new(f32::INFINITY, 0.0, 0.0),
            Vec3::new(0.0, f32::NEG_INFINITY, 1.0),
            Vec3::new(1e30, -1e30, 1e-30),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        for d in inputs {
            let _ = sample_height(&field, d);
        }
    }

    #[test]
    fn test_single_texel_tile() {
        let mut field = HeightField::filled(1, 0.0).unwrap();
        field.set(CubeFaceId::NegX, 0, 0, 7.0);
        assert_eq!(sample_height(&field, Vec3::NEG_X), 7.0);
        assert_eq!(sample_height(&field, Vec3::X), 0.0);
    }
}
