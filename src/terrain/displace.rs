//! Radial displacement of mesh vertices by the height field.

use glam::Vec3;
use rayon::prelude::*;

use super::field::HeightField;
use super::sampler::sample_height;
use crate::config::TerrainConfig;

/// Coefficients of `radius + bias + scale * height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    pub radius: f32,
    pub bias: f32,
    pub scale: f32,
}

impl Displacement {
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self {
            radius: config.mesh.radius,
            bias: config.terrain.disp_bias,
            scale: config.terrain.disp_scale,
        }
    }

    pub fn radius_for(&self, height: f32) -> f32 {
        self.radius + self.bias + self.scale * height
    }
}

/// Places each vertex along its direction at the displaced radius.
pub fn displace(directions: &[Vec3], field: &HeightField, displacement: Displacement) -> Vec<Vec3> {
    directions
        .par_iter()
        .map(|&dir| dir * displacement.radius_for(sample_height(field, dir)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CubeSphereMesh;

    #[test]
    fn test_zero_field_keeps_sphere() {
        let mesh = CubeSphereMesh::build(3).unwrap();
        let field = HeightField::filled(4, 0.0).unwrap();
        let d = Displacement {
            radius: 2.5,
            bias: 0.0,
            scale: 10.0,
        };
        let positions = displace(&mesh.directions, &field, d);
        for (p, dir) in positions.iter().zip(&mesh.directions) {
            assert!((*p - *dir * 2.5).length() < 1e-5);
        }
    }

    #[test]
    fn test_constant_field_adds_bias_and_scale() {
        let field = HeightField::filled(2, 0.5).unwrap();
        let d = Displacement {
            radius: 1.0,
            bias: 0.25,
            scale: 2.0,
        };
        let positions = displace(&[Vec3::Y, Vec3::NEG_Z], &field, d);
        assert!((positions[0] - Vec3::Y * 2.25).length() < 1e-6);
        assert!((positions[1] - Vec3::NEG_Z * 2.25).length() < 1e-6);
    }

    #[test]
    fn test_from_config() {
        let mut cfg = TerrainConfig::default();
        cfg.mesh.radius = 3.0;
        cfg.terrain.disp_bias = 0.1;
        cfg.terrain.disp_scale = 0.2;
        let d = Displacement::from_config(&cfg);
        assert!((d.radius_for(1.0) - 3.3).abs() < 1e-6);
    }
}
