//! Terrain generation configuration.
//!
//! A [`TerrainConfig`] is an immutable snapshot handed to each generation
//! request. Values are not range-checked here: they are forwarded to the
//! simulation kernel as-is.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How the kernel colors the surface texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Grayscale of the normalized height.
    Height,
    /// Elevation palette with water below `water_height`.
    Biome,
}

impl Default for ColorMode {
    fn default() -> Self {
        Self::Biome
    }
}

/// Which kernel implementation runs the terrain simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelBackend {
    /// Prefer the GPU kernel; if no device can be acquired, fall back to the
    /// analytic kernel. Errors after the device is acquired still fail.
    Auto,
    /// Require the GPU kernel (fail the request if unavailable).
    Gpu,
    /// Force the CPU analytic kernel.
    Analytic,
}

impl Default for KernelBackend {
    fn default() -> Self {
        Self::Gpu
    }
}

/// Base mesh parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Grid cells per cube face edge.
    pub subdiv: u32,
    /// Planet radius in world units.
    pub radius: f32,
    /// Average normals of coincident vertices on cube face edges.
    pub weld_seams: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            subdiv: 128,
            radius: 1.0,
            weld_seams: false,
        }
    }
}

/// Cubemap texture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Texels per face edge; powers of two are preferred.
    pub tile_size: u32,
    pub color_mode: ColorMode,
    /// Height below which the biome palette paints water.
    pub water_height: f32,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            color_mode: ColorMode::default(),
            water_height: 0.0,
        }
    }
}

/// Normal map parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalConfig {
    pub enabled: bool,
    /// Finite-difference step in face UV units. Defaults to one texel.
    pub eps: Option<f32>,
    /// Shading strength of the generated normal map, used by the renderer.
    pub strength: Option<f32>,
    /// Scale applied to the generated normal map, used by the renderer.
    pub generated_scale: Option<f32>,
}

impl Default for NormalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            eps: None,
            strength: None,
            generated_scale: None,
        }
    }
}

impl NormalConfig {
    /// Finite-difference step for a given tile size.
    pub fn eps_for(&self, tile_size: u32) -> f32 {
        self.eps.unwrap_or(1.0 / tile_size as f32)
    }
}

/// Noise and erosion coefficients for the simulation kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub noise_scale: f32,
    /// Slope damping of the base fBm.
    pub alpha: f32,
    pub lacunarity: f32,
    pub gain: f32,
    pub octaves: u32,
    /// Radial displacement per unit of height.
    pub disp_scale: f32,
    /// Constant radial offset added to every vertex.
    pub disp_bias: f32,
    pub out_min: f32,
    pub out_max: f32,
    pub erosion_scale: f32,
    pub erosion_slope_power: f32,
    pub erosion_cell_scale: f32,
    pub erosion_height_offset: f32,
    pub erosion_gain: f32,
    pub erosion_lacunarity: f32,
    pub erosion_strength: f32,
    pub erosion_octaves: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            noise_scale: 2.0,
            alpha: 0.35,
            lacunarity: 2.0,
            gain: 0.5,
            octaves: 8,
            disp_scale: 0.05,
            disp_bias: 0.0,
            out_min: -1.0,
            out_max: 1.0,
            erosion_scale: 4.0,
            erosion_slope_power: 1.5,
            erosion_cell_scale: 1.0,
            erosion_height_offset: -0.1,
            erosion_gain: 0.5,
            erosion_lacunarity: 2.0,
            erosion_strength: 0.6,
            erosion_octaves: 5,
        }
    }
}

/// Complete configuration snapshot for one generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub backend: KernelBackend,
    pub mesh: MeshConfig,
    pub textures: TextureConfig,
    pub normal: NormalConfig,
    pub terrain: TerrainParams,
}

impl TerrainConfig {
    /// Parses a configuration from JSON; omitted fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of texels across all six faces.
    pub fn texel_count(&self) -> usize {
        let t = self.textures.tile_size as usize;
        6 * t * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TerrainConfig::default();
        assert_eq!(cfg.textures.color_mode, ColorMode::Biome);
        assert!(cfg.normal.enabled);
        assert!(!cfg.mesh.weld_seams);
        assert!(cfg.mesh.subdiv >= 1);
        assert_eq!(cfg.backend, KernelBackend::Gpu);
    }

    #[test]
    fn test_backend_names() {
        let cfg = TerrainConfig::from_json_str(r#"{ "backend": "analytic" }"#).unwrap();
        assert_eq!(cfg.backend, KernelBackend::Analytic);
        assert!(TerrainConfig::from_json_str(r#"{ "backend": "cuda" }"#).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = TerrainConfig::from_json_str(
            r#"{ "mesh": { "subdiv": 2 }, "textures": { "tile_size": 4, "color_mode": "height" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.mesh.subdiv, 2);
        assert_eq!(cfg.mesh.radius, MeshConfig::default().radius);
        assert_eq!(cfg.textures.tile_size, 4);
        assert_eq!(cfg.textures.color_mode, ColorMode::Height);
        assert_eq!(cfg.terrain, TerrainParams::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut cfg = TerrainConfig::default();
        cfg.normal.eps = Some(0.01);
        cfg.terrain.erosion_octaves = 3;
        let json = cfg.to_json_string().unwrap();
        let back = TerrainConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = TerrainConfig::from_json_str("{ mesh: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_normal_eps_defaults_to_one_texel() {
        let normal = NormalConfig::default();
        assert_eq!(normal.eps_for(512), 1.0 / 512.0);
        let normal = NormalConfig {
            eps: Some(0.25),
            ..Default::default()
        };
        assert_eq!(normal.eps_for(512), 0.25);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.json");
        std::fs::write(&path, r#"{ "mesh": { "radius": 6.5 } }"#).unwrap();
        let cfg = TerrainConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.mesh.radius, 6.5);

        let missing = TerrainConfig::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
