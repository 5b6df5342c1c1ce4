//! Fixed-layout parameter buffer shared with the simulation kernel.
//!
//! The byte layout here and the `Params` struct in `shaders/common.wgsl`
//! must agree field for field.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::config::{ColorMode, TerrainConfig};

/// Size of the encoded parameter buffer in bytes.
pub const PARAMS_SIZE: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Parameter buffer must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Encoded parameter buffer, ready to upload to the kernel's uniform slot.
pub type ParameterBuffer = [u8; PARAMS_SIZE];

/// The 32 four-byte fields read by the kernel: four `u32` then 28 `f32`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimulationParameters {
    // u32 block, offsets 0..16
    pub tile_size: u32,
    /// 1 = grayscale height, 0 = palette.
    pub color_mode: u32,
    pub normal_enabled: u32,
    pub octaves: u32,

    // offset 16
    pub planet_radius: f32,
    pub noise_scale: f32,
    pub alpha: f32,
    pub lacunarity: f32,

    // offset 32
    pub gain: f32,
    pub disp_scale: f32,
    pub disp_bias: f32,
    pub normal_eps: f32,

    // offset 48
    pub out_min: f32,
    pub out_max: f32,
    pub _reserved0: [f32; 2],

    // offset 64
    pub erosion_scale: f32,
    pub erosion_slope_power: f32,
    pub erosion_cell_scale: f32,
    pub erosion_height_offset: f32,

    // offset 80
    pub erosion_gain: f32,
    pub erosion_lacunarity: f32,
    pub erosion_strength: f32,
    pub water_height: f32,

    // offset 96
    pub octaves_f: f32,
    pub erosion_octaves_f: f32,
    pub _reserved1: [f32; 6],
}

const _: () = assert!(std::mem::size_of::<SimulationParameters>() == PARAMS_SIZE);

impl SimulationParameters {
    /// Collects the kernel-facing fields of a configuration snapshot.
    ///
    /// Values are copied verbatim; the only derived field is `normal_eps`,
    /// which falls back to one texel when the configuration leaves it unset.
    pub fn from_config(cfg: &TerrainConfig) -> Self {
        let t = &cfg.terrain;
        let tile_size = cfg.textures.tile_size;
        Self {
            tile_size,
            color_mode: match cfg.textures.color_mode {
                ColorMode::Height => 1,
                ColorMode::Biome => 0,
            },
            normal_enabled: cfg.normal.enabled as u32,
            octaves: t.octaves,

            planet_radius: cfg.mesh.radius,
            noise_scale: t.noise_scale,
            alpha: t.alpha,
            lacunarity: t.lacunarity,

            gain: t.gain,
            disp_scale: t.disp_scale,
            disp_bias: t.disp_bias,
            normal_eps: cfg.normal.eps_for(tile_size),

            out_min: t.out_min,
            out_max: t.out_max,
            _reserved0: [0.0; 2],

            erosion_scale: t.erosion_scale,
            erosion_slope_power: t.erosion_slope_power,
            erosion_cell_scale: t.erosion_cell_scale,
            erosion_height_offset: t.erosion_height_offset,

            erosion_gain: t.erosion_gain,
            erosion_lacunarity: t.erosion_lacunarity,
            erosion_strength: t.erosion_strength,
            water_height: cfg.textures.water_height,

            octaves_f: t.octaves as f32,
            erosion_octaves_f: t.erosion_octaves as f32,
            _reserved1: [0.0; 6],
        }
    }

    /// Serializes to the 128-byte little-endian wire layout.
    pub fn to_bytes(&self) -> ParameterBuffer {
        let mut out = [0u8; PARAMS_SIZE];
        for (chunk, word) in out
            .chunks_exact_mut(4)
            .zip(bytemuck::cast_slice::<Self, u32>(std::slice::from_ref(self)))
        {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Parses the 128-byte wire layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != PARAMS_SIZE {
            return Err(CodecError::InvalidLength {
                expected: PARAMS_SIZE,
                actual: bytes.len(),
            });
        }
        let mut words = [0u32; PARAMS_SIZE / 4];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(bytemuck::cast(words))
    }
}

/// Encodes a configuration snapshot into the kernel parameter buffer.
pub fn encode_parameters(cfg: &TerrainConfig) -> ParameterBuffer {
    SimulationParameters::from_config(cfg).to_bytes()
}

/// Decodes a parameter buffer produced by [`encode_parameters`].
pub fn decode_parameters(bytes: &[u8]) -> Result<SimulationParameters, CodecError> {
    SimulationParameters::from_bytes(bytes)
}
