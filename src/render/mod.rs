//! Hand-off of generated terrain to a wgpu renderer.
//!
//! Creates the GPU resources a renderer binds: a vertex and index buffer
//! for the displaced mesh and two 6-layer RGBA8 texture arrays for the
//! color and normal maps. Building pipelines and drawing is up to the
//! caller.

mod geometry;
mod textures;

use thiserror::Error;

pub use geometry::{upload_geometry, GeometryBuffers};
pub use textures::{upload_textures, TerrainTextures, TextureArrays};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Missing {0} texture data")]
    MissingTextureData(&'static str),
    #[error("{name} texture has tile size {actual}, expected {expected}")]
    TileSizeMismatch {
        name: &'static str,
        expected: u32,
        actual: u32,
    },
}
