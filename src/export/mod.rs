//! Export of generated terrain for inspection.
//!
//! 16-bit PNG height maps and RGBA8 PNG color/normal maps per cube face,
//! plus raw dumps of the height field and the mesh streams.

mod png;
mod raw;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::pipeline::TerrainAssets;

pub use png::{
    export_height_face_png, export_height_png, export_rgba_png, face_file_name, PngExportOptions,
};
pub use raw::{export_height_raw, export_mesh_raw};

/// Errors that can occur during export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
}

/// Which artifacts [`export_assets`] writes.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub height_png: bool,
    pub color_png: bool,
    pub normal_png: bool,
    pub height_raw: bool,
    pub mesh_raw: bool,
    pub png: PngExportOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            height_png: true,
            color_png: true,
            normal_png: true,
            height_raw: false,
            mesh_raw: false,
            png: PngExportOptions::default(),
        }
    }
}

/// Writes the selected artifacts of `assets`; returns every written path.
pub fn export_assets(
    assets: &TerrainAssets,
    output_dir: &Path,
    base_name: &str,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();
    if options.height_png {
        written.extend(export_height_png(&assets.height, output_dir, base_name, &options.png)?);
    }
    if options.color_png {
        written.extend(export_rgba_png(&assets.color, output_dir, base_name, "color", &options.png)?);
    }
    if options.normal_png {
        written.extend(export_rgba_png(&assets.normal, output_dir, base_name, "normal", &options.png)?);
    }
    if options.height_raw {
        written.push(export_height_raw(&assets.height, output_dir, base_name)?);
    }
    if options.mesh_raw {
        written.extend(export_mesh_raw(&assets.mesh, output_dir, base_name)?);
    }
    info!(files = written.len(), dir = %output_dir.display(), "exported terrain");
    Ok(written)
}
