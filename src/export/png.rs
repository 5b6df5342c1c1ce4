//! PNG export of the cubemap fields, one file per face.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::ExportError;
use crate::geometry::CubeFaceId;
use crate::terrain::{HeightField, Rgba8Field};

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Height mapped to 0; `None` uses the field minimum.
    pub min_height: Option<f32>,
    /// Height mapped to 65535; `None` uses the field maximum.
    pub max_height: Option<f32>,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: None,
            max_height: None,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Normalization range for `field`, filling unset bounds from its data.
    pub fn range_for(&self, field: &HeightField) -> (f32, f32) {
        let (lo, hi) = field.range().unwrap_or((0.0, 0.0));
        (self.min_height.unwrap_or(lo), self.max_height.unwrap_or(hi))
    }
}

/// `{base}_{kind}_{face}.png`
pub fn face_file_name(base_name: &str, kind: &str, face: CubeFaceId) -> String {
    format!("{}_{}_{}.png", base_name, kind, face.short_name())
}

fn write_png(path: &Path, bytes: &[u8], size: u32, color: ExtendedColorType, options: &PngExportOptions) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    encoder.write_image(bytes, size, size, color)?;
    Ok(())
}

/// Writes one face of the height field as a 16-bit grayscale PNG.
pub fn export_height_face_png(
    field: &HeightField,
    face: CubeFaceId,
    path: &Path,
    min: f32,
    max: f32,
    options: &PngExportOptions,
) -> Result<(), ExportError> {
    if min.is_nan() || max.is_nan() || min >= max {
        return Err(ExportError::InvalidHeightRange(min, max));
    }

    let range = max - min;
    // The encoder takes native-endian 16-bit samples.
    let bytes: Vec<u8> = field
        .face(face)
        .iter()
        .flat_map(|&h| {
            let normalized = ((h - min) / range).clamp(0.0, 1.0);
            ((normalized * 65535.0) as u16).to_ne_bytes()
        })
        .collect();
    write_png(path, &bytes, field.tile_size(), ExtendedColorType::L16, options)
}

/// Writes all six faces of the height field; returns the written paths.
pub fn export_height_png(
    field: &HeightField,
    output_dir: &Path,
    base_name: &str,
    options: &PngExportOptions,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let (mut min, mut max) = options.range_for(field);
    if min == max && options.min_height.is_none() && options.max_height.is_none() {
        // Flat field: widen so it still exports (as black).
        max = min + 1.0;
    }
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }

    CubeFaceId::all()
        .into_iter()
        .map(|face| -> Result<PathBuf, ExportError> {
            let path = output_dir.join(face_file_name(base_name, "height", face));
            export_height_face_png(field, face, &path, min, max, options)?;
            Ok(path)
        })
        .collect()
}

/// Writes all six faces of an RGBA8 field (color or normal map).
pub fn export_rgba_png(
    field: &Rgba8Field,
    output_dir: &Path,
    base_name: &str,
    kind: &str,
    options: &PngExportOptions,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    CubeFaceId::all()
        .into_iter()
        .map(|face| -> Result<PathBuf, ExportError> {
            let path = output_dir.join(face_file_name(base_name, kind, face));
            write_png(&path, field.face(face), field.tile_size(), ExtendedColorType::Rgba8, options)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient(tile: u32) -> HeightField {
        let data = (0..6 * tile * tile).map(|i| (i % tile) as f32 / tile as f32).collect();
        HeightField::new(tile, data).unwrap()
    }

    #[test]
    fn test_export_height_png() {
        let field = gradient(16);
        let dir = tempdir().unwrap();
        let paths = export_height_png(&field, dir.path(), "planet", &PngExportOptions::default()).unwrap();

        assert_eq!(paths.len(), 6);
        for face in CubeFaceId::all() {
            let path = dir.path().join(format!("planet_height_{}.png", face.short_name()));
            assert!(path.exists(), "Missing file for {:?}", face);
        }

        let img = image::open(&paths[0]).unwrap().into_luma16();
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(15, 3).0[0], 65535);
    }

    #[test]
    fn test_flat_field_exports() {
        let field = HeightField::filled(4, 0.0).unwrap();
        let dir = tempdir().unwrap();
        assert!(export_height_png(&field, dir.path(), "flat", &PngExportOptions::default()).is_ok());
    }

    #[test]
    fn test_invalid_height_range() {
        let field = gradient(4);
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.png");
        let options = PngExportOptions::default();

        let result = export_height_face_png(&field, CubeFaceId::PosZ, &path, 1.0, -1.0, &options);
        assert!(matches!(result, Err(ExportError::InvalidHeightRange(..))));
        let result = export_height_face_png(&field, CubeFaceId::PosZ, &path, f32::NAN, 1.0, &options);
        assert!(result.is_err());
    }

    #[test]
    fn test_export_rgba_png() {
        let mut bytes = vec![0u8; 6 * 2 * 2 * 4];
        // Face 1 (+Z), texel (1, 0).
        bytes[16 + 4..16 + 8].copy_from_slice(&[10, 20, 30, 255]);
        let field = Rgba8Field::new(2, bytes).unwrap();
        let dir = tempdir().unwrap();
        export_rgba_png(&field, dir.path(), "planet", "color", &PngExportOptions::default()).unwrap();

        let img = image::open(dir.path().join("planet_color_posz.png")).unwrap().into_rgba8();
        assert_eq!(img.get_pixel(1, 0).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
