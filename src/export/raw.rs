//! Raw little-endian dumps of the generated arrays.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::ExportError;
use crate::geometry::CubeSphereMesh;
use crate::terrain::HeightField;

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Writes the whole height field as f32 little-endian, face-major then
/// row-major, to `{base}_height.raw`.
pub fn export_height_raw(field: &HeightField, output_dir: &Path, base_name: &str) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{base_name}_height.raw"));
    write_bytes(&path, &field.to_le_bytes())?;
    Ok(path)
}

/// Writes the interleaved vertex stream (36 bytes per vertex) and the u32
/// index stream to `{base}_vertices.raw` and `{base}_indices.raw`.
pub fn export_mesh_raw(mesh: &CubeSphereMesh, output_dir: &Path, base_name: &str) -> Result<[PathBuf; 2], ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let vertices = output_dir.join(format!("{base_name}_vertices.raw"));
    let indices = output_dir.join(format!("{base_name}_indices.raw"));
    write_bytes(&vertices, &mesh.vertex_bytes())?;
    write_bytes(&indices, mesh.index_bytes())?;
    Ok([vertices, indices])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_height_raw_layout() {
        let mut field = HeightField::filled(2, 0.0).unwrap();
        field.data_mut()[5] = 1.5;
        let dir = tempdir().unwrap();
        let path = export_height_raw(&field, dir.path(), "planet").unwrap();

        let bytes = std::fs::read(path).unwrap();
        assert_eq!(bytes.len(), 6 * 4 * 4);
        assert_eq!(&bytes[20..24], &1.5f32.to_le_bytes());
    }

    #[test]
    fn test_mesh_raw_sizes() {
        let mesh = CubeSphereMesh::build(2).unwrap();
        let dir = tempdir().unwrap();
        let [v, i] = export_mesh_raw(&mesh, dir.path(), "planet").unwrap();

        assert_eq!(std::fs::metadata(v).unwrap().len(), 6 * 9 * 36);
        assert_eq!(std::fs::metadata(i).unwrap().len(), 6 * 4 * 6 * 4);
    }
}
