//! Cube-sphere base mesh construction.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

use super::face::CubeFaceId;
use super::spherify::cube_to_sphere;

/// Errors raised while building the base mesh.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("Subdivision count must be at least 1")]
    ZeroSubdivision,
}

/// Interleaved vertex as consumed by the renderer: 36 bytes per vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub direction: [f32; 3],
}

/// Triangle mesh over the six cube faces.
///
/// Faces are not welded: every face owns its edge vertices, so a point on a
/// cube edge appears once per face that touches it.
#[derive(Debug, Clone)]
pub struct CubeSphereMesh {
    /// Grid cells per face edge.
    pub subdiv: u32,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Unit direction of each vertex from the sphere center.
    pub directions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl CubeSphereMesh {
    /// Builds the base mesh with `subdiv` cells along each face edge.
    ///
    /// Positions are the unscaled sphere points; normals start out equal to
    /// the directions.
    pub fn build(subdiv: u32) -> Result<Self, MeshError> {
        if subdiv == 0 {
            return Err(MeshError::ZeroSubdivision);
        }

        let n = (subdiv + 1) as usize;
        let vertex_count = 6 * n * n;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut directions = Vec::with_capacity(vertex_count);

        for face in CubeFaceId::all() {
            let basis = face.mesh_basis();
            for j in 0..=subdiv {
                for i in 0..=subdiv {
                    let u = -1.0 + (2 * i) as f32 / subdiv as f32;
                    let v = -1.0 + (2 * j) as f32 / subdiv as f32;
                    let sphere = cube_to_sphere(basis.cube_point(u, v));
                    positions.push(sphere);
                    directions.push(sphere.normalize());
                }
            }
        }

        let normals = directions.clone();
        let indices = build_indices(subdiv);

        Ok(Self {
            subdiv,
            positions,
            normals,
            directions,
            indices,
        })
    }

    /// Number of vertices, `6 * (subdiv + 1)^2`.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices, `36 * subdiv^2`.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertices per face.
    pub fn face_vertex_count(&self) -> usize {
        let n = (self.subdiv + 1) as usize;
        n * n
    }

    /// Interleaves position, normal and direction into the renderer layout.
    pub fn interleaved(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.directions)
            .map(|((p, n), d)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                direction: d.to_array(),
            })
            .collect()
    }

    /// Vertex stream as raw bytes.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.interleaved()).to_vec()
    }

    /// Index stream as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Two triangles per grid cell, wound so `(p1 - p0) x (p2 - p0)` faces out.
fn build_indices(subdiv: u32) -> Vec<u32> {
    let n = subdiv + 1;
    let mut indices = Vec::with_capacity(36 * (subdiv as usize) * (subdiv as usize));

    for face in 0..6u32 {
        let offset = face * n * n;
        for j in 0..subdiv {
            for i in 0..subdiv {
                let v00 = offset + j * n + i;
                let v10 = offset + j * n + (i + 1);
                let v11 = offset + (j + 1) * n + (i + 1);
                let v01 = offset + (j + 1) * n + i;

                indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
            }
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_subdivision_rejected() {
        assert_eq!(CubeSphereMesh::build(0).unwrap_err(), MeshError::ZeroSubdivision);
    }

    #[test]
    fn test_counts_follow_subdivision() {
        for subdiv in 1..=12u32 {
            let mesh = CubeSphereMesh::build(subdiv).unwrap();
            let n = (subdiv + 1) as usize;
            assert_eq!(mesh.vertex_count(), 6 * n * n);
            assert_eq!(mesh.normals.len(), mesh.vertex_count());
            assert_eq!(mesh.directions.len(), mesh.vertex_count());
            assert_eq!(mesh.index_count(), 6 * (subdiv * subdiv) as usize * 6);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        }
    }

    #[test]
    fn test_directions_are_unit() {
        let mesh = CubeSphereMesh::build(16).unwrap();
        for d in &mesh.directions {
            assert!((d.length() - 1.0).abs() < 1e-6, "{:?} has length {}", d, d.length());
        }
    }

    #[test]
    fn test_positions_near_unit_sphere() {
        let mesh = CubeSphereMesh::build(8).unwrap();
        for (p, d) in mesh.positions.iter().zip(&mesh.directions) {
            assert!((p.length() - 1.0).abs() < 1e-5);
            assert!((*p - *d).length() < 1e-5);
        }
    }

    #[test]
    fn test_triangles_wind_outward() {
        let mesh = CubeSphereMesh::build(6).unwrap();
        for tri in mesh.indices.chunks_exact(3) {
            let p0 = mesh.positions[tri[0] as usize];
            let p1 = mesh.positions[tri[1] as usize];
            let p2 = mesh.positions[tri[2] as usize];
            let n = (p1 - p0).cross(p2 - p0);
            let center = (p0 + p1 + p2) / 3.0;
            assert!(n.dot(center) > 0.0, "inward triangle {:?}", tri);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = CubeSphereMesh::build(5).unwrap();
        let b = CubeSphereMesh::build(5).unwrap();
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_face_edges_are_duplicated() {
        // subdiv = 1: each face is a single quad of 4 corner vertices, so
        // each of the 8 cube corners appears 3 times.
        let mesh = CubeSphereMesh::build(1).unwrap();
        let corner = Vec3::new(1.0, 1.0, 1.0).normalize();
        let hits = mesh
            .directions
            .iter()
            .filter(|d| (**d - corner).length() < 1e-5)
            .count();
        assert_eq!(hits, 3);
    }

    #[test]
    fn test_vertex_stream_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
        let mesh = CubeSphereMesh::build(2).unwrap();
        let bytes = mesh.vertex_bytes();
        assert_eq!(bytes.len(), mesh.vertex_count() * 36);
        assert_eq!(mesh.index_bytes().len(), mesh.index_count() * 4);

        let vertices = mesh.interleaved();
        assert_eq!(vertices[7].position, mesh.positions[7].to_array());
        assert_eq!(vertices[7].direction, mesh.directions[7].to_array());
    }
}
