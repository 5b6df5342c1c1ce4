use wgpu::util::DeviceExt;

use crate::geometry::{CubeSphereMesh, Vertex};

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    /// Layout of the interleaved stream: position, normal, direction.
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Vertex and index buffers of a displaced mesh.
pub struct GeometryBuffers {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

pub fn upload_geometry(device: &wgpu::Device, mesh: &CubeSphereMesh) -> GeometryBuffers {
    let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("terrasphere-vertices"),
        contents: &mesh.vertex_bytes(),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("terrasphere-indices"),
        contents: mesh.index_bytes(),
        usage: wgpu::BufferUsages::INDEX,
    });
    GeometryBuffers {
        vertices,
        indices,
        index_count: mesh.index_count() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = Vertex::buffer_layout();
        assert_eq!(layout.array_stride, 36);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(std::mem::offset_of!(Vertex, direction), 24);
    }
}
