use crate::geometry::CubeFaceId;
use crate::terrain::Rgba8Field;

use super::RenderError;

/// Color and normal maps validated for upload.
#[derive(Debug, Clone)]
pub struct TerrainTextures {
    pub tile_size: u32,
    pub color: Rgba8Field,
    pub normal: Rgba8Field,
}

impl TerrainTextures {
    /// Checks that both maps are present and match `tile_size`. Runs before
    /// any device work so a failed request never touches the GPU.
    pub fn new(
        color: Option<Rgba8Field>,
        normal: Option<Rgba8Field>,
        tile_size: u32,
    ) -> Result<Self, RenderError> {
        let color = color.ok_or(RenderError::MissingTextureData("color"))?;
        let normal = normal.ok_or(RenderError::MissingTextureData("normal"))?;
        for (name, field) in [("color", &color), ("normal", &normal)] {
            if field.tile_size() != tile_size {
                return Err(RenderError::TileSizeMismatch {
                    name,
                    expected: tile_size,
                    actual: field.tile_size(),
                });
            }
        }
        Ok(Self {
            tile_size,
            color,
            normal,
        })
    }
}

/// Uploaded texture arrays and the sampler to read them with.
pub struct TextureArrays {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub normal: wgpu::Texture,
    pub normal_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

fn upload_array(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, field: &Rgba8Field) -> (wgpu::Texture, wgpu::TextureView) {
    let t = field.tile_size();
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: t,
            height: t,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    // write_texture has no row alignment requirement.
    for face in CubeFaceId::all() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face.index() as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            field.face(face),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * t),
                rows_per_image: Some(t),
            },
            wgpu::Extent3d {
                width: t,
                height: t,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = tex.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        format: Some(wgpu::TextureFormat::Rgba8Unorm),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        aspect: wgpu::TextureAspect::All,
        base_mip_level: 0,
        mip_level_count: Some(1),
        base_array_layer: 0,
        array_layer_count: Some(6),
        usage: None,
    });
    (tex, view)
}

/// Uploads both maps as `Rgba8Unorm` 2D arrays with one layer per face.
pub fn upload_textures(device: &wgpu::Device, queue: &wgpu::Queue, textures: &TerrainTextures) -> TextureArrays {
    let (color, color_view) = upload_array(device, queue, "terrasphere-color-array", &textures.color);
    let (normal, normal_view) = upload_array(device, queue, "terrasphere-normal-array", &textures.normal);

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("terrasphere-terrain-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    TextureArrays {
        color,
        color_view,
        normal,
        normal_view,
        sampler,
    }
}
