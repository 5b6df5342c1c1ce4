//! CPU kernel evaluating an analytic height function.
//!
//! Follows the same work-grid addressing and output encoding as the WGSL
//! kernel, so everything downstream of the orchestrator can be exercised
//! without a GPU.

use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;

use super::params::{decode_parameters, ParameterBuffer, SimulationParameters};
use super::{KernelError, TerrainKernel, WorkGrid, WORKGROUP_SIZE};
use crate::geometry::{face_uv_to_direction, texel_to_uv, CubeFaceId};

/// A point at which the height function is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texel {
    pub face: CubeFaceId,
    /// Face coordinate in [0, 1].
    pub u: f32,
    pub v: f32,
    /// Unit direction of the face coordinate.
    pub direction: Vec3,
}

type HeightFn = dyn Fn(Texel, &SimulationParameters) -> f32 + Send + Sync;

/// Handle to a buffer owned by an [`AnalyticKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBuffer(usize);

/// Deterministic CPU stand-in for the erosion kernel.
#[derive(Clone)]
pub struct AnalyticKernel {
    height_fn: Arc<HeightFn>,
    params: Option<SimulationParameters>,
    buffers: Vec<Vec<u8>>,
}

impl AnalyticKernel {
    /// Creates a kernel from an arbitrary height function.
    pub fn new<F>(height_fn: F) -> Self
    where
        F: Fn(Texel, &SimulationParameters) -> f32 + Send + Sync + 'static,
    {
        Self {
            height_fn: Arc::new(height_fn),
            params: None,
            buffers: Vec::new(),
        }
    }

    /// Kernel producing the same height everywhere.
    pub fn constant(height: f32) -> Self {
        Self::new(move |_, _| height)
    }

    /// Smooth low-frequency relief, clamped to the configured output range.
    pub fn rolling_hills() -> Self {
        Self::new(|texel, p| {
            let d = texel.direction * p.noise_scale;
            let h = 0.5 * (d.x * 1.7).sin() * (d.y * 2.3).cos() + 0.25 * (d.z * 3.1 + d.x).sin();
            h.max(p.out_min.min(p.out_max)).min(p.out_max.max(p.out_min))
        })
    }

    fn buffer_mut(&mut self, handle: &HostBuffer) -> Result<&mut Vec<u8>, KernelError> {
        self.buffers.get_mut(handle.0).ok_or(KernelError::UnknownBuffer)
    }

    fn bound_params(&self) -> Result<SimulationParameters, KernelError> {
        self.params.ok_or(KernelError::ParametersNotBound)
    }

    /// Runs `f` for every texel covered by `grid`, face-major row-major.
    fn evaluate<T, F>(grid: WorkGrid, tile_size: u32, f: F) -> Vec<T>
    where
        T: Copy + Default + Send,
        F: Fn(CubeFaceId, u32, u32) -> T + Send + Sync,
    {
        let t = tile_size as usize;
        let mut out = vec![T::default(); 6 * t * t];
        if t == 0 {
            return out;
        }
        let faces = grid.z.min(6) as usize;
        let covered = (grid.x * WORKGROUP_SIZE).min(tile_size);
        let covered_y = (grid.y * WORKGROUP_SIZE).min(tile_size);

        out.par_chunks_mut(t * t)
            .take(faces)
            .enumerate()
            .for_each(|(face_index, layer)| {
                let Some(face) = CubeFaceId::from_index(face_index) else {
                    return;
                };
                for y in 0..covered_y {
                    for x in 0..covered {
                        layer[y as usize * t + x as usize] = f(face, x, y);
                    }
                }
            });
        out
    }

    fn sample(&self, face: CubeFaceId, u: f32, v: f32, params: &SimulationParameters) -> f32 {
        let texel = Texel {
            face,
            u,
            v,
            direction: face_uv_to_direction(face, u, v),
        };
        (self.height_fn)(texel, params)
    }
}

fn write_words(dst: &mut [u8], words: &[u32]) {
    for (chunk, word) in dst.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Packs four [0, 1] channels into a u32 with R in the low byte.
pub(crate) fn pack_unorm4x8(c: [f32; 4]) -> u32 {
    let b = c.map(|x| (x.clamp(0.0, 1.0) * 255.0 + 0.5) as u8);
    u32::from_le_bytes(b)
}

/// Surface color for a height, mirroring the WGSL palette.
pub(crate) fn shade(height: f32, p: &SimulationParameters) -> [f32; 4] {
    let span = p.out_max - p.out_min;
    let norm = if span.abs() > f32::EPSILON {
        ((height - p.out_min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    if p.color_mode == 1 {
        return [norm, norm, norm, 1.0];
    }

    let lerp = |a: [f32; 3], b: [f32; 3], t: f32| {
        let t = t.clamp(0.0, 1.0);
        [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, a[2] + (b[2] - a[2]) * t]
    };
    let water_norm = if span.abs() > f32::EPSILON {
        ((p.water_height - p.out_min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let rgb = if height < p.water_height {
        let depth = if water_norm > 0.0 { norm / water_norm } else { 0.0 };
        lerp([0.02, 0.06, 0.25], [0.10, 0.35, 0.60], depth)
    } else {
        let land = if water_norm < 1.0 { (norm - water_norm) / (1.0 - water_norm) } else { 1.0 };
        if land < 0.5 {
            lerp([0.20, 0.45, 0.15], [0.45, 0.38, 0.25], land * 2.0)
        } else {
            lerp([0.45, 0.38, 0.25], [0.95, 0.95, 0.97], (land - 0.5) * 2.0)
        }
    };
    [rgb[0], rgb[1], rgb[2], 1.0]
}

impl TerrainKernel for AnalyticKernel {
    type Buffer = HostBuffer;

    fn name(&self) -> &str {
        "analytic-cpu"
    }

    fn create_field_buffer(&mut self, _label: &str, size: u64) -> Result<HostBuffer, KernelError> {
        self.buffers.push(vec![0u8; size as usize]);
        Ok(HostBuffer(self.buffers.len() - 1))
    }

    fn bind_parameters(&mut self, params: &ParameterBuffer) -> Result<(), KernelError> {
        self.params = Some(decode_parameters(params)?);
        Ok(())
    }

    fn synthesize(
        &mut self,
        grid: WorkGrid,
        height: &HostBuffer,
        color: &HostBuffer,
    ) -> Result<(), KernelError> {
        let params = self.bound_params()?;
        let tile = params.tile_size;

        let heights: Vec<f32> = Self::evaluate(grid, tile, |face, x, y| {
            self.sample(face, texel_to_uv(x, tile), texel_to_uv(y, tile), &params)
        });
        let colors: Vec<u32> = heights.iter().map(|&h| pack_unorm4x8(shade(h, &params))).collect();

        write_words(self.buffer_mut(height)?, bytemuck::cast_slice(&heights));
        write_words(self.buffer_mut(color)?, &colors);
        Ok(())
    }

    fn synthesize_normal(&mut self, grid: WorkGrid, normal: &HostBuffer) -> Result<(), KernelError> {
        let params = self.bound_params()?;
        let tile = params.tile_size;
        let flat = pack_unorm4x8([0.5, 0.5, 1.0, 1.0]);

        let normals: Vec<u32> = Self::evaluate(grid, tile, |face, x, y| {
            if params.normal_enabled == 0 {
                return flat;
            }
            let (u, v) = (texel_to_uv(x, tile), texel_to_uv(y, tile));
            let e = params.normal_eps;
            let dhdu = (self.sample(face, u + e, v, &params) - self.sample(face, u - e, v, &params)) / (2.0 * e);
            let dhdv = (self.sample(face, u, v + e, &params) - self.sample(face, u, v - e, &params)) / (2.0 * e);
            let n = Vec3::new(
                -dhdu * params.disp_scale,
                -dhdv * params.disp_scale,
                2.0 * params.planet_radius,
            )
            .try_normalize()
            .unwrap_or(Vec3::Z);
            let c = n * 0.5 + Vec3::splat(0.5);
            pack_unorm4x8([c.x, c.y, c.z, 1.0])
        });

        write_words(self.buffer_mut(normal)?, &normals);
        Ok(())
    }

    fn read_back(&mut self, buffers: [&HostBuffer; 3]) -> Result<[Vec<u8>; 3], KernelError> {
        let [a, b, c] = buffers;
        let get = |h: &HostBuffer| self.buffers.get(h.0).cloned().ok_or(KernelError::UnknownBuffer);
        Ok([get(a)?, get(b)?, get(c)?])
    }
}
