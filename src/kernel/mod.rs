//! Terrain simulation kernel interface.
//!
//! The kernel is the data-parallel program that turns the parameter buffer
//! into per-texel height, color and normal fields. Its math is opaque to the
//! rest of the crate: the orchestrator only allocates result buffers,
//! dispatches the two stages over a work grid, and reads the results back.
//!
//! Two implementations are provided: [`gpu::GpuKernel`] runs the bundled
//! WGSL program through wgpu, and [`AnalyticKernel`] evaluates a height
//! function on the CPU for deterministic tests and headless runs.

mod analytic;
pub mod gpu;
mod params;

use thiserror::Error;

pub use analytic::{AnalyticKernel, HostBuffer, Texel};
pub use params::{
    decode_parameters, encode_parameters, CodecError, ParameterBuffer, SimulationParameters,
    PARAMS_SIZE,
};

/// Texels per work group along x and y; z addresses the face.
pub const WORKGROUP_SIZE: u32 = 8;

/// Kernel entry point names.
pub const SYNTHESIZE_ENTRY: &str = "synthesize";
pub const SYNTHESIZE_NORMAL_ENTRY: &str = "synthesize_normal";

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(String),
    #[error("Kernel program unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to allocate buffer '{label}': {message}")]
    Allocation { label: String, message: String },
    #[error("Buffer '{label}' needs {size} bytes, device limit is {limit}")]
    BufferTooLarge { label: String, size: u64, limit: u64 },
    #[error("Unknown buffer handle")]
    UnknownBuffer,
    #[error("Kernel dispatched before parameters were bound")]
    ParametersNotBound,
    #[error("Failed to map result buffer: {0}")]
    Map(String),
    #[error("Invalid parameter buffer: {0}")]
    Codec(#[from] CodecError),
}

impl KernelError {
    /// True when no device could be acquired, before any kernel work ran.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, KernelError::NoAdapter | KernelError::RequestDevice(_))
    }
}

/// Number of work groups dispatched for one kernel stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkGrid {
    /// Grid covering a full cubemap of `tile_size` texels per edge:
    /// `ceil(tile/8) x ceil(tile/8) x 6`.
    pub fn for_tile(tile_size: u32) -> Self {
        let groups = tile_size.div_ceil(WORKGROUP_SIZE);
        Self {
            x: groups,
            y: groups,
            z: 6,
        }
    }

    /// Total number of work groups.
    pub fn group_count(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

/// A data-parallel terrain kernel.
///
/// Calls arrive in pipeline order: buffers are created, parameters bound,
/// both stages dispatched, then all three fields read back together. A
/// kernel may defer execution until [`TerrainKernel::read_back`].
pub trait TerrainKernel {
    /// Device-side result buffer handle.
    type Buffer;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Allocates a device-side result buffer of `size` bytes.
    fn create_field_buffer(&mut self, label: &str, size: u64) -> Result<Self::Buffer, KernelError>;

    /// Binds the 128-byte parameter buffer at slot 0 for subsequent stages.
    fn bind_parameters(&mut self, params: &ParameterBuffer) -> Result<(), KernelError>;

    /// Stage 1: writes the height field (f32) and packed color (u32).
    fn synthesize(
        &mut self,
        grid: WorkGrid,
        height: &Self::Buffer,
        color: &Self::Buffer,
    ) -> Result<(), KernelError>;

    /// Stage 2: writes the packed normal field (u32). Reads only the
    /// parameter buffer, never stage 1 output.
    fn synthesize_normal(&mut self, grid: WorkGrid, normal: &Self::Buffer) -> Result<(), KernelError>;

    /// Copies the three buffers to host memory and waits for all of them.
    fn read_back(&mut self, buffers: [&Self::Buffer; 3]) -> Result<[Vec<u8>; 3], KernelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_grid_rounds_up() {
        assert_eq!(WorkGrid::for_tile(4), WorkGrid { x: 1, y: 1, z: 6 });
        assert_eq!(WorkGrid::for_tile(8), WorkGrid { x: 1, y: 1, z: 6 });
        assert_eq!(WorkGrid::for_tile(9), WorkGrid { x: 2, y: 2, z: 6 });
        assert_eq!(WorkGrid::for_tile(512), WorkGrid { x: 64, y: 64, z: 6 });
        assert_eq!(WorkGrid::for_tile(100).group_count(), 13 * 13 * 6);
    }

    #[test]
    fn test_device_unavailable_errors() {
        assert!(KernelError::NoAdapter.is_device_unavailable());
        assert!(KernelError::RequestDevice("lost".into()).is_device_unavailable());
        assert!(!KernelError::Map("timeout".into()).is_device_unavailable());
        assert!(!KernelError::Unavailable("bad shader".into()).is_device_unavailable());
        let too_large = KernelError::BufferTooLarge {
            label: "height".into(),
            size: 1 << 30,
            limit: 1 << 27,
        };
        assert!(!too_large.is_device_unavailable());
    }

    #[test]
    fn test_grid_covers_every_texel() {
        for tile in [1u32, 3, 8, 17, 64] {
            let grid = WorkGrid::for_tile(tile);
            assert!(grid.x * WORKGROUP_SIZE >= tile);
            assert!((grid.x - 1) * WORKGROUP_SIZE < tile);
        }
    }
}
