//! wgpu compute implementation of the terrain kernel.

mod context;
mod pipelines;

pub use context::GpuContext;
pub use pipelines::GpuKernel;
