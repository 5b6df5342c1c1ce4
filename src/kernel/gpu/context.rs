//! Headless wgpu context for the terrain kernel.

use tracing::debug;

use crate::kernel::KernelError;

/// Holds the wgpu device/queue the kernel dispatches on.
///
/// Pipeline setup lives in `pipelines.rs`.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a headless wgpu device/queue suitable for compute.
    pub async fn new() -> Result<Self, KernelError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(KernelError::NoAdapter)?;

        let info = adapter.get_info();
        debug!(adapter = %info.name, backend = ?info.backend, "selected GPU adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("terrasphere-kernel-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| KernelError::RequestDevice(e.to_string()))?;

        Ok(Self { device, queue })
    }

    /// Blocking variant of [`GpuContext::new`].
    pub fn new_blocking() -> Result<Self, KernelError> {
        pollster::block_on(Self::new())
    }
}
