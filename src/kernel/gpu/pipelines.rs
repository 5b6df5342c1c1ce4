//! Compute pipelines for the two terrain synthesis stages.

use std::borrow::Cow;
use std::num::NonZeroU64;

use tracing::debug;

use super::context::GpuContext;
use crate::kernel::{
    KernelError, ParameterBuffer, TerrainKernel, WorkGrid, PARAMS_SIZE, SYNTHESIZE_ENTRY,
    SYNTHESIZE_NORMAL_ENTRY,
};

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const SYNTHESIZE_WGSL: &str = include_str!("shaders/synthesize.wgsl");
const SYNTHESIZE_NORMAL_WGSL: &str = include_str!("shaders/synthesize_normal.wgsl");

fn params_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(PARAMS_SIZE as u64),
        },
        count: None,
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// The bundled WGSL kernel running on a wgpu device.
///
/// Dispatches are recorded into one pending command encoder; nothing is
/// submitted until [`TerrainKernel::read_back`].
pub struct GpuKernel {
    ctx: GpuContext,
    synthesize_bgl: wgpu::BindGroupLayout,
    normal_bgl: wgpu::BindGroupLayout,
    synthesize: wgpu::ComputePipeline,
    synthesize_normal: wgpu::ComputePipeline,
    params: Option<wgpu::Buffer>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuKernel {
    /// Compiles both stages on the given context.
    pub fn new(ctx: GpuContext) -> Result<Self, KernelError> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = |label: &str, pass: &str| {
            ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(format!("{COMMON_WGSL}\n{pass}"))),
            })
        };
        let synthesize_module = module("terrasphere-synthesize-wgsl", SYNTHESIZE_WGSL);
        let normal_module = module("terrasphere-synthesize-normal-wgsl", SYNTHESIZE_NORMAL_WGSL);

        let synthesize_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrasphere-synthesize-bgl"),
            entries: &[
                params_entry(),
                // Height (f32)
                storage_entry(1),
                // Packed color (u32)
                storage_entry(2),
            ],
        });
        let normal_bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrasphere-synthesize-normal-bgl"),
            entries: &[params_entry(), storage_entry(1)],
        });

        let pipeline = |label: &str, bgl: &wgpu::BindGroupLayout, module: &wgpu::ShaderModule, entry: &str| {
            let layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[bgl],
                push_constant_ranges: &[],
            });
            ctx.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                module,
                entry_point: Some(entry),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let synthesize = pipeline("synthesize", &synthesize_bgl, &synthesize_module, SYNTHESIZE_ENTRY);
        let synthesize_normal = pipeline(
            "synthesize_normal",
            &normal_bgl,
            &normal_module,
            SYNTHESIZE_NORMAL_ENTRY,
        );

        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(KernelError::Unavailable(err.to_string()));
        }

        Ok(Self {
            ctx,
            synthesize_bgl,
            normal_bgl,
            synthesize,
            synthesize_normal,
            params: None,
            encoder: None,
        })
    }

    /// Creates a headless context and compiles the kernel on it.
    pub fn new_headless() -> Result<Self, KernelError> {
        Self::new(GpuContext::new_blocking()?)
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn dispatch(&mut self, label: &str, pipeline_is_normal: bool, grid: WorkGrid, bind_group: wgpu::BindGroup) {
        let device = &self.ctx.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("terrasphere-kernel-encoder"),
            })
        });
        let pipeline = if pipeline_is_normal {
            &self.synthesize_normal
        } else {
            &self.synthesize
        };

        debug!(stage = label, x = grid.x, y = grid.y, z = grid.z, "dispatching kernel stage");
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, &bind_group, &[]);
        cpass.dispatch_workgroups(grid.x, grid.y, grid.z);
    }

    fn bound_params(&self) -> Result<&wgpu::Buffer, KernelError> {
        self.params.as_ref().ok_or(KernelError::ParametersNotBound)
    }
}

impl TerrainKernel for GpuKernel {
    type Buffer = wgpu::Buffer;

    fn name(&self) -> &str {
        "wgpu"
    }

    fn create_field_buffer(&mut self, label: &str, size: u64) -> Result<wgpu::Buffer, KernelError> {
        let limits = self.ctx.device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        if size > limit {
            return Err(KernelError::BufferTooLarge {
                label: label.to_string(),
                size,
                limit,
            });
        }

        self.ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            return Err(KernelError::Allocation {
                label: label.to_string(),
                message: err.to_string(),
            });
        }
        Ok(buffer)
    }

    fn bind_parameters(&mut self, params: &ParameterBuffer) -> Result<(), KernelError> {
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrasphere-params"),
            size: PARAMS_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.ctx.queue.write_buffer(&buffer, 0, params);
        self.params = Some(buffer);
        Ok(())
    }

    fn synthesize(
        &mut self,
        grid: WorkGrid,
        height: &wgpu::Buffer,
        color: &wgpu::Buffer,
    ) -> Result<(), KernelError> {
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrasphere-synthesize-bind-group"),
            layout: &self.synthesize_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.bound_params()?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: height.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: color.as_entire_binding(),
                },
            ],
        });
        self.dispatch("synthesize", false, grid, bind_group);
        Ok(())
    }

    fn synthesize_normal(&mut self, grid: WorkGrid, normal: &wgpu::Buffer) -> Result<(), KernelError> {
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrasphere-synthesize-normal-bind-group"),
            layout: &self.normal_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.bound_params()?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: normal.as_entire_binding(),
                },
            ],
        });
        self.dispatch("synthesize_normal", true, grid, bind_group);
        Ok(())
    }

    fn read_back(&mut self, buffers: [&wgpu::Buffer; 3]) -> Result<[Vec<u8>; 3], KernelError> {
        let device = &self.ctx.device;
        let mut encoder = self.encoder.take().unwrap_or_else(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("terrasphere-kernel-encoder"),
            })
        });

        let staging = buffers.map(|src| {
            let dst = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("terrasphere-readback-buffer"),
                size: src.size(),
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            encoder.copy_buffer_to_buffer(src, 0, &dst, 0, src.size());
            dst
        });
        self.ctx.queue.submit(Some(encoder.finish()));

        // Map all three, then block until every callback has fired.
        let (tx, rx) = std::sync::mpsc::channel();
        for (i, buffer) in staging.iter().enumerate() {
            let tx = tx.clone();
            buffer.slice(..).map_async(wgpu::MapMode::Read, move |r| {
                let _ = tx.send((i, r));
            });
        }
        drop(tx);
        device.poll(wgpu::Maintain::Wait);

        for _ in 0..staging.len() {
            let (i, result) = rx
                .recv()
                .map_err(|e| KernelError::Map(format!("mapping callback dropped: {e}")))?;
            result.map_err(|e| KernelError::Map(format!("buffer {i}: {e}")))?;
        }

        let out = staging.map(|buffer| {
            let bytes = buffer.slice(..).get_mapped_range().to_vec();
            buffer.unmap();
            bytes
        });
        self.params = None;
        Ok(out)
    }
}
