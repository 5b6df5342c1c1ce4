//! Generation stage trait and pipeline orchestration.

use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{KernelBackend, TerrainConfig};
use crate::geometry::CubeSphereMesh;
use crate::kernel::gpu::GpuKernel;
use crate::kernel::{encode_parameters, AnalyticKernel, ParameterBuffer, TerrainKernel};
use crate::simulation::{SimulationOrchestrator, SimulationOutput};
use crate::terrain::{displace, recompute_normals, weld_seams, Displacement, HeightField, Rgba8Field};

/// Unique identifier for generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Base cube-sphere mesh.
    Mesh,
    /// Parameter buffer encoding.
    Parameters,
    /// Two-stage kernel run and readback.
    Simulation,
    /// Radial displacement of mesh vertices.
    Displacement,
    /// Normal reconstruction (and optional seam weld).
    Normals,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Mesh => "mesh",
            StageId::Parameters => "parameters",
            StageId::Simulation => "simulation",
            StageId::Displacement => "displacement",
            StageId::Normals => "normals",
        }
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),
    #[error("Missing dependency: stage '{0}' requires '{1}'")]
    MissingDependency(String, String),
}

impl PipelineError {
    fn stage(stage: &dyn GenerationStage, err: impl ToString) -> Self {
        PipelineError::StageFailed(stage.name().to_string(), err.to_string())
    }
}

/// Intermediate products of one generation request.
#[derive(Debug, Default)]
pub struct TerrainBuild {
    pub mesh: Option<CubeSphereMesh>,
    pub params: Option<ParameterBuffer>,
    pub simulation: Option<SimulationOutput>,
    /// Name of the kernel that produced `simulation`.
    pub backend: Option<String>,
}

/// Everything the renderer needs for one generated planet.
#[derive(Debug, Clone)]
pub struct TerrainAssets {
    /// Displaced mesh with reconstructed normals.
    pub mesh: CubeSphereMesh,
    pub tile_size: u32,
    pub height: HeightField,
    pub color: Rgba8Field,
    pub normal: Rgba8Field,
    /// Passed through from the configuration for the renderer's shading.
    pub normal_strength: Option<f32>,
    pub normal_scale: Option<f32>,
    pub backend: String,
}

/// Trait for implementing generation stages.
///
/// Each stage reads the products of earlier stages from the
/// [`TerrainBuild`] and adds its own.
pub trait GenerationStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Returns the stage IDs that must be executed before this stage.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Executes the stage, recording its output in `build`.
    fn execute(&self, build: &mut TerrainBuild, config: &TerrainConfig) -> Result<(), PipelineError>;
}

/// Runs the generation stages for one configuration snapshot.
pub struct TerrainPipeline {
    stages: Vec<Box<dyn GenerationStage>>,
    config: TerrainConfig,
}

impl TerrainPipeline {
    /// Creates a new empty pipeline with the given configuration.
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// The full mesh -> simulation -> displaced mesh pipeline, with the
    /// kernel chosen by `config.backend`.
    pub fn standard(config: TerrainConfig) -> Self {
        let backend = config.backend;
        Self::standard_with(config, SimulationStage::new(backend))
    }

    /// The full pipeline with an explicit simulation stage.
    pub fn standard_with(config: TerrainConfig, simulation: SimulationStage) -> Self {
        let mut pipeline = Self::new(config);
        pipeline
            .add_stage(MeshStage)
            .add_stage(ParameterStage)
            .add_stage(simulation)
            .add_stage(DisplacementStage)
            .add_stage(NormalStage);
        pipeline
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: GenerationStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Executes all stages in order and returns the intermediate products.
    pub fn run_stages(&self) -> Result<TerrainBuild, PipelineError> {
        self.run_stages_with_callbacks(|_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages, calling back when each begins and finishes.
    pub fn run_stages_with_callbacks<F1, F2>(
        &self,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<TerrainBuild, PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::new();
        let mut build = TerrainBuild::default();
        let pipeline_start = Instant::now();

        for (i, stage) in self.stages.iter().enumerate() {
            on_stage_start(stage.name(), i, total);

            // Check dependencies
            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::MissingDependency(
                        stage.name().to_string(),
                        dep.name().to_string(),
                    ));
                }
            }

            let start = Instant::now();
            stage.execute(&mut build, &self.config)?;
            info!(
                stage = stage.id().name(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "stage complete"
            );
            completed.push(stage.id());

            on_stage_complete(stage.name(), i, total);
        }

        info!(
            stages = total,
            elapsed_ms = pipeline_start.elapsed().as_millis() as u64,
            "terrain pipeline complete"
        );
        Ok(build)
    }

    /// Executes all stages and assembles the renderer hand-off.
    pub fn run(&self) -> Result<TerrainAssets, PipelineError> {
        self.run_with_callbacks(|_, _, _| {}, |_, _, _| {})
    }

    /// Like [`run`](Self::run), with stage progress callbacks.
    pub fn run_with_callbacks<F1, F2>(&self, on_stage_start: F1, on_stage_complete: F2) -> Result<TerrainAssets, PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let build = self.run_stages_with_callbacks(on_stage_start, on_stage_complete)?;
        let incomplete = |what: &str| PipelineError::StageFailed("assemble".to_string(), format!("no {what} produced"));

        let mesh = build.mesh.ok_or_else(|| incomplete("mesh"))?;
        let sim = build.simulation.ok_or_else(|| incomplete("simulation output"))?;
        Ok(TerrainAssets {
            mesh,
            tile_size: sim.tile_size,
            height: sim.height,
            color: sim.color,
            normal: sim.normal,
            normal_strength: self.config.normal.strength,
            normal_scale: self.config.normal.generated_scale,
            backend: build.backend.unwrap_or_default(),
        })
    }
}

/// Builds the undisplaced cube-sphere mesh.
pub struct MeshStage;

impl GenerationStage for MeshStage {
    fn id(&self) -> StageId {
        StageId::Mesh
    }

    fn name(&self) -> &str {
        "Base Mesh"
    }

    fn execute(&self, build: &mut TerrainBuild, config: &TerrainConfig) -> Result<(), PipelineError> {
        let mesh = CubeSphereMesh::build(config.mesh.subdiv).map_err(|e| PipelineError::stage(self, e))?;
        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "built cube-sphere mesh"
        );
        build.mesh = Some(mesh);
        Ok(())
    }
}

/// Encodes the configuration into the kernel parameter buffer.
pub struct ParameterStage;

impl GenerationStage for ParameterStage {
    fn id(&self) -> StageId {
        StageId::Parameters
    }

    fn name(&self) -> &str {
        "Parameter Encoding"
    }

    fn execute(&self, build: &mut TerrainBuild, config: &TerrainConfig) -> Result<(), PipelineError> {
        build.params = Some(encode_parameters(config));
        Ok(())
    }
}

/// Runs the terrain kernel and reads back its fields.
pub struct SimulationStage {
    backend: KernelBackend,
    analytic: AnalyticKernel,
}

impl SimulationStage {
    /// Uses [`AnalyticKernel::rolling_hills`] whenever the CPU kernel runs.
    pub fn new(backend: KernelBackend) -> Self {
        Self::with_analytic(backend, AnalyticKernel::rolling_hills())
    }

    /// Uses `analytic` whenever the CPU kernel runs.
    pub fn with_analytic(backend: KernelBackend, analytic: AnalyticKernel) -> Self {
        Self { backend, analytic }
    }

    fn run_on<K: TerrainKernel>(
        &self,
        kernel: K,
        params: &ParameterBuffer,
        tile: u32,
    ) -> Result<SimulationOutput, PipelineError> {
        SimulationOrchestrator::new(kernel)
            .run(params, tile)
            .map_err(|e| PipelineError::stage(self, e))
    }

    fn run_analytic(&self, params: &ParameterBuffer, tile: u32) -> Result<(SimulationOutput, String), PipelineError> {
        let out = self.run_on(self.analytic.clone(), params, tile)?;
        Ok((out, "analytic-cpu".to_string()))
    }

    fn run_gpu(&self, kernel: GpuKernel, params: &ParameterBuffer, tile: u32) -> Result<(SimulationOutput, String), PipelineError> {
        let out = self.run_on(kernel, params, tile)?;
        Ok((out, "wgpu".to_string()))
    }
}

impl GenerationStage for SimulationStage {
    fn id(&self) -> StageId {
        StageId::Simulation
    }

    fn name(&self) -> &str {
        "Terrain Simulation"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Parameters]
    }

    fn execute(&self, build: &mut TerrainBuild, config: &TerrainConfig) -> Result<(), PipelineError> {
        let params = build
            .params
            .ok_or_else(|| PipelineError::stage(self, "parameter buffer missing"))?;
        let tile = config.textures.tile_size;

        let (output, backend) = match self.backend {
            KernelBackend::Analytic => self.run_analytic(&params, tile)?,
            KernelBackend::Gpu => {
                let kernel = GpuKernel::new_headless().map_err(|e| PipelineError::stage(self, e))?;
                self.run_gpu(kernel, &params, tile)?
            }
            // Only a missing device falls back; failures after acquisition are fatal.
            KernelBackend::Auto => match GpuKernel::new_headless() {
                Ok(kernel) => self.run_gpu(kernel, &params, tile)?,
                Err(e) if e.is_device_unavailable() => {
                    warn!(error = %e, "GPU device unavailable, falling back to analytic kernel");
                    self.run_analytic(&params, tile)?
                }
                Err(e) => return Err(PipelineError::stage(self, e)),
            },
        };

        build.simulation = Some(output);
        build.backend = Some(backend);
        Ok(())
    }
}

/// Moves mesh vertices to their displaced radius.
pub struct DisplacementStage;

impl GenerationStage for DisplacementStage {
    fn id(&self) -> StageId {
        StageId::Displacement
    }

    fn name(&self) -> &str {
        "Mesh Displacement"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Mesh, StageId::Simulation]
    }

    fn execute(&self, build: &mut TerrainBuild, config: &TerrainConfig) -> Result<(), PipelineError> {
        let (Some(mesh), Some(sim)) = (build.mesh.as_mut(), build.simulation.as_ref()) else {
            return Err(PipelineError::stage(self, "mesh or height field missing"));
        };
        mesh.positions = displace(&mesh.directions, &sim.height, Displacement::from_config(config));
        Ok(())
    }
}

/// Rebuilds vertex normals from the displaced positions.
pub struct NormalStage;

impl GenerationStage for NormalStage {
    fn id(&self) -> StageId {
        StageId::Normals
    }

    fn name(&self) -> &str {
        "Normal Reconstruction"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Displacement]
    }

    fn execute(&self, build: &mut TerrainBuild, config: &TerrainConfig) -> Result<(), PipelineError> {
        let Some(mesh) = build.mesh.as_mut() else {
            return Err(PipelineError::stage(self, "mesh missing"));
        };
        mesh.normals = recompute_normals(&mesh.positions, &mesh.indices);
        if config.mesh.weld_seams {
            weld_seams(&mesh.directions, &mut mesh.positions, &mut mesh.normals);
        }
        Ok(())
    }
}
