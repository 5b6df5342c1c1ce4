//! Pipeline module for orchestrating terrain generation stages.
//!
//! Provides a trait-based architecture for the stages of one generation
//! request, composed into [`TerrainPipeline`].

mod stage;

pub use stage::{
    DisplacementStage, GenerationStage, MeshStage, NormalStage, ParameterStage, PipelineError,
    SimulationStage, StageId, TerrainAssets, TerrainBuild, TerrainPipeline,
};
