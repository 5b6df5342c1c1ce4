//! Procedurally eroded cube-sphere terrain.
//!
//! This crate builds a cube-sphere mesh, runs a two-stage terrain kernel
//! that writes height, color and normal fields over the six cubemap faces,
//! then resamples the height field onto the mesh and rebuilds its normals.
//! The result is handed to a wgpu renderer or exported for inspection.

pub mod config;
pub mod export;
pub mod geometry;
pub mod kernel;
pub mod pipeline;
pub mod render;
pub mod simulation;
pub mod terrain;

pub use config::{ColorMode, KernelBackend, TerrainConfig};
pub use geometry::{CubeFaceId, CubeSphereMesh, FaceCoord};
pub use kernel::{AnalyticKernel, TerrainKernel};
pub use pipeline::{TerrainAssets, TerrainPipeline};
pub use simulation::{SimulationOrchestrator, SimulationOutput};
