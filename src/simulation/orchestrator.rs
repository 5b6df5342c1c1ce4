//! Drives one kernel request from parameters to decoded fields.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::kernel::{KernelError, ParameterBuffer, TerrainKernel, WorkGrid};
use crate::terrain::{FieldError, HeightField, Rgba8Field};

/// Lifecycle of a single simulation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Idle,
    ParametersBound,
    Dispatched,
    ResultsPending,
    ResultsReady,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationState::Idle => "idle",
            SimulationState::ParametersBound => "parameters-bound",
            SimulationState::Dispatched => "dispatched",
            SimulationState::ResultsPending => "results-pending",
            SimulationState::ResultsReady => "results-ready",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SimulationState,
    },
    #[error("Tile size must be at least 1, got {0}")]
    InvalidTileSize(u32),
    #[error("Parameter buffer encodes tile size {encoded}, request uses {requested}")]
    TileSizeMismatch { encoded: u32, requested: u32 },
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("Malformed kernel output: {0}")]
    Field(#[from] FieldError),
}

/// Decoded kernel output, each field `6 * tile_size^2` texels.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub tile_size: u32,
    pub height: HeightField,
    pub color: Rgba8Field,
    pub normal: Rgba8Field,
}

struct FieldBuffers<B> {
    height: B,
    color: B,
    normal: B,
}

/// Sequences allocation, both kernel stages, and readback for one request.
///
/// Operations must be called in order: [`bind`](Self::bind),
/// [`dispatch`](Self::dispatch), [`submit`](Self::submit),
/// [`read_back`](Self::read_back). Calling one out of order fails with
/// [`SimulationError::InvalidState`] and leaves the state unchanged.
pub struct SimulationOrchestrator<K: TerrainKernel> {
    kernel: K,
    state: SimulationState,
    tile_size: u32,
    buffers: Option<FieldBuffers<K::Buffer>>,
    output: Option<SimulationOutput>,
}

impl<K: TerrainKernel> SimulationOrchestrator<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            state: SimulationState::Idle,
            tile_size: 0,
            buffers: None,
            output: None,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn into_kernel(self) -> K {
        self.kernel
    }

    fn expect_state(&self, expected: SimulationState, operation: &'static str) -> Result<(), SimulationError> {
        if self.state != expected {
            return Err(SimulationError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Allocates the three result buffers and binds the parameter buffer.
    pub fn bind(&mut self, params: &ParameterBuffer, tile_size: u32) -> Result<(), SimulationError> {
        self.expect_state(SimulationState::Idle, "bind parameters")?;
        if tile_size == 0 {
            return Err(SimulationError::InvalidTileSize(tile_size));
        }
        // Kernels index with word 0 of the parameter buffer.
        let encoded = u32::from_le_bytes([params[0], params[1], params[2], params[3]]);
        if encoded != tile_size {
            return Err(SimulationError::TileSizeMismatch {
                encoded,
                requested: tile_size,
            });
        }
        if !tile_size.is_power_of_two() {
            warn!(tile_size, "tile size is not a power of two");
        }

        let t = tile_size as u64;
        let size = 6 * t * t * 4;
        debug!(backend = self.kernel.name(), tile_size, bytes = size, "allocating result buffers");

        let buffers = FieldBuffers {
            height: self.kernel.create_field_buffer("terrasphere-height", size)?,
            color: self.kernel.create_field_buffer("terrasphere-color", size)?,
            normal: self.kernel.create_field_buffer("terrasphere-normal", size)?,
        };
        self.kernel.bind_parameters(params)?;

        self.tile_size = tile_size;
        self.buffers = Some(buffers);
        self.state = SimulationState::ParametersBound;
        Ok(())
    }

    /// Records both kernel stages over the full work grid.
    pub fn dispatch(&mut self) -> Result<(), SimulationError> {
        self.expect_state(SimulationState::ParametersBound, "dispatch")?;
        let Some(buffers) = self.buffers.as_ref() else {
            return Err(SimulationError::InvalidState {
                operation: "dispatch",
                state: self.state,
            });
        };

        let grid = WorkGrid::for_tile(self.tile_size);
        debug!(x = grid.x, y = grid.y, z = grid.z, groups = grid.group_count(), "dispatch grid");
        self.kernel.synthesize(grid, &buffers.height, &buffers.color)?;
        self.kernel.synthesize_normal(grid, &buffers.normal)?;

        self.state = SimulationState::Dispatched;
        Ok(())
    }

    /// Marks the recorded work as submitted; results are collected by
    /// [`read_back`](Self::read_back).
    pub fn submit(&mut self) -> Result<(), SimulationError> {
        self.expect_state(SimulationState::Dispatched, "submit")?;
        self.state = SimulationState::ResultsPending;
        Ok(())
    }

    /// Waits for all three result buffers and decodes them.
    pub fn read_back(&mut self) -> Result<&SimulationOutput, SimulationError> {
        self.expect_state(SimulationState::ResultsPending, "read back")?;
        let Some(buffers) = self.buffers.take() else {
            return Err(SimulationError::InvalidState {
                operation: "read back",
                state: self.state,
            });
        };

        let [height, color, normal] =
            self.kernel
                .read_back([&buffers.height, &buffers.color, &buffers.normal])?;

        let t = self.tile_size;
        let output = SimulationOutput {
            tile_size: t,
            height: HeightField::from_le_bytes(t, &height)?,
            color: Rgba8Field::from_packed_le_bytes(t, &color)?,
            normal: Rgba8Field::from_packed_le_bytes(t, &normal)?,
        };
        self.state = SimulationState::ResultsReady;
        let output = self.output.insert(output);
        Ok(&*output)
    }

    /// Takes the decoded output once results are ready.
    pub fn take_output(&mut self) -> Result<SimulationOutput, SimulationError> {
        self.expect_state(SimulationState::ResultsReady, "take output")?;
        self.output.take().ok_or(SimulationError::InvalidState {
            operation: "take output",
            state: self.state,
        })
    }

    /// Runs a complete request: bind, dispatch, submit, read back.
    pub fn run(mut self, params: &ParameterBuffer, tile_size: u32) -> Result<SimulationOutput, SimulationError> {
        let start = std::time::Instant::now();
        self.bind(params, tile_size)?;
        self.dispatch()?;
        self.submit()?;
        self.read_back()?;
        info!(
            backend = self.kernel.name(),
            tile_size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "terrain simulation complete"
        );
        self.take_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::geometry::CubeFaceId;
    use crate::kernel::{encode_parameters, AnalyticKernel};

    fn params(tile: u32) -> ParameterBuffer {
        let mut cfg = TerrainConfig::default();
        cfg.textures.tile_size = tile;
        encode_parameters(&cfg)
    }

    #[test]
    fn test_run_produces_full_fields() {
        let orch = SimulationOrchestrator::new(AnalyticKernel::constant(0.25));
        let out = orch.run(&params(4), 4).unwrap();
        assert_eq!(out.height.data().len(), 6 * 16);
        assert_eq!(out.color.data().len(), 6 * 16 * 4);
        assert_eq!(out.normal.data().len(), 6 * 16 * 4);
        assert!(out.height.data().iter().all(|&h| h == 0.25));
        assert_eq!(out.color.texel(CubeFaceId::PosY, 3, 3)[3], 255);
    }

    #[test]
    fn test_out_of_order_calls_fail() {
        let mut orch = SimulationOrchestrator::new(AnalyticKernel::constant(0.0));
        assert!(matches!(
            orch.dispatch(),
            Err(SimulationError::InvalidState {
                state: SimulationState::Idle,
                ..
            })
        ));
        assert!(matches!(orch.read_back(), Err(SimulationError::InvalidState { .. })));

        orch.bind(&params(2), 2).unwrap();
        assert_eq!(orch.state(), SimulationState::ParametersBound);
        assert!(matches!(orch.bind(&params(2), 2), Err(SimulationError::InvalidState { .. })));
        assert!(matches!(orch.submit(), Err(SimulationError::InvalidState { .. })));

        orch.dispatch().unwrap();
        assert!(matches!(orch.read_back(), Err(SimulationError::InvalidState { .. })));
        orch.submit().unwrap();
        assert_eq!(orch.state(), SimulationState::ResultsPending);
        orch.read_back().unwrap();
        assert_eq!(orch.state(), SimulationState::ResultsReady);
        assert!(matches!(orch.dispatch(), Err(SimulationError::InvalidState { .. })));
        assert!(orch.take_output().is_ok());
    }

    #[test]
    fn test_zero_tile_rejected() {
        let mut orch = SimulationOrchestrator::new(AnalyticKernel::constant(0.0));
        assert!(matches!(
            orch.bind(&params(0), 0),
            Err(SimulationError::InvalidTileSize(0))
        ));
        assert_eq!(orch.state(), SimulationState::Idle);
    }

    #[test]
    fn test_tile_size_must_match_parameters() {
        let mut orch = SimulationOrchestrator::new(AnalyticKernel::constant(0.0));
        assert!(matches!(
            orch.bind(&params(4), 8),
            Err(SimulationError::TileSizeMismatch {
                encoded: 4,
                requested: 8
            })
        ));
        assert_eq!(orch.state(), SimulationState::Idle);
        orch.bind(&params(8), 8).unwrap();
        assert_eq!(orch.state(), SimulationState::ParametersBound);
    }

    #[test]
    fn test_non_power_of_two_tile() {
        let out = SimulationOrchestrator::new(AnalyticKernel::rolling_hills())
            .run(&params(5), 5)
            .unwrap();
        assert_eq!(out.tile_size, 5);
        assert!(out.height.data().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_state_display() {
        let err = SimulationError::InvalidState {
            operation: "dispatch",
            state: SimulationState::Idle,
        };
        assert_eq!(err.to_string(), "Cannot dispatch while idle");
    }
}
