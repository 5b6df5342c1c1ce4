//! Terrain simulation requests.
//!
//! The orchestrator owns a kernel and walks one request through
//! `Idle -> ParametersBound -> Dispatched -> ResultsPending -> ResultsReady`.

mod orchestrator;

pub use orchestrator::{SimulationError, SimulationOrchestrator, SimulationOutput, SimulationState};
