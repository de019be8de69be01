// Phase model module
// Inference backend abstraction and the STA/LTA reference backend

pub mod backend;
pub mod heuristic;

pub use backend::{InferenceError, OutputChannel, PhaseModel, SharedModel, WindowTensor, CHANNELS};
pub use heuristic::{StaLtaConfig, StaLtaModel};
