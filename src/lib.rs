// Phasepick - windowed P/S arrival picking for three-component seismograms
// Module declarations and public surface

pub mod inference;
pub mod model;
pub mod picks;
pub mod pipeline;
pub mod waveform;

pub use inference::{ConfidenceCurves, WindowPlan};
pub use model::{InferenceError, PhaseModel, SharedModel, StaLtaModel, WindowTensor};
pub use picks::{ArrivalEvent, ExtractionConfig, Pick, PickResult, ProjectionError};
pub use pipeline::{ConfigError, PhasePicker, PickerConfig, PickerError, PickerOutput, TraceWriter};
pub use waveform::{Component, InputShapeError, Trace, Waveform};
