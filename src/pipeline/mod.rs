// Pipeline execution and monitoring module
// Configuration, end-to-end orchestration and progress tracing

pub mod config;
pub mod runner;
pub mod trace;

pub use config::{ConfigError, PickerConfig};
pub use runner::{PhasePicker, PickerError, PickerOutput};
pub use trace::{read_trace_file, Stage, TraceBuilder, TraceEntry, TraceError, TraceWriter};
