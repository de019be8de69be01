// Windowed inference module
// Window planning, per-window normalization and overlap aggregation

pub mod aggregate;
pub mod normalize;
pub mod window;

pub use aggregate::{aggregate, AccumulationBuffer, Aggregator, ConfidenceCurves};
pub use normalize::{channel_stats, normalize_window, NORMALIZATION_EPSILON};
pub use window::WindowPlan;
