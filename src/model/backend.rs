// Phase model backend abstraction
// Any inference engine plugs in behind `PhaseModel`: one normalized window in,
// one (detection, P, S) probability window out

use std::sync::Arc;
use thiserror::Error;

/// Number of channels in both the model input and output
pub const CHANNELS: usize = 3;

/// Output channel order of a phase model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Detection,
    P,
    S,
}

impl OutputChannel {
    pub const ALL: [OutputChannel; 3] = [OutputChannel::Detection, OutputChannel::P, OutputChannel::S];

    pub fn index(&self) -> usize {
        match self {
            OutputChannel::Detection => 0,
            OutputChannel::P => 1,
            OutputChannel::S => 2,
        }
    }
}

/// Errors raised while running the model on a window
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("Model produced a non-finite value at channel {channel}, sample {index}")]
    NonFinite { channel: usize, index: usize },

    #[error("Model backend failed: {0}")]
    Backend(String),

    #[error("Inference failed for window at offset {offset}: {source}")]
    Window {
        offset: usize,
        #[source]
        source: Box<InferenceError>,
    },
}

/// Channel-major float tensor of shape `[1, 3, window_length]`
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTensor {
    window_length: usize,
    data: Vec<f32>,
}

impl WindowTensor {
    /// All-zero tensor
    pub fn zeros(window_length: usize) -> Self {
        WindowTensor {
            window_length,
            data: vec![0.0; CHANNELS * window_length],
        }
    }

    /// Wrap flat channel-major data
    pub fn from_flat(window_length: usize, data: Vec<f32>) -> Result<Self, InferenceError> {
        if data.len() != CHANNELS * window_length {
            return Err(InferenceError::ShapeMismatch {
                expected: [1, CHANNELS, window_length],
                actual: [1, CHANNELS, data.len() / CHANNELS.max(1)],
            });
        }
        Ok(WindowTensor {
            window_length,
            data,
        })
    }

    /// Stack three equally long channels
    pub fn from_channels(channels: [Vec<f32>; 3]) -> Result<Self, InferenceError> {
        let window_length = channels[0].len();
        if channels.iter().any(|c| c.len() != window_length) {
            return Err(InferenceError::ShapeMismatch {
                expected: [1, CHANNELS, window_length],
                actual: [
                    1,
                    CHANNELS,
                    channels.iter().map(|c| c.len()).max().unwrap_or(0),
                ],
            });
        }
        let data = channels.concat();
        Ok(WindowTensor {
            window_length,
            data,
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn shape(&self) -> [usize; 3] {
        [1, CHANNELS, self.window_length]
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.window_length;
        &self.data[start..start + self.window_length]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.window_length;
        &mut self.data[start..start + self.window_length]
    }

    /// Flat channel-major view, the layout inference runtimes take
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Check that a model output matches the window it was produced from
    pub fn check_output(&self, window_length: usize) -> Result<(), InferenceError> {
        if self.window_length != window_length || self.data.len() != CHANNELS * window_length {
            return Err(InferenceError::ShapeMismatch {
                expected: [1, CHANNELS, window_length],
                actual: self.shape(),
            });
        }

        for channel in 0..CHANNELS {
            if let Some(index) = self.channel(channel).iter().position(|v| !v.is_finite()) {
                return Err(InferenceError::NonFinite { channel, index });
            }
        }

        Ok(())
    }
}

/// Tensor-in, tensor-out phase probability model
///
/// Implementations must be read-only per call: one handle is shared by every
/// request and, with the `parallel` feature, by every worker thread.
pub trait PhaseModel: Send + Sync {
    /// Map a normalized `[1, 3, L]` window (Z, N, E) to a `[1, 3, L]`
    /// probability window (detection, P, S)
    fn predict(&self, input: &WindowTensor) -> Result<WindowTensor, InferenceError>;

    /// Short backend name for logs and traces
    fn name(&self) -> &str {
        "phase-model"
    }
}

/// Long-lived model handle shared across requests
pub type SharedModel = Arc<dyn PhaseModel>;
