// Window planning
// Splits a stream of N samples into overlapping model-sized windows

use serde::Serialize;

use crate::pipeline::config::{validate_geometry, ConfigError};

/// Ordered window start offsets and the accumulation length they cover
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowPlan {
    /// Start offset of each window, ascending
    pub offsets: Vec<usize>,

    /// Fixed window length (L)
    pub window_length: usize,

    /// Stride between windows (S)
    pub step_size: usize,

    /// Length of the accumulation buffers and confidence curves: max(N, L)
    pub buffer_length: usize,
}

impl WindowPlan {
    /// Plan windows for a stream of `total_length` samples
    ///
    /// A stream shorter than one window gets a single window at offset 0 and
    /// a full window of accumulation space. Otherwise windows start at
    /// `0, S, 2S, ...` for as long as they fit completely, which gives
    /// `(N - L) / S + 1` windows; trailing samples past the last full window
    /// are left uncovered.
    pub fn new(
        total_length: usize,
        window_length: usize,
        step_size: usize,
    ) -> Result<Self, ConfigError> {
        validate_geometry(window_length, step_size)?;

        let (count, buffer_length) = if total_length < window_length {
            (1, window_length)
        } else {
            ((total_length - window_length) / step_size + 1, total_length)
        };

        let offsets = (0..count).map(|i| i * step_size).collect();

        Ok(WindowPlan {
            offsets,
            window_length,
            step_size,
            buffer_length,
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of buffer samples covered by the window at `offset`
    pub fn covered_length(&self, offset: usize) -> usize {
        self.buffer_length
            .saturating_sub(offset)
            .min(self.window_length)
    }
}
