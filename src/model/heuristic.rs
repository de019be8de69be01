// STA/LTA reference backend
// Classic short-term / long-term energy ratio trigger, dressed up as a phase model
// so the pipeline runs end to end without a neural runtime

use serde::{Deserialize, Serialize};

use crate::model::backend::{InferenceError, PhaseModel, WindowTensor};

/// LTA energies below this are treated as silence
const MIN_LTA: f64 = 1e-12;

/// Configuration for the STA/LTA backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaLtaConfig {
    /// Short-term average length in samples (0.5 s at 100 Hz)
    pub sta_samples: usize,

    /// Long-term average length in samples (5 s at 100 Hz)
    pub lta_samples: usize,

    /// STA/LTA ratio mapped to probability 1.0
    /// A ratio of 1.0 (stationary noise) maps to 0.0
    pub trigger_ratio: f64,
}

impl Default for StaLtaConfig {
    fn default() -> Self {
        StaLtaConfig {
            sta_samples: 50,
            lta_samples: 500,
            trigger_ratio: 4.0,
        }
    }
}

/// Rule-based phase model
///
/// The vertical channel drives the P output, the pooled horizontals drive the
/// S output and detection is whichever of the two is stronger. Crude next to a
/// trained picker, but deterministic and dependency free.
#[derive(Debug, Clone, Default)]
pub struct StaLtaModel {
    config: StaLtaConfig,
}

impl StaLtaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StaLtaConfig) -> Self {
        StaLtaModel { config }
    }

    pub fn config(&self) -> &StaLtaConfig {
        &self.config
    }

    /// Map an STA/LTA ratio onto [0, 1]
    fn score(&self, ratio: f64) -> f32 {
        let span = (self.config.trigger_ratio - 1.0).max(f64::EPSILON);
        ((ratio - 1.0) / span).clamp(0.0, 1.0) as f32
    }
}

impl PhaseModel for StaLtaModel {
    fn predict(&self, input: &WindowTensor) -> Result<WindowTensor, InferenceError> {
        if self.config.sta_samples == 0 || self.config.lta_samples < self.config.sta_samples {
            return Err(InferenceError::Backend(format!(
                "invalid STA/LTA lengths: sta={}, lta={}",
                self.config.sta_samples, self.config.lta_samples
            )));
        }

        let len = input.window_length();
        let vertical = energy_prefix(&[input.channel(0)]);
        let horizontal = energy_prefix(&[input.channel(1), input.channel(2)]);

        let mut output = WindowTensor::zeros(len);
        for i in 0..len {
            let p = self.score(sta_lta_ratio(&vertical, i, &self.config));
            let s = self.score(sta_lta_ratio(&horizontal, i, &self.config));
            output.channel_mut(0)[i] = p.max(s);
            output.channel_mut(1)[i] = p;
            output.channel_mut(2)[i] = s;
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "sta-lta"
    }
}

/// Prefix sums of pooled squared amplitude; `prefix[i]` covers samples `[0, i)`
fn energy_prefix(channels: &[&[f32]]) -> Vec<f64> {
    let len = channels.first().map(|c| c.len()).unwrap_or(0);
    let mut prefix = Vec::with_capacity(len + 1);
    prefix.push(0.0);

    let mut total = 0.0;
    for i in 0..len {
        for channel in channels {
            let x = channel[i] as f64;
            total += x * x;
        }
        prefix.push(total);
    }

    prefix
}

/// Trailing-window ratio ending at sample `i` (inclusive)
///
/// Near the window start both averages shrink to the samples available, so
/// the ratio starts at 1.0 instead of spiking.
fn sta_lta_ratio(prefix: &[f64], i: usize, config: &StaLtaConfig) -> f64 {
    let end = i + 1;
    let sta_start = end.saturating_sub(config.sta_samples);
    let lta_start = end.saturating_sub(config.lta_samples);

    let sta = (prefix[end] - prefix[sta_start]) / (end - sta_start) as f64;
    let lta = (prefix[end] - prefix[lta_start]) / (end - lta_start) as f64;

    if lta < MIN_LTA {
        0.0
    } else {
        sta / lta
    }
}
