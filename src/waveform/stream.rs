// Three-component waveform
// Selects Z/N/E traces by channel code and validates they line up sample for sample

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InputShapeError {
    #[error("No trace found for component {0:?}")]
    MissingChannel(Component),

    #[error("Component {component:?} is ambiguous: matched channels {channels:?}")]
    AmbiguousChannel {
        component: Component,
        channels: Vec<String>,
    },

    #[error("Channel lengths differ: Z={z}, N={n}, E={e}")]
    LengthMismatch { z: usize, n: usize, e: usize },

    #[error("Sampling rates differ: {0:?}")]
    SamplingRateMismatch(Vec<f64>),

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("Waveform contains no samples")]
    Empty,
}

/// Seismometer component, in the channel order the model expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Vertical
    Z,
    /// North
    N,
    /// East
    E,
}

impl Component {
    /// All components in model channel order
    pub const ALL: [Component; 3] = [Component::Z, Component::N, Component::E];

    /// Channel index in the model input tensor
    pub fn index(&self) -> usize {
        match self {
            Component::Z => 0,
            Component::N => 1,
            Component::E => 2,
        }
    }

    /// Suffix character of SEED-style channel codes (e.g. "HHZ")
    pub fn suffix(&self) -> char {
        match self {
            Component::Z => 'Z',
            Component::N => 'N',
            Component::E => 'E',
        }
    }

    /// Whether a channel code belongs to this component
    pub fn matches(&self, channel: &str) -> bool {
        channel
            .trim()
            .chars()
            .last()
            .map(|c| c.to_ascii_uppercase() == self.suffix())
            .unwrap_or(false)
    }
}

/// A single recorded channel as handed over by a format reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Channel code, e.g. "HHZ", "BHN", "HHE"
    pub channel: String,

    /// Sampling rate in Hz
    pub sampling_rate: f64,

    /// Time of the first sample
    pub start_time: DateTime<Utc>,

    /// Raw samples
    pub data: Vec<f32>,
}

/// Validated three-component waveform
///
/// All channels share one length and one sampling rate. Construction is the
/// only place input shape is checked, so every `Waveform` is safe to window.
#[derive(Debug, Clone)]
pub struct Waveform {
    channels: [Vec<f32>; 3],
    sampling_rate: f64,
    start_time: DateTime<Utc>,
}

impl Waveform {
    /// Build a waveform from already separated components
    pub fn new(
        z: Vec<f32>,
        n: Vec<f32>,
        e: Vec<f32>,
        sampling_rate: f64,
        start_time: DateTime<Utc>,
    ) -> Result<Self, InputShapeError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(InputShapeError::InvalidSamplingRate(sampling_rate));
        }

        if z.len() != n.len() || z.len() != e.len() {
            return Err(InputShapeError::LengthMismatch {
                z: z.len(),
                n: n.len(),
                e: e.len(),
            });
        }

        if z.is_empty() {
            return Err(InputShapeError::Empty);
        }

        Ok(Waveform {
            channels: [z, n, e],
            sampling_rate,
            start_time,
        })
    }

    /// Build a waveform by picking one trace per component from a stream
    ///
    /// The start time is taken from the vertical trace.
    pub fn from_traces(traces: &[Trace]) -> Result<Self, InputShapeError> {
        let [z, n, e] = Component::ALL.map(|c| select_component(traces, c));
        let (z, n, e) = (z?, n?, e?);

        let rates = [z.sampling_rate, n.sampling_rate, e.sampling_rate];
        if rates.iter().any(|r| *r != rates[0]) {
            return Err(InputShapeError::SamplingRateMismatch(rates.to_vec()));
        }

        Waveform::new(
            z.data.clone(),
            n.data.clone(),
            e.data.clone(),
            z.sampling_rate,
            z.start_time,
        )
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Always false for a constructed waveform, kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Duration covered by the samples in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sampling_rate
    }

    pub fn channel(&self, component: Component) -> &[f32] {
        &self.channels[component.index()]
    }

    /// Real samples of `[start, start + len)` for each channel, clamped at the end
    ///
    /// Slices are shorter than `len` when the window runs past the waveform;
    /// padding is the normalizer's job.
    pub fn window(&self, start: usize, len: usize) -> [&[f32]; 3] {
        let total = self.len();
        let begin = start.min(total);
        let end = start.saturating_add(len).min(total);
        [
            &self.channels[0][begin..end],
            &self.channels[1][begin..end],
            &self.channels[2][begin..end],
        ]
    }
}

fn select_component(traces: &[Trace], component: Component) -> Result<&Trace, InputShapeError> {
    let matches: Vec<&Trace> = traces
        .iter()
        .filter(|t| component.matches(&t.channel))
        .collect();

    match matches.as_slice() {
        [] => Err(InputShapeError::MissingChannel(component)),
        [single] => Ok(*single),
        _ => Err(InputShapeError::AmbiguousChannel {
            component,
            channels: matches.iter().map(|t| t.channel.clone()).collect(),
        }),
    }
}
