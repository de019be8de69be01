// Overlap aggregation
// Accumulates per-window model outputs and averages them into full-length curves

use serde::{Deserialize, Serialize};

use crate::model::backend::{OutputChannel, WindowTensor, CHANNELS};

/// Running per-sample sums and contributing-window counts
///
/// Sums are kept in f64 so long runs of overlapping windows do not lose
/// precision; counts are shared by all channels since every window covers
/// the same range on each of them.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer {
    sum: [Vec<f64>; CHANNELS],
    count: Vec<u32>,
}

impl AccumulationBuffer {
    pub fn new(buffer_length: usize) -> Self {
        AccumulationBuffer {
            sum: [
                vec![0.0; buffer_length],
                vec![0.0; buffer_length],
                vec![0.0; buffer_length],
            ],
            count: vec![0; buffer_length],
        }
    }

    pub fn len(&self) -> usize {
        self.count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count.is_empty()
    }

    /// Number of windows that contributed to each sample
    pub fn counts(&self) -> &[u32] {
        &self.count
    }

    /// Add one window's output starting at `offset`
    ///
    /// Only the prefix that fits inside the buffer is added; anything past the
    /// end is dropped. Returns the number of samples covered.
    pub fn add(&mut self, offset: usize, output: &WindowTensor) -> usize {
        let end = offset
            .saturating_add(output.window_length())
            .min(self.len());
        if offset >= end {
            return 0;
        }
        let covered = end - offset;

        for (c, sum) in self.sum.iter_mut().enumerate() {
            for (acc, &v) in sum[offset..end].iter_mut().zip(&output.channel(c)[..covered]) {
                *acc += v as f64;
            }
        }
        for n in &mut self.count[offset..end] {
            *n += 1;
        }

        covered
    }

    /// Average sums by counts; samples no window reached come out as exactly 0
    pub fn finalize(self) -> ConfidenceCurves {
        let average = |sum: &[f64]| -> Vec<f32> {
            sum.iter()
                .zip(&self.count)
                .map(|(&s, &n)| if n > 0 { (s / n as f64) as f32 } else { 0.0 })
                .collect()
        };

        let [detection, p, s] = OutputChannel::ALL.map(|ch| average(&self.sum[ch.index()]));
        ConfidenceCurves { detection, p, s }
    }
}

/// Full-length averaged detection, P and S probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceCurves {
    pub detection: Vec<f32>,
    pub p: Vec<f32>,
    pub s: Vec<f32>,
}

impl ConfidenceCurves {
    pub fn len(&self) -> usize {
        self.detection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detection.is_empty()
    }

    pub fn channel(&self, channel: OutputChannel) -> &[f32] {
        match channel {
            OutputChannel::Detection => &self.detection,
            OutputChannel::P => &self.p,
            OutputChannel::S => &self.s,
        }
    }
}

/// Single-pass accumulator over a window plan
///
/// Windows must be fed in ascending offset order so the floating-point
/// summation order, and therefore the result, is reproducible.
#[derive(Debug)]
pub struct Aggregator {
    buffer: AccumulationBuffer,
    window_length: usize,
    windows: usize,
}

impl Aggregator {
    pub fn new(buffer_length: usize, window_length: usize) -> Self {
        Aggregator {
            buffer: AccumulationBuffer::new(buffer_length),
            window_length,
            windows: 0,
        }
    }

    /// Accumulate the model output of the window starting at `offset`
    pub fn accumulate(&mut self, offset: usize, output: &WindowTensor) {
        debug_assert_eq!(output.window_length(), self.window_length);
        self.buffer.add(offset, output);
        self.windows += 1;
    }

    /// Number of windows accumulated so far
    pub fn windows(&self) -> usize {
        self.windows
    }

    /// Samples that no window has covered yet
    pub fn uncovered(&self) -> usize {
        self.buffer.counts().iter().filter(|n| **n == 0).count()
    }

    pub fn finish(self) -> ConfidenceCurves {
        self.buffer.finalize()
    }
}

/// Aggregate a full set of window outputs in one call
///
/// `outputs` pairs with `offsets` positionally.
pub fn aggregate(
    offsets: &[usize],
    outputs: &[WindowTensor],
    buffer_length: usize,
    window_length: usize,
) -> ConfidenceCurves {
    let mut aggregator = Aggregator::new(buffer_length, window_length);
    for (&offset, output) in offsets.iter().zip(outputs) {
        aggregator.accumulate(offset, output);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::window::WindowPlan;

    fn constant_output(window_length: usize, values: [f32; 3]) -> WindowTensor {
        WindowTensor::from_channels([
            vec![values[0]; window_length],
            vec![values[1]; window_length],
            vec![values[2]; window_length],
        ])
        .unwrap()
    }

    #[test]
    fn test_overlap_is_averaged() {
        let outputs = vec![
            constant_output(10, [0.2, 0.4, 0.0]),
            constant_output(10, [0.6, 0.0, 1.0]),
        ];
        let curves = aggregate(&[0, 5], &outputs, 15, 10);

        assert_eq!(curves.len(), 15);
        assert!((curves.detection[2] - 0.2).abs() < 1e-6);
        assert!((curves.detection[7] - 0.4).abs() < 1e-6);
        assert!((curves.detection[12] - 0.6).abs() < 1e-6);
        assert!((curves.p[7] - 0.2).abs() < 1e-6);
        assert!((curves.s[7] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_uncovered_samples_are_zero() {
        let outputs = vec![constant_output(4, [0.9, 0.9, 0.9])];
        let curves = aggregate(&[0], &outputs, 10, 4);

        for i in 4..10 {
            assert_eq!(curves.detection[i], 0.0);
            assert_eq!(curves.p[i], 0.0);
            assert_eq!(curves.s[i], 0.0);
        }
        assert!(curves.detection.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_tail_past_buffer_is_dropped() {
        let mut buffer = AccumulationBuffer::new(12);
        let covered = buffer.add(8, &constant_output(10, [1.0, 1.0, 1.0]));
        assert_eq!(covered, 4);
        assert_eq!(buffer.add(12, &constant_output(10, [1.0, 1.0, 1.0])), 0);

        let counts = buffer.counts().to_vec();
        assert_eq!(&counts[..8], &[0; 8]);
        assert_eq!(&counts[8..], &[1; 4]);
    }

    #[test]
    fn test_only_trailing_remainder_uncovered() {
        for (n, l, s) in [(13000, 10000, 3000), (1000, 100, 100), (1000, 100, 37)] {
            let plan = WindowPlan::new(n, l, s).unwrap();
            let mut aggregator = Aggregator::new(plan.buffer_length, l);
            let output = WindowTensor::zeros(l);
            for &offset in &plan.offsets {
                aggregator.accumulate(offset, &output);
            }
            // Only the tail after the last full window may stay uncovered
            let last_end = plan.offsets.last().unwrap() + l;
            assert_eq!(aggregator.uncovered(), n - last_end);
            assert_eq!(aggregator.windows(), plan.len());
        }
    }

    #[test]
    fn test_deterministic() {
        let outputs: Vec<WindowTensor> = (0..5)
            .map(|k| {
                let ch: Vec<f32> = (0..50).map(|i| ((i * 7 + k * 13) % 17) as f32 / 17.0).collect();
                WindowTensor::from_channels([ch.clone(), ch.clone(), ch]).unwrap()
            })
            .collect();
        let offsets = [0, 20, 40, 60, 80];

        let a = aggregate(&offsets, &outputs, 130, 50);
        let b = aggregate(&offsets, &outputs, 130, 50);
        assert_eq!(a, b);
    }
}
