// Window normalization
// Per-channel zero mean / unit variance, computed over real samples only

use crate::model::backend::{WindowTensor, CHANNELS};

/// Added to the standard deviation so flat channels do not divide by zero
pub const NORMALIZATION_EPSILON: f64 = 1e-8;

/// Normalize one window of raw samples into a model input tensor
///
/// Each channel slice may be shorter than `window_length` (the tail of a short
/// stream). Mean and standard deviation are estimated over the real samples
/// only, then the window is right-padded with exact zeros, so padding neither
/// shifts the statistics nor picks up a `-mean/std` offset.
pub fn normalize_window(channels: [&[f32]; 3], window_length: usize) -> WindowTensor {
    let mut tensor = WindowTensor::zeros(window_length);

    for (c, raw) in channels.iter().enumerate().take(CHANNELS) {
        let real = &raw[..raw.len().min(window_length)];
        let out = tensor.channel_mut(c);
        normalize_into(real, &mut out[..real.len()]);
    }

    tensor
}

/// Mean and population standard deviation of a slice
pub fn channel_stats(samples: &[f32]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    (mean, variance.sqrt())
}

fn normalize_into(real: &[f32], out: &mut [f32]) {
    let (mean, std_dev) = channel_stats(real);
    let scale = std_dev + NORMALIZATION_EPSILON;

    for (dst, &x) in out.iter_mut().zip(real) {
        *dst = ((x as f64 - mean) / scale) as f32;
    }
}
