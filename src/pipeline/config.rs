// Picker configuration
// Window geometry and detection thresholds, validated before any windowing starts

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid window, step or threshold parameters
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Window length must be positive")]
    ZeroWindowLength,

    #[error("Step size must be positive")]
    ZeroStepSize,

    #[error("Step size {step} exceeds window length {window}")]
    StepExceedsWindow { step: usize, window: usize },

    #[error("Threshold {name} must lie in [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("At least one candidate per region is required")]
    ZeroCandidates,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Configuration for windowed inference and event extraction
///
/// Fields missing from a JSON document fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Model input length in samples (L)
    pub window_length: usize,

    /// Stride between consecutive window starts in samples (S)
    /// Must satisfy 0 < S <= L; S < L gives overlapping windows
    pub step_size: usize,

    /// Minimum P probability for a P pick
    pub p_threshold: f32,

    /// Minimum S probability for an S pick
    pub s_threshold: f32,

    /// Minimum detection probability for a sample to belong to an event region
    pub det_threshold: f32,

    /// Picks kept per phase and region, best first
    pub max_candidates: usize,
}

impl Default for PickerConfig {
    fn default() -> Self {
        PickerConfig {
            window_length: 10000,
            step_size: 3000,
            p_threshold: 0.1,
            s_threshold: 0.1,
            det_threshold: 0.3,
            max_candidates: 1,
        }
    }
}

impl PickerConfig {
    /// Parse a (possibly partial) JSON configuration and validate it
    pub fn from_json_bytes(data: &[u8]) -> Result<Self, ConfigError> {
        let config: PickerConfig =
            serde_json::from_slice(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_geometry(self.window_length, self.step_size)?;

        for (name, value) in [
            ("p_threshold", self.p_threshold),
            ("s_threshold", self.s_threshold),
            ("det_threshold", self.det_threshold),
        ] {
            // NaN fails the range check as well
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        if self.max_candidates == 0 {
            return Err(ConfigError::ZeroCandidates);
        }

        Ok(())
    }
}

/// Check window length and step size on their own
pub fn validate_geometry(window_length: usize, step_size: usize) -> Result<(), ConfigError> {
    if window_length == 0 {
        return Err(ConfigError::ZeroWindowLength);
    }
    if step_size == 0 {
        return Err(ConfigError::ZeroStepSize);
    }
    if step_size > window_length {
        return Err(ConfigError::StepExceedsWindow {
            step: step_size,
            window: window_length,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PickerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_length, 10000);
        assert_eq!(config.step_size, 3000);
        assert_eq!(config.det_threshold, 0.3);
    }

    #[test]
    fn test_step_exceeding_window_rejected() {
        let config = PickerConfig {
            window_length: 100,
            step_size: 101,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::StepExceedsWindow { step: 101, window: 100 })
        );
    }

    #[test]
    fn test_zero_lengths_rejected() {
        assert_eq!(validate_geometry(0, 1), Err(ConfigError::ZeroWindowLength));
        assert_eq!(validate_geometry(10, 0), Err(ConfigError::ZeroStepSize));
        assert!(validate_geometry(10, 10).is_ok());
    }

    #[test]
    fn test_threshold_range() {
        let config = PickerConfig {
            s_threshold: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { name: "s_threshold", .. })
        ));

        let config = PickerConfig {
            p_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PickerConfig {
            det_threshold: 1.0,
            p_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PickerConfig::from_json_bytes(br#"{"step_size": 2500, "det_threshold": 0.5}"#)
            .unwrap();
        assert_eq!(config.step_size, 2500);
        assert_eq!(config.det_threshold, 0.5);
        assert_eq!(config.window_length, 10000);
        assert_eq!(config.p_threshold, 0.1);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            PickerConfig::from_json_bytes(b"{not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PickerConfig::from_json_bytes(br#"{"max_candidates": 0}"#),
            Err(ConfigError::ZeroCandidates)
        ));
    }
}
