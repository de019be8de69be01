// Event extraction
// Turns detection/P/S confidence curves into matched arrival events
//
// Algorithm:
// 1. Threshold the detection curve into maximal contiguous regions
// 2. Inside each region, take the P and S curve maxima (earliest on ties)
// 3. Keep a phase only if its maximum reaches that phase's threshold
// 4. Drop regions with neither phase; report a sentinel if nothing is left

use serde::{Deserialize, Serialize};

use crate::inference::aggregate::ConfidenceCurves;
use crate::picks::types::{ArrivalEvent, DetectionRegion, Pick};
use crate::pipeline::config::PickerConfig;

/// Thresholds and candidate policy for event extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum P probability (inclusive)
    pub p_threshold: f32,

    /// Minimum S probability (inclusive)
    pub s_threshold: f32,

    /// Minimum detection probability (inclusive)
    pub det_threshold: f32,

    /// Candidates kept per phase and region; the first is always the region maximum
    pub max_candidates: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig::from(&PickerConfig::default())
    }
}

impl From<&PickerConfig> for ExtractionConfig {
    fn from(config: &PickerConfig) -> Self {
        ExtractionConfig {
            p_threshold: config.p_threshold,
            s_threshold: config.s_threshold,
            det_threshold: config.det_threshold,
            max_candidates: config.max_candidates,
        }
    }
}

/// Extract events from aggregated confidence curves
pub fn extract_events(curves: &ConfidenceCurves, config: &ExtractionConfig) -> Vec<ArrivalEvent> {
    extract(&curves.detection, &curves.p, &curves.s, config)
}

/// Extract events from three parallel curves
///
/// Events come back in ascending region order. When no region carries a
/// valid pick the result is a single `ArrivalEvent::nothing_detected()`.
pub fn extract(
    detection: &[f32],
    p_curve: &[f32],
    s_curve: &[f32],
    config: &ExtractionConfig,
) -> Vec<ArrivalEvent> {
    let len = detection.len().min(p_curve.len()).min(s_curve.len());
    let max_candidates = config.max_candidates.max(1);

    let mut events = Vec::new();
    for region in detection_regions(&detection[..len], config.det_threshold) {
        let p_picks = pick_candidates(p_curve, &region, config.p_threshold, max_candidates);
        let s_picks = pick_candidates(s_curve, &region, config.s_threshold, max_candidates);

        if p_picks.is_empty() && s_picks.is_empty() {
            log::debug!(
                "Region [{}, {}) has no P or S above threshold",
                region.start,
                region.end
            );
            continue;
        }

        events.push(ArrivalEvent {
            region: Some(region),
            p_picks,
            s_picks,
        });
    }

    if events.is_empty() {
        events.push(ArrivalEvent::nothing_detected());
    }

    events
}

/// Maximal runs where `detection >= threshold`
pub fn detection_regions(detection: &[f32], threshold: f32) -> Vec<DetectionRegion> {
    let mut regions = Vec::new();
    let mut current: Option<DetectionRegion> = None;

    for (i, &value) in detection.iter().enumerate() {
        if value >= threshold {
            match current.as_mut() {
                Some(region) => {
                    region.end = i + 1;
                    region.peak_confidence = region.peak_confidence.max(value);
                }
                None => {
                    current = Some(DetectionRegion {
                        start: i,
                        end: i + 1,
                        peak_confidence: value,
                    });
                }
            }
        } else if let Some(region) = current.take() {
            regions.push(region);
        }
    }

    if let Some(region) = current {
        regions.push(region);
    }

    regions
}

/// Phase candidates for one region, best first
///
/// The first candidate is the region maximum (earliest index on ties) and is
/// only reported if it reaches `threshold`. Further candidates are the other
/// local peaks in the region that reach the threshold, by descending
/// probability then ascending index.
pub fn pick_candidates(
    curve: &[f32],
    region: &DetectionRegion,
    threshold: f32,
    max_candidates: usize,
) -> Vec<Pick> {
    let end = region.end.min(curve.len());
    if region.start >= end || max_candidates == 0 {
        return Vec::new();
    }

    let best = match region_maximum(curve, region.start, end) {
        Some(best) if best.probability >= threshold => best,
        _ => return Vec::new(),
    };

    let mut picks = vec![best];
    if max_candidates > 1 {
        let mut others: Vec<Pick> = local_peaks(curve, region.start, end)
            .into_iter()
            .filter(|p| p.index != best.index && p.probability >= threshold)
            .collect();
        others.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then(a.index.cmp(&b.index))
        });
        picks.extend(others.into_iter().take(max_candidates - 1));
    }

    picks
}

/// Earliest index of the maximum in `curve[start..end]`
fn region_maximum(curve: &[f32], start: usize, end: usize) -> Option<Pick> {
    let mut best: Option<Pick> = None;
    for (offset, &value) in curve[start..end].iter().enumerate() {
        let better = match best {
            Some(b) => value > b.probability,
            None => true,
        };
        if better {
            best = Some(Pick {
                index: start + offset,
                probability: value,
            });
        }
    }
    best
}

/// Local maxima in `curve[start..end]`; plateaus report their first sample
///
/// Region edges count as lower neighbours.
fn local_peaks(curve: &[f32], start: usize, end: usize) -> Vec<Pick> {
    let mut peaks = Vec::new();
    let mut i = start;

    while i < end {
        let value = curve[i];
        let rising = i == start || value > curve[i - 1];

        let mut plateau_end = i;
        while plateau_end + 1 < end && curve[plateau_end + 1] == value {
            plateau_end += 1;
        }
        let falling = plateau_end + 1 == end || curve[plateau_end + 1] < value;

        if rising && falling {
            peaks.push(Pick {
                index: i,
                probability: value,
            });
        }

        i = plateau_end + 1;
    }

    peaks
}
