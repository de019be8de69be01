// Result projection
// Flattens arrival events into the portable record handed to serving layers

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::picks::types::{ArrivalEvent, Pick};

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("Sample {index} at {sampling_rate} Hz falls outside the representable time range")]
    TimeOutOfRange { index: usize, sampling_rate: f64 },
}

/// Portable pick result
///
/// All per-event lists are aligned by position. Missing picks are `None`
/// (JSON `null`), never zero or a placeholder index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickResult {
    /// Identifier of the pipeline run that produced this result
    pub run_id: Uuid,

    /// P arrival sample indices
    pub p_arrival_indices: Vec<Option<usize>>,

    /// S arrival sample indices
    pub s_arrival_indices: Vec<Option<usize>>,

    /// P pick probabilities
    pub p_confidence: Vec<Option<f32>>,

    /// S pick probabilities
    pub s_confidence: Vec<Option<f32>>,

    /// Absolute P arrival times (ISO 8601 UTC)
    pub p_arrival_times_utc: Vec<Option<String>>,

    /// Absolute S arrival times (ISO 8601 UTC)
    pub s_arrival_times_utc: Vec<Option<String>>,

    /// S minus P in seconds where both phases were picked
    pub s_minus_p_secs: Vec<Option<f64>>,

    /// Number of events (sentinels excluded)
    pub total_count: usize,

    /// Time of the first waveform sample (ISO 8601 UTC)
    pub start_time_utc: String,

    pub sampling_rate_hz: f64,
}

impl PickResult {
    /// True if the result holds no events
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Elapsed seconds from the first sample to `index`
pub fn index_to_offset_secs(index: usize, sampling_rate: f64) -> f64 {
    index as f64 / sampling_rate
}

/// Absolute time of sample `index`
///
/// Fails when the offset does not fit a `DateTime<Utc>`, which happens with
/// very low sampling rates.
pub fn index_to_time(
    index: usize,
    sampling_rate: f64,
    start_time: DateTime<Utc>,
) -> Result<DateTime<Utc>, ProjectionError> {
    let out_of_range = ProjectionError::TimeOutOfRange { index, sampling_rate };
    let micros = (index_to_offset_secs(index, sampling_rate) * 1e6).round();
    if !micros.is_finite() || micros >= i64::MAX as f64 {
        return Err(out_of_range);
    }

    start_time
        .checked_add_signed(Duration::microseconds(micros as i64))
        .ok_or(out_of_range)
}

/// ISO 8601 with microsecond fraction and `Z` suffix
pub fn format_utc(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Project extracted events onto the portable result record
///
/// The "nothing detected" sentinel contributes no entries, so a run without
/// detections comes out with empty lists. An arrival time that cannot be
/// represented fails the whole projection.
pub fn project(
    run_id: Uuid,
    events: &[ArrivalEvent],
    sampling_rate: f64,
    start_time: DateTime<Utc>,
) -> Result<PickResult, ProjectionError> {
    let mut result = PickResult {
        run_id,
        p_arrival_indices: Vec::new(),
        s_arrival_indices: Vec::new(),
        p_confidence: Vec::new(),
        s_confidence: Vec::new(),
        p_arrival_times_utc: Vec::new(),
        s_arrival_times_utc: Vec::new(),
        s_minus_p_secs: Vec::new(),
        total_count: 0,
        start_time_utc: format_utc(start_time),
        sampling_rate_hz: sampling_rate,
    };

    let time_of = |pick: Option<&Pick>| -> Result<Option<String>, ProjectionError> {
        pick.map(|p| index_to_time(p.index, sampling_rate, start_time).map(format_utc))
            .transpose()
    };

    for event in events.iter().filter(|e| !e.is_nothing_detected()) {
        let p = event.p_pick();
        let s = event.s_pick();

        result.p_arrival_indices.push(p.map(|p| p.index));
        result.s_arrival_indices.push(s.map(|s| s.index));
        result.p_confidence.push(p.map(|p| p.probability));
        result.s_confidence.push(s.map(|s| s.probability));
        result.p_arrival_times_utc.push(time_of(p)?);
        result.s_arrival_times_utc.push(time_of(s)?);
        result
            .s_minus_p_secs
            .push(event.s_minus_p_samples().map(|d| d as f64 / sampling_rate));
        result.total_count += 1;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picks::types::DetectionRegion;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn event(p: Option<(usize, f32)>, s: Option<(usize, f32)>) -> ArrivalEvent {
        let to_picks = |x: Option<(usize, f32)>| {
            x.map(|(index, probability)| vec![Pick { index, probability }])
                .unwrap_or_default()
        };
        ArrivalEvent {
            region: Some(DetectionRegion { start: 0, end: 10000, peak_confidence: 0.9 }),
            p_picks: to_picks(p),
            s_picks: to_picks(s),
        }
    }

    #[test]
    fn test_arrival_times() {
        let result = project(
            Uuid::nil(),
            &[event(Some((4200, 0.8)), Some((4500, 0.6)))],
            100.0,
            start(),
        )
        .unwrap();

        assert_eq!(result.total_count, 1);
        assert_eq!(result.p_arrival_indices, vec![Some(4200)]);
        assert_eq!(result.s_confidence, vec![Some(0.6)]);
        assert_eq!(
            result.p_arrival_times_utc,
            vec![Some("2024-03-01T12:00:42.000000Z".to_string())]
        );
        assert_eq!(
            result.s_arrival_times_utc,
            vec![Some("2024-03-01T12:00:45.000000Z".to_string())]
        );
        assert_eq!(result.s_minus_p_secs, vec![Some(3.0)]);
        assert_eq!(result.start_time_utc, "2024-03-01T12:00:00.000000Z");
    }

    #[test]
    fn test_fractional_offsets() {
        let time = index_to_time(4201, 100.0, start()).unwrap();
        assert_eq!(format_utc(time), "2024-03-01T12:00:42.010000Z");
        assert!((index_to_offset_secs(150, 40.0) - 3.75).abs() < 1e-12);
    }

    #[test]
    fn test_unrepresentable_time_is_an_error() {
        assert_eq!(
            index_to_time(5000, 1e-13, start()),
            Err(ProjectionError::TimeOutOfRange { index: 5000, sampling_rate: 1e-13 })
        );
        // About 285k years: fits i64 microseconds, not a chrono date
        assert!(index_to_time(9, 1e-12, start()).is_err());
        assert!(index_to_time(0, 1e-13, start()).is_ok());

        let err = project(
            Uuid::nil(),
            &[event(Some((5000, 0.9)), None)],
            1e-13,
            start(),
        )
        .unwrap_err();
        assert!(matches!(err, ProjectionError::TimeOutOfRange { index: 5000, .. }));
    }

    #[test]
    fn test_missing_pick_stays_missing() {
        let result =
            project(Uuid::nil(), &[event(Some((10, 0.5)), None)], 100.0, start()).unwrap();
        assert_eq!(result.s_arrival_indices, vec![None]);
        assert_eq!(result.s_confidence, vec![None]);
        assert_eq!(result.s_arrival_times_utc, vec![None]);
        assert_eq!(result.s_minus_p_secs, vec![None]);

        let json: serde_json::Value =
            serde_json::from_str(&result.to_json_string().unwrap()).unwrap();
        assert!(json["s_arrival_indices"][0].is_null());
        assert_eq!(json["p_arrival_indices"][0], 10);
    }

    #[test]
    fn test_sentinel_projects_to_empty() {
        let result = project(
            Uuid::nil(),
            &[ArrivalEvent::nothing_detected()],
            100.0,
            start(),
        )
        .unwrap();
        assert!(result.is_empty());
        assert!(result.p_arrival_indices.is_empty());
        assert_eq!(result.sampling_rate_hz, 100.0);
    }
}
