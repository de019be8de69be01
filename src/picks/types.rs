// Arrival event types
// Detection regions, phase picks and the matched events built from them

use serde::{Deserialize, Serialize};

/// Seismic phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Primary (compressional) wave
    P,
    /// Secondary (shear) wave
    S,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::P => "P",
            Phase::S => "S",
        }
    }
}

/// A single phase pick on a confidence curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Sample index from the start of the waveform
    pub index: usize,

    /// Averaged model probability at `index` [0.0, 1.0]
    pub probability: f32,
}

/// Maximal run of samples whose detection probability reaches the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRegion {
    /// First sample of the region
    pub start: usize,

    /// One past the last sample of the region
    pub end: usize,

    /// Highest detection probability inside the region
    pub peak_confidence: f32,
}

impl DetectionRegion {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// One detected event with its P and S candidates
///
/// Candidate lists are ordered best first; an empty list means the phase was
/// not picked. The "nothing detected" sentinel has no region and no picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalEvent {
    /// Detection region the picks were taken from
    pub region: Option<DetectionRegion>,

    /// P candidates, best first
    pub p_picks: Vec<Pick>,

    /// S candidates, best first
    pub s_picks: Vec<Pick>,
}

impl ArrivalEvent {
    /// Sentinel reported when no region yields a usable pick
    pub fn nothing_detected() -> Self {
        ArrivalEvent {
            region: None,
            p_picks: Vec::new(),
            s_picks: Vec::new(),
        }
    }

    pub fn is_nothing_detected(&self) -> bool {
        self.region.is_none() && self.p_picks.is_empty() && self.s_picks.is_empty()
    }

    /// Primary P pick, if any
    pub fn p_pick(&self) -> Option<&Pick> {
        self.p_picks.first()
    }

    /// Primary S pick, if any
    pub fn s_pick(&self) -> Option<&Pick> {
        self.s_picks.first()
    }

    pub fn pick(&self, phase: Phase) -> Option<&Pick> {
        match phase {
            Phase::P => self.p_pick(),
            Phase::S => self.s_pick(),
        }
    }

    /// S minus P in samples when both phases are picked
    pub fn s_minus_p_samples(&self) -> Option<i64> {
        match (self.p_pick(), self.s_pick()) {
            (Some(p), Some(s)) => Some(s.index as i64 - p.index as i64),
            _ => None,
        }
    }
}

/// True if the sequence holds at least one real event
///
/// An empty sequence and a sentinel-only sequence both mean "no detections".
pub fn has_detections(events: &[ArrivalEvent]) -> bool {
    events.iter().any(|e| !e.is_nothing_detected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        let sentinel = ArrivalEvent::nothing_detected();
        assert!(sentinel.is_nothing_detected());
        assert!(sentinel.p_pick().is_none());
        assert!(sentinel.s_minus_p_samples().is_none());
        assert!(!has_detections(&[sentinel]));
        assert!(!has_detections(&[]));
    }

    #[test]
    fn test_low_confidence_event_is_not_sentinel() {
        let event = ArrivalEvent {
            region: Some(DetectionRegion { start: 0, end: 10, peak_confidence: 0.31 }),
            p_picks: vec![Pick { index: 0, probability: 0.1 }],
            s_picks: Vec::new(),
        };
        assert!(!event.is_nothing_detected());
        assert!(has_detections(&[event.clone()]));
        assert_eq!(event.pick(Phase::P).map(|p| p.index), Some(0));
        assert!(event.pick(Phase::S).is_none());
    }

    #[test]
    fn test_s_minus_p() {
        let event = ArrivalEvent {
            region: Some(DetectionRegion { start: 4000, end: 4600, peak_confidence: 0.9 }),
            p_picks: vec![Pick { index: 4200, probability: 0.8 }],
            s_picks: vec![Pick { index: 4500, probability: 0.6 }],
        };
        assert_eq!(event.s_minus_p_samples(), Some(300));
    }

    #[test]
    fn test_region_bounds() {
        let region = DetectionRegion { start: 5, end: 8, peak_confidence: 0.5 };
        assert_eq!(region.len(), 3);
        assert!(region.contains(5));
        assert!(!region.contains(8));
        assert_eq!(Phase::S.as_str(), "S");
    }
}
