// Phase picking module
// Event extraction from confidence curves and projection to the output record

pub mod extract;
pub mod projection;
pub mod types;

pub use extract::{detection_regions, extract, extract_events, pick_candidates, ExtractionConfig};
pub use projection::{format_utc, index_to_offset_secs, index_to_time, project, PickResult, ProjectionError};
pub use types::{has_detections, ArrivalEvent, DetectionRegion, Phase, Pick};
