use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::demographics::domain::demographic_estimate::DemographicEstimate;
use crate::demographics::domain::gender::Gender;
use crate::shared::region::{BoundingBox, FaceRegion};

/// One estimated face in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(into = "DetectionRecord")]
pub struct DetectionResult {
    pub region: FaceRegion,
    pub estimate: DemographicEstimate,
    pub timestamp: DateTime<Utc>,
}

/// Wire form: `{bbox, age, gender, confidence, timestamp}`.
#[derive(Serialize)]
struct DetectionRecord {
    bbox: BoundingBox,
    age: u32,
    gender: Gender,
    confidence: f32,
    timestamp: DateTime<Utc>,
}

impl From<DetectionResult> for DetectionRecord {
    fn from(r: DetectionResult) -> Self {
        Self {
            bbox: r.region.bbox(),
            age: r.estimate.age,
            gender: r.estimate.gender,
            confidence: r.estimate.confidence,
            timestamp: r.timestamp,
        }
    }
}

/// Everything sent back to the client for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessedFrame {
    /// Annotated frame as a JPEG data URI.
    pub processed_frame: String,
    pub detections: Vec<DetectionResult>,
    pub face_count: usize,
    pub timestamp: DateTime<Utc>,
}
