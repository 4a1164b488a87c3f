use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::demographics::domain::age_bracket::AgeBracket;
use crate::demographics::domain::gender::Gender;
use crate::shared::constants::ROLLING_WINDOW_LEN;

/// Running counters since process start or the last reset.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionStatistics {
    pub total_faces_detected: u64,
    pub current_faces: usize,
    pub age_distribution: BTreeMap<AgeBracket, u64>,
    pub gender_distribution: BTreeMap<Gender, u64>,
    /// Face counts of the most recent frames, oldest first.
    pub detections_per_minute: VecDeque<usize>,
    pub last_detection_time: Option<DateTime<Utc>>,
}

impl Default for DetectionStatistics {
    fn default() -> Self {
        Self {
            total_faces_detected: 0,
            current_faces: 0,
            age_distribution: BTreeMap::new(),
            gender_distribution: BTreeMap::new(),
            detections_per_minute: VecDeque::with_capacity(ROLLING_WINDOW_LEN),
            last_detection_time: None,
        }
    }
}

impl DetectionStatistics {
    /// Appends a per-frame count, evicting the oldest beyond the window.
    pub fn push_frame_count(&mut self, count: usize) {
        if self.detections_per_minute.len() == ROLLING_WINDOW_LEN {
            self.detections_per_minute.pop_front();
        }
        self.detections_per_minute.push_back(count);
    }

    /// Mean of the rolling window, rounded to two decimals. Zero when empty.
    pub fn average_detections(&self) -> f64 {
        let n = self.detections_per_minute.len().max(1) as f64;
        let sum: usize = self.detections_per_minute.iter().sum();
        (sum as f64 / n * 100.0).round() / 100.0
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_faces: self.total_faces_detected,
            current_faces: self.current_faces,
            avg_detections_per_minute: self.average_detections(),
            age_distribution: self.age_distribution.clone(),
            gender_distribution: self.gender_distribution.clone(),
            last_detection: self.last_detection_time,
        }
    }
}

/// Read-only view handed to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_faces: u64,
    pub current_faces: usize,
    pub avg_detections_per_minute: f64,
    pub age_distribution: BTreeMap<AgeBracket, u64>,
    pub gender_distribution: BTreeMap<Gender, u64>,
    pub last_detection: Option<DateTime<Utc>>,
}
