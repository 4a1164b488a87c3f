use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::pipeline::detection_result::DetectionResult;

use super::detection_statistics::{DetectionStatistics, StatisticsSnapshot};

/// Sole owner of the process-wide detection counters.
///
/// `record`, `snapshot` and `reset` are serialized on one lock and never
/// fail. A panic while the lock was held does not disable statistics; the
/// counters are used as left.
#[derive(Default)]
pub struct StatisticsAggregator {
    stats: Mutex<DetectionStatistics>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one processed frame into the counters. Zero-face frames still
    /// update the current count, the rolling window and the timestamp.
    pub fn record(&self, results: &[DetectionResult], at: DateTime<Utc>) {
        let mut stats = self.lock();
        let count = results.len();
        stats.current_faces = count;
        stats.total_faces_detected += count as u64;
        for r in results {
            *stats
                .age_distribution
                .entry(r.estimate.age_bracket)
                .or_insert(0) += 1;
            *stats
                .gender_distribution
                .entry(r.estimate.gender)
                .or_insert(0) += 1;
        }
        stats.push_frame_count(count);
        stats.last_detection_time = Some(at);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.lock().snapshot()
    }

    /// Replaces every counter with a fresh value.
    pub fn reset(&self) {
        *self.lock() = DetectionStatistics::default();
    }

    /// Copy of the full counters, including the rolling window.
    pub fn statistics(&self) -> DetectionStatistics {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, DetectionStatistics> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographics::domain::age_bracket::AgeBracket;
    use crate::demographics::domain::demographic_estimate::DemographicEstimate;
    use crate::demographics::domain::gender::Gender;
    use crate::shared::constants::ROLLING_WINDOW_LEN;
    use crate::shared::region::FaceRegion;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::thread;

    fn result(age: u32, gender: Gender) -> DetectionResult {
        DetectionResult {
            region: FaceRegion::new(0, 0, 40, 40, 0.8),
            estimate: DemographicEstimate::new(age, gender, 0.9),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_total_is_sum_of_current_counts() {
        let agg = StatisticsAggregator::new();
        let frames = [
            vec![result(25, Gender::Male)],
            vec![],
            vec![result(12, Gender::Female), result(70, Gender::Male)],
            vec![result(45, Gender::Unknown)],
        ];
        let mut expected_total = 0u64;
        for frame in &frames {
            agg.record(frame, Utc::now());
            let s = agg.statistics();
            expected_total += s.current_faces as u64;
            assert_eq!(s.total_faces_detected, expected_total);
        }
        assert_eq!(expected_total, 4);
    }

    #[test]
    fn test_histograms_follow_estimates() {
        let agg = StatisticsAggregator::new();
        agg.record(
            &[
                result(25, Gender::Male),
                result(27, Gender::Female),
                result(0, Gender::Female),
                result(70, Gender::Unknown),
            ],
            Utc::now(),
        );
        let s = agg.statistics();
        assert_eq!(s.age_distribution[&AgeBracket::Twenties], 2);
        assert_eq!(s.age_distribution[&AgeBracket::Child], 1);
        assert_eq!(s.age_distribution[&AgeBracket::SeventyPlus], 1);
        assert_eq!(s.gender_distribution[&Gender::Female], 2);
        assert_eq!(s.gender_distribution[&Gender::Male], 1);
        assert_eq!(s.gender_distribution[&Gender::Unknown], 1);
    }

    #[test]
    fn test_zero_face_frame() {
        let agg = StatisticsAggregator::new();
        agg.record(&[result(30, Gender::Male), result(31, Gender::Male)], Utc::now());
        let at = Utc::now();
        agg.record(&[], at);

        let s = agg.statistics();
        assert_eq!(s.current_faces, 0);
        assert_eq!(s.total_faces_detected, 2);
        assert_eq!(s.detections_per_minute.back(), Some(&0));
        assert_eq!(s.detections_per_minute.len(), 2);
        assert_eq!(s.last_detection_time, Some(at));
    }

    #[test]
    fn test_rolling_window_keeps_last_sixty() {
        let agg = StatisticsAggregator::new();
        let counts: Vec<usize> = (0..100).map(|i| i % 4).collect();
        for &c in &counts {
            let frame: Vec<DetectionResult> = (0..c).map(|_| result(20, Gender::Male)).collect();
            agg.record(&frame, Utc::now());
        }
        let window: Vec<usize> = agg.statistics().detections_per_minute.into_iter().collect();
        assert_eq!(window, counts[counts.len() - ROLLING_WINDOW_LEN..].to_vec());
    }

    #[test]
    fn test_average_in_snapshot() {
        let agg = StatisticsAggregator::new();
        for c in [2usize, 4, 6] {
            let frame: Vec<DetectionResult> = (0..c).map(|_| result(20, Gender::Male)).collect();
            agg.record(&frame, Utc::now());
        }
        assert_relative_eq!(agg.snapshot().avg_detections_per_minute, 4.0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let agg = StatisticsAggregator::new();
        agg.record(&[result(50, Gender::Female)], Utc::now());

        agg.reset();
        let once = agg.statistics();
        agg.reset();
        let twice = agg.statistics();

        assert_eq!(once, DetectionStatistics::default());
        assert_eq!(once, twice);
        let snap = agg.snapshot();
        assert_eq!(snap.total_faces, 0);
        assert_relative_eq!(snap.avg_detections_per_minute, 0.0);
        assert!(snap.last_detection.is_none());
    }

    #[test]
    fn test_concurrent_records_are_serialized() {
        let agg = Arc::new(StatisticsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for _ in 0..50 {
                        agg.record(&[result(33, Gender::Male), result(8, Gender::Female)], Utc::now());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let s = agg.statistics();
        assert_eq!(s.total_faces_detected, 800);
        assert_eq!(s.gender_distribution[&Gender::Male], 400);
        assert_eq!(s.age_distribution[&AgeBracket::Child], 400);
        assert_eq!(s.detections_per_minute.len(), ROLLING_WINDOW_LEN);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let agg = Arc::new(StatisticsAggregator::new());
        let poisoner = Arc::clone(&agg);
        let _ = thread::spawn(move || {
            let _guard = poisoner.stats.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        agg.record(&[result(20, Gender::Male)], Utc::now());
        assert_eq!(agg.snapshot().total_faces, 1);
    }
}
