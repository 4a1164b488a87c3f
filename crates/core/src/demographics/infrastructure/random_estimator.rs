use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::demographics::domain::demographic_estimate::DemographicEstimate;
use crate::demographics::domain::demographic_estimator::{DemographicEstimator, EstimatorKind};
use crate::demographics::domain::gender::Gender;
use crate::shared::frame::Frame;

/// Placeholder estimator producing plausible random values.
///
/// Ages are uniform in [18, 70), gender is Male or Female with equal odds and
/// confidence is uniform in [0.7, 0.95). The face pixels are ignored, but a
/// zero-area face gets the neutral estimate like any other estimator.
pub struct RandomEstimator {
    rng: Mutex<StdRng>,
}

impl RandomEstimator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl DemographicEstimator for RandomEstimator {
    fn estimate(&self, face: &Frame) -> DemographicEstimate {
        if face.is_empty() {
            return DemographicEstimate::neutral();
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let age = rng.gen_range(18..70);
        let gender = if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        };
        let confidence = rng.gen_range(0.7f32..0.95);
        DemographicEstimate::new(age, gender, confidence)
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::StandIn
    }
}
