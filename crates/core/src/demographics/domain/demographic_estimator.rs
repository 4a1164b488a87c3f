use std::fmt;

use crate::shared::frame::Frame;

use super::demographic_estimate::DemographicEstimate;

/// Which estimator variant is serving requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimatorKind {
    Model,
    StandIn,
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Model => f.write_str("model"),
            EstimatorKind::StandIn => f.write_str("stand-in"),
        }
    }
}

/// Domain interface for age/gender estimation on a cropped face.
///
/// `estimate` never fails; implementations report
/// [`DemographicEstimate::neutral`] when they cannot produce a guess.
pub trait DemographicEstimator: Send + Sync {
    fn estimate(&self, face: &Frame) -> DemographicEstimate;

    fn kind(&self) -> EstimatorKind;
}
