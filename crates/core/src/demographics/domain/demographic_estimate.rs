use super::age_bracket::AgeBracket;
use super::gender::Gender;

const NEUTRAL_AGE: u32 = 30;
const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Age and gender guess for one face. `age_bracket` always agrees with `age`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemographicEstimate {
    pub age: u32,
    pub gender: Gender,
    pub confidence: f32,
    pub age_bracket: AgeBracket,
}

impl DemographicEstimate {
    /// Builds an estimate, deriving the bracket from `age` and bounding
    /// `confidence` to [0, 1].
    pub fn new(age: u32, gender: Gender, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            age,
            gender,
            confidence,
            age_bracket: AgeBracket::from_age(age),
        }
    }

    /// Reported whenever estimation fails.
    pub fn neutral() -> Self {
        Self::new(NEUTRAL_AGE, Gender::Unknown, NEUTRAL_CONFIDENCE)
    }
}
