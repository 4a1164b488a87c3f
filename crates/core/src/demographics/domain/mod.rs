pub mod age_bracket;
pub mod demographic_estimate;
pub mod demographic_estimator;
pub mod gender;
