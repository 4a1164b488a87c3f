use std::path::{Path, PathBuf};

use crate::demographics::domain::demographic_estimator::{DemographicEstimator, EstimatorKind};
use crate::shared::constants::{AGE_MODEL_NAME, GENDER_MODEL_NAME};
use crate::shared::error::DetectorUnavailable;
use crate::shared::model_resolver::{self, ModelResolveError};

use super::onnx_age_gender_estimator::{ChannelOrder, OnnxAgeGenderEstimator};
use super::random_estimator::RandomEstimator;

/// Where the model-backed estimator finds its two model files.
#[derive(Clone, Debug)]
pub struct ModelSource {
    pub models_dir: PathBuf,
    pub age_url: Option<String>,
    pub gender_url: Option<String>,
    pub channel_order: ChannelOrder,
}

/// Builds the estimator of the requested kind.
///
/// A model-backed request whose files are absent, cannot be fetched or fail
/// to load gets the stand-in estimator instead, with a warning. Check
/// [`DemographicEstimator::kind`] on the result to see which one is serving.
pub fn create_estimator(requested: EstimatorKind, source: &ModelSource) -> Box<dyn DemographicEstimator> {
    let estimator: Box<dyn DemographicEstimator> = match requested {
        EstimatorKind::StandIn => Box::new(RandomEstimator::new()),
        EstimatorKind::Model => match load_models(source) {
            Ok(estimator) => Box::new(estimator),
            Err(e) => {
                log::warn!("{e}; falling back to the stand-in estimator (random values)");
                Box::new(RandomEstimator::new())
            }
        },
    };

    match estimator.kind() {
        EstimatorKind::Model => log::info!(
            "Using model-backed age/gender estimator from {} ({:?} input)",
            source.models_dir.display(),
            source.channel_order
        ),
        EstimatorKind::StandIn => {
            log::info!("Using stand-in age/gender estimator: results are random placeholders")
        }
    }
    estimator
}

fn load_models(source: &ModelSource) -> Result<OnnxAgeGenderEstimator, DetectorUnavailable> {
    let age = resolve(AGE_MODEL_NAME, source.age_url.as_deref(), &source.models_dir)
        .map_err(|e| DetectorUnavailable::new("age model", e))?;
    let gender = resolve(GENDER_MODEL_NAME, source.gender_url.as_deref(), &source.models_dir)
        .map_err(|e| DetectorUnavailable::new("gender model", e))?;
    OnnxAgeGenderEstimator::new(&age, &gender, source.channel_order)
        .map_err(|e| DetectorUnavailable::new("age/gender models", e))
}

fn resolve(name: &str, url: Option<&str>, dir: &Path) -> Result<PathBuf, ModelResolveError> {
    let label = name.to_string();
    let progress: model_resolver::ProgressFn = Box::new(move |done, total| {
        if total > 0 && done == total {
            log::info!("Downloaded {label} ({:.1} MB)", total as f64 / 1_048_576.0);
        }
    });
    model_resolver::resolve(name, url, dir, Some(progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(dir: &Path) -> ModelSource {
        ModelSource {
            models_dir: dir.to_path_buf(),
            age_url: None,
            gender_url: None,
            channel_order: ChannelOrder::Rgb,
        }
    }

    #[test]
    fn test_stand_in_is_used_when_requested() {
        let tmp = TempDir::new().unwrap();
        let estimator = create_estimator(EstimatorKind::StandIn, &source(tmp.path()));
        assert_eq!(estimator.kind(), EstimatorKind::StandIn);
    }

    #[test]
    fn test_missing_models_fall_back_to_stand_in() {
        let tmp = TempDir::new().unwrap();
        let estimator = create_estimator(EstimatorKind::Model, &source(tmp.path()));
        assert_eq!(estimator.kind(), EstimatorKind::StandIn);
    }

    #[test]
    fn test_fetch_failure_falls_back_to_stand_in() {
        let tmp = TempDir::new().unwrap();
        let mut src = source(tmp.path());
        src.age_url = Some("http://invalid.nonexistent.example.com/age.onnx".into());
        let estimator = create_estimator(EstimatorKind::Model, &src);
        assert_eq!(estimator.kind(), EstimatorKind::StandIn);
        assert!(!tmp.path().join(AGE_MODEL_NAME).exists());
    }

    #[test]
    fn test_load_models_reports_missing_component() {
        let tmp = TempDir::new().unwrap();
        let err = load_models(&source(tmp.path())).err().unwrap();
        assert_eq!(err.component, "age model");
    }
}
