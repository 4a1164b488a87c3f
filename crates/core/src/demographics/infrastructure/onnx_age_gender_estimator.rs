//! Age and gender estimation with two ONNX classifiers, one per attribute.
//!
//! Each face crop is resized to the model's square input, reordered to the
//! configured channel order, scaled to [0, 1] and fed to both sessions. The
//! output heads are decoded by shape (see `decode_age` and `decode_gender`).

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::imageops::{self, FilterType};
use ndarray::Array4;
use thiserror::Error;

use crate::demographics::domain::age_bracket::AgeBracket;
use crate::demographics::domain::demographic_estimate::DemographicEstimate;
use crate::demographics::domain::demographic_estimator::{DemographicEstimator, EstimatorKind};
use crate::demographics::domain::gender::Gender;
use crate::shared::frame::Frame;

use super::onnx_session::open_session;

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 64;

/// Confidence reported for a regression age head, which has no score.
const REGRESSION_CONFIDENCE: f32 = 0.8;

/// Order of the colour channels a model was trained on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("face crop is empty")]
    EmptyCrop,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),
    #[error("session lock poisoned")]
    LockPoisoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    Nchw,
    Nhwc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct InputSpec {
    size: u32,
    layout: Layout,
}

impl InputSpec {
    /// Reads size and layout from a 4-D input shape. Dynamic or unreadable
    /// dimensions fall back to a 64×64 NCHW input.
    fn from_shape(shape: &[i64]) -> Self {
        let fallback = Self {
            size: DEFAULT_INPUT_SIZE,
            layout: Layout::Nchw,
        };
        if shape.len() != 4 {
            return fallback;
        }
        let (layout, side) = if shape[1] == 3 {
            (Layout::Nchw, shape[2])
        } else if shape[3] == 3 {
            (Layout::Nhwc, shape[1])
        } else {
            return fallback;
        };
        Self {
            size: if side > 0 { side as u32 } else { DEFAULT_INPUT_SIZE },
            layout,
        }
    }
}

struct ModelHead {
    session: Mutex<ort::session::Session>,
    input: InputSpec,
}

impl ModelHead {
    fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(path)?;
        let input = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    let dims: Vec<i64> = shape.iter().copied().collect();
                    Some(InputSpec::from_shape(&dims))
                } else {
                    None
                }
            })
            .unwrap_or(InputSpec {
                size: DEFAULT_INPUT_SIZE,
                layout: Layout::Nchw,
            });
        log::debug!(
            "Loaded {} ({}x{} {:?})",
            path.display(),
            input.size,
            input.size,
            input.layout
        );
        Ok(Self {
            session: Mutex::new(session),
            input,
        })
    }

    fn run(&self, face: &Frame, order: ChannelOrder) -> Result<Vec<f32>, EstimationError> {
        let tensor = preprocess(face, self.input, order);
        let input_value = ort::value::Tensor::from_array(tensor)
            .map_err(|e| EstimationError::Inference(e.to_string()))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| EstimationError::LockPoisoned)?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| EstimationError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(EstimationError::UnexpectedOutput("no outputs".into()));
        }
        let values = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| EstimationError::Inference(e.to_string()))?;
        Ok(values.iter().copied().collect())
    }
}

/// Model-backed estimator holding one session per attribute.
pub struct OnnxAgeGenderEstimator {
    age: ModelHead,
    gender: ModelHead,
    channel_order: ChannelOrder,
}

impl OnnxAgeGenderEstimator {
    pub fn new(
        age_model: &Path,
        gender_model: &Path,
        channel_order: ChannelOrder,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            age: ModelHead::load(age_model)?,
            gender: ModelHead::load(gender_model)?,
            channel_order,
        })
    }

    fn try_estimate(&self, face: &Frame) -> Result<DemographicEstimate, EstimationError> {
        if face.is_empty() {
            return Err(EstimationError::EmptyCrop);
        }
        let t0 = Instant::now();
        let (age, age_conf) = decode_age(&self.age.run(face, self.channel_order)?)?;
        let (gender, gender_conf) = decode_gender(&self.gender.run(face, self.channel_order)?)?;
        log::trace!(
            "estimate: {}x{} face in {:.1}ms",
            face.width(),
            face.height(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(DemographicEstimate::new(
            age,
            gender,
            (age_conf + gender_conf) / 2.0,
        ))
    }
}

impl DemographicEstimator for OnnxAgeGenderEstimator {
    fn estimate(&self, face: &Frame) -> DemographicEstimate {
        match self.try_estimate(face) {
            Ok(estimate) => estimate,
            Err(e) => {
                log::warn!("Demographic estimation failed, reporting neutral estimate: {e}");
                DemographicEstimate::neutral()
            }
        }
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Model
    }
}

/// Resize to the model's square input and build a float tensor in [0, 1].
fn preprocess(face: &Frame, shape: InputSpec, order: ChannelOrder) -> Array4<f32> {
    let size = shape.size as usize;
    let resized = imageops::resize(&face.as_image(), shape.size, shape.size, FilterType::Triangle);

    let mut tensor = match shape.layout {
        Layout::Nchw => Array4::<f32>::zeros((1, 3, size, size)),
        Layout::Nhwc => Array4::<f32>::zeros((1, size, size, 3)),
    };
    for (x, y, px) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let src = match order {
                ChannelOrder::Rgb => c,
                ChannelOrder::Bgr => 2 - c,
            };
            let v = px.0[src] as f32 / 255.0;
            match shape.layout {
                Layout::Nchw => tensor[[0, c, y, x]] = v,
                Layout::Nhwc => tensor[[0, y, x, c]] = v,
            }
        }
    }
    tensor
}

/// Interprets raw scores as a distribution: passed through when they
/// already sum to one, softmaxed otherwise.
fn to_probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    if scores.iter().all(|&s| (0.0..=1.0).contains(&s)) && (sum - 1.0).abs() < 1e-3 {
        return scores.to_vec();
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn argmax(probs: &[f32]) -> (usize, f32) {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best })
}

/// Age head decoding by output length:
/// 1 → regressed years, 8 → bracket classifier, more → per-year distribution.
fn decode_age(output: &[f32]) -> Result<(u32, f32), EstimationError> {
    match output.len() {
        0 => Err(EstimationError::UnexpectedOutput("empty age output".into())),
        1 => {
            let years = output[0];
            if !years.is_finite() {
                return Err(EstimationError::UnexpectedOutput(format!("age {years}")));
            }
            Ok((years.max(0.0).round() as u32, REGRESSION_CONFIDENCE))
        }
        n if n == AgeBracket::ALL.len() => {
            let (idx, p) = argmax(&to_probabilities(output));
            Ok((AgeBracket::ALL[idx].representative_age(), p))
        }
        _ => {
            let probs = to_probabilities(output);
            let expected: f32 = probs.iter().enumerate().map(|(i, p)| i as f32 * p).sum();
            let (_, p) = argmax(&probs);
            Ok((expected.round() as u32, p))
        }
    }
}

/// Gender head decoding: two scores `[male, female]`, or a single female
/// probability (logits are squashed first).
fn decode_gender(output: &[f32]) -> Result<(Gender, f32), EstimationError> {
    match output.len() {
        1 => {
            let raw = output[0];
            if !raw.is_finite() {
                return Err(EstimationError::UnexpectedOutput(format!("gender {raw}")));
            }
            let p = if (0.0..=1.0).contains(&raw) {
                raw
            } else {
                1.0 / (1.0 + (-raw).exp())
            };
            Ok(if p > 0.5 {
                (Gender::Female, p)
            } else {
                (Gender::Male, 1.0 - p)
            })
        }
        2 => {
            let (idx, p) = argmax(&to_probabilities(output));
            let gender = if idx == 0 { Gender::Male } else { Gender::Female };
            Ok((gender, p))
        }
        n => Err(EstimationError::UnexpectedOutput(format!(
            "gender output of length {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn solid_face(r: u8, g: u8, b: u8) -> Frame {
        let data = [r, g, b].repeat(10 * 12);
        Frame::new(data, 10, 12)
    }

    #[rstest]
    #[case::nchw(&[1, 3, 96, 96], 96, Layout::Nchw)]
    #[case::nhwc(&[1, 48, 48, 3], 48, Layout::Nhwc)]
    #[case::dynamic(&[-1, 3, -1, -1], 64, Layout::Nchw)]
    #[case::not_4d(&[1, 4096], 64, Layout::Nchw)]
    fn test_input_spec_from_shape(
        #[case] shape: &[i64],
        #[case] size: u32,
        #[case] layout: Layout,
    ) {
        assert_eq!(InputSpec::from_shape(shape), InputSpec { size, layout });
    }

    #[test]
    fn test_preprocess_nchw_rgb() {
        let shape = InputSpec { size: 4, layout: Layout::Nchw };
        let t = preprocess(&solid_face(255, 0, 51), shape, ChannelOrder::Rgb);
        assert_eq!(t.shape(), &[1, 3, 4, 4]);
        assert_relative_eq!(t[[0, 0, 2, 3]], 1.0);
        assert_relative_eq!(t[[0, 1, 2, 3]], 0.0);
        assert_relative_eq!(t[[0, 2, 2, 3]], 0.2);
    }

    #[test]
    fn test_preprocess_nhwc_bgr() {
        let shape = InputSpec { size: 5, layout: Layout::Nhwc };
        let t = preprocess(&solid_face(255, 0, 51), shape, ChannelOrder::Bgr);
        assert_eq!(t.shape(), &[1, 5, 5, 3]);
        assert_relative_eq!(t[[0, 1, 1, 0]], 0.2);
        assert_relative_eq!(t[[0, 1, 1, 2]], 1.0);
    }

    #[test]
    fn test_decode_age_regression() {
        let (age, conf) = decode_age(&[31.6]).unwrap();
        assert_eq!(age, 32);
        assert_relative_eq!(conf, REGRESSION_CONFIDENCE);
    }

    #[test]
    fn test_decode_age_negative_regression_clamps_to_zero() {
        assert_eq!(decode_age(&[-3.0]).unwrap().0, 0);
    }

    #[test]
    fn test_decode_age_brackets() {
        let probs = [0.05, 0.05, 0.6, 0.1, 0.05, 0.05, 0.05, 0.05];
        let (age, conf) = decode_age(&probs).unwrap();
        assert_eq!(age, 25);
        assert_relative_eq!(conf, 0.6);
    }

    #[test]
    fn test_decode_age_bracket_logits_are_softmaxed() {
        let logits = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0];
        let (age, conf) = decode_age(&logits).unwrap();
        assert_eq!(age, 75);
        assert!(conf > 0.9 && conf <= 1.0);
    }

    #[test]
    fn test_decode_age_per_year_distribution() {
        let mut probs = vec![0.0f32; 101];
        probs[40] = 0.5;
        probs[42] = 0.5;
        let (age, conf) = decode_age(&probs).unwrap();
        assert_eq!(age, 41);
        assert_relative_eq!(conf, 0.5);
    }

    #[test]
    fn test_decode_age_rejects_empty_and_nan() {
        assert!(decode_age(&[]).is_err());
        assert!(decode_age(&[f32::NAN]).is_err());
    }

    #[rstest]
    #[case::two_way_male(&[0.7, 0.3], Gender::Male, 0.7)]
    #[case::two_way_female(&[0.1, 0.9], Gender::Female, 0.9)]
    #[case::sigmoid_female(&[0.8], Gender::Female, 0.8)]
    #[case::sigmoid_male(&[0.25], Gender::Male, 0.75)]
    #[case::logit_female(&[10.0], Gender::Female, 0.99995)]
    fn test_decode_gender(#[case] output: &[f32], #[case] gender: Gender, #[case] conf: f32) {
        let (g, c) = decode_gender(output).unwrap();
        assert_eq!(g, gender);
        assert_relative_eq!(c, conf, epsilon = 1e-4);
    }

    #[test]
    fn test_decode_gender_rejects_other_lengths() {
        assert!(decode_gender(&[0.2, 0.3, 0.5]).is_err());
        assert!(decode_gender(&[]).is_err());
    }
}
