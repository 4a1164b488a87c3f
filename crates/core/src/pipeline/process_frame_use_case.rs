use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;

use crate::demographics::domain::demographic_estimator::{DemographicEstimator, EstimatorKind};
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::error::DecodeFailure;
use crate::statistics::statistics_aggregator::StatisticsAggregator;

use super::detection_result::{DetectionResult, ProcessedFrame};
use super::frame_codec::{decode_data_uri, encode_jpeg_data_uri};
use super::overlay::{draw_detection, label_for};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not decode frame: {0}")]
    Decode(#[from] DecodeFailure),
    #[error("could not encode annotated frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// Per-frame pipeline: decode → locate → crop/estimate → draw → encode → record.
///
/// Shared by every connection. Statistics are only touched once the output
/// frame exists, so a failed run leaves no trace.
pub struct ProcessFrameUseCase {
    locator: Box<dyn FaceLocator>,
    estimator: Box<dyn DemographicEstimator>,
    statistics: Arc<StatisticsAggregator>,
    jpeg_quality: u8,
}

impl ProcessFrameUseCase {
    pub fn new(
        locator: Box<dyn FaceLocator>,
        estimator: Box<dyn DemographicEstimator>,
        statistics: Arc<StatisticsAggregator>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            locator,
            estimator,
            statistics,
            jpeg_quality,
        }
    }

    pub fn estimator_kind(&self) -> EstimatorKind {
        self.estimator.kind()
    }

    /// Runs the pipeline on one encoded frame. `None` when the frame cannot
    /// be decoded or the result cannot be encoded.
    pub fn process(&self, encoded: &str) -> Option<ProcessedFrame> {
        match self.execute(encoded) {
            Ok(processed) => Some(processed),
            Err(PipelineError::Decode(e)) => {
                log::debug!("Dropping frame: {e}");
                None
            }
            Err(e) => {
                log::warn!("Dropping frame: {e}");
                None
            }
        }
    }

    pub fn execute(&self, encoded: &str) -> Result<ProcessedFrame, PipelineError> {
        let captured_at = Utc::now();

        let t0 = Instant::now();
        let mut frame = decode_data_uri(encoded)?;
        log::trace!("decode: {:.1}ms", ms_since(t0));

        let t0 = Instant::now();
        let regions = self.locator.locate(&frame);
        log::trace!("locate: {} regions in {:.1}ms", regions.len(), ms_since(t0));

        let t0 = Instant::now();
        let mut detections = Vec::with_capacity(regions.len());
        for region in regions {
            let face = match frame.crop(&region) {
                Ok(face) => face,
                Err(e) => {
                    log::debug!("Skipping region: {e}");
                    continue;
                }
            };
            detections.push(DetectionResult {
                region,
                estimate: self.estimator.estimate(&face),
                timestamp: captured_at,
            });
        }
        log::trace!("estimate: {} faces in {:.1}ms", detections.len(), ms_since(t0));

        // Overlays go on only after every face has been estimated on clean pixels.
        for det in &detections {
            draw_detection(&mut frame, &det.region, &label_for(&det.estimate));
        }

        let t0 = Instant::now();
        let processed_frame = encode_jpeg_data_uri(&frame, self.jpeg_quality)?;
        log::trace!("encode: {:.1}ms", ms_since(t0));

        self.statistics.record(&detections, captured_at);

        Ok(ProcessedFrame {
            processed_frame,
            face_count: detections.len(),
            detections,
            timestamp: captured_at,
        })
    }
}

fn ms_since(t0: Instant) -> f64 {
    t0.elapsed().as_secs_f64() * 1000.0
}
