//! Classical sliding-window face locator backed by a boosted Haar cascade.
//!
//! Scans an image pyramid of the frame's intensity channel, groups
//! overlapping hits and reports one region per confirmed face.

use std::path::Path;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::constants::{
    CASCADE_NOMINAL_CONFIDENCE, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR,
};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::haar_cascade::{CascadeError, HaarCascade};
use super::integral_image::IntegralImage;
use super::rect_grouping::{group_rectangles, Rect, GROUP_EPS};

/// Tunables for the multi-scale search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    /// Ratio between consecutive pyramid levels. Must be greater than 1.
    pub scale_factor: f64,
    /// Hits a group needs beyond the first to count as a face.
    pub min_neighbors: usize,
    /// Smallest window side, in frame pixels.
    pub min_size: u32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: DEFAULT_MIN_FACE_SIZE,
        }
    }
}

pub struct CascadeFaceLocator {
    cascade: HaarCascade,
    params: CascadeParams,
}

impl CascadeFaceLocator {
    pub fn new(cascade: HaarCascade, params: CascadeParams) -> Result<Self, CascadeError> {
        if params.scale_factor.is_nan() || params.scale_factor <= 1.0 {
            return Err(CascadeError::Malformed(format!(
                "scale factor must be greater than 1, got {}",
                params.scale_factor
            )));
        }
        Ok(Self { cascade, params })
    }

    /// Load a cascade XML file and build a locator around it.
    pub fn from_file(path: &Path, params: CascadeParams) -> Result<Self, CascadeError> {
        let cascade = HaarCascade::from_file(path)?;
        log::debug!(
            "Loaded cascade from {} ({} stages)",
            path.display(),
            cascade.stage_count()
        );
        Self::new(cascade, params)
    }

    /// Raw window hits across all pyramid levels, in frame coordinates.
    fn scan(&self, gray: &GrayImage) -> Vec<Rect> {
        let (img_w, img_h) = gray.dimensions();
        let (win_w, win_h) = self.cascade.window_size();
        let mut hits = Vec::new();

        let mut factor = 1.0f64;
        loop {
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            if scaled_w <= win_w || scaled_h <= win_h {
                break;
            }

            let level_w = (win_w as f64 * factor).round() as u32;
            let level_h = (win_h as f64 * factor).round() as u32;
            if level_w >= self.params.min_size && level_h >= self.params.min_size {
                let ii = if (scaled_w, scaled_h) == (img_w, img_h) {
                    IntegralImage::from_gray(gray)
                } else {
                    let scaled = imageops::resize(gray, scaled_w, scaled_h, FilterType::Triangle);
                    IntegralImage::from_gray(&scaled)
                };
                let step = if factor > 2.0 { 1 } else { 2 };

                for y in (0..scaled_h - win_h).step_by(step) {
                    for x in (0..scaled_w - win_w).step_by(step) {
                        if self.cascade.accepts(&ii, x, y) {
                            hits.push(Rect::new(
                                (x as f64 * factor).round() as i32,
                                (y as f64 * factor).round() as i32,
                                level_w as i32,
                                level_h as i32,
                            ));
                        }
                    }
                }
            }

            factor *= self.params.scale_factor;
        }

        hits
    }
}

impl FaceLocator for CascadeFaceLocator {
    fn locate(&self, frame: &Frame) -> Vec<FaceRegion> {
        if frame.is_empty() {
            return Vec::new();
        }
        let (fw, fh) = (frame.width(), frame.height());

        let t0 = Instant::now();
        let hits = self.scan(&frame.to_gray());
        let raw = hits.len();
        let grouped = group_rectangles(hits, self.params.min_neighbors, GROUP_EPS);

        let regions: Vec<FaceRegion> = grouped
            .into_iter()
            .filter_map(|r| {
                FaceRegion::clamp_to(
                    r.x as i64,
                    r.y as i64,
                    r.width as i64,
                    r.height as i64,
                    CASCADE_NOMINAL_CONFIDENCE,
                    fw,
                    fh,
                )
            })
            .collect();

        log::trace!(
            "locate: {}x{} -> {} hits, {} faces in {:.1}ms",
            fw,
            fh,
            raw,
            regions.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::tests::{accept_all_xml, edge_cascade_xml};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn locator(xml: &str, params: CascadeParams) -> CascadeFaceLocator {
        CascadeFaceLocator::new(HaarCascade::parse(xml).unwrap(), params).unwrap()
    }

    fn noise_frame(width: u32, height: u32, seed: u64) -> Frame {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..width * height * 3).map(|_| rng.gen::<u8>()).collect();
        Frame::new(data, width, height)
    }

    #[rstest]
    #[case::raw_hits(0)]
    #[case::grouped(5)]
    fn test_regions_lie_inside_frame(#[case] min_neighbors: usize) {
        let params = CascadeParams {
            min_neighbors,
            ..CascadeParams::default()
        };
        let loc = locator(&accept_all_xml(), params);
        for (seed, (w, h)) in [(1u64, (100u32, 80u32)), (2, (64, 97)), (3, (45, 45))] {
            let frame = noise_frame(w, h, seed);
            let regions = loc.locate(&frame);
            assert!(!regions.is_empty(), "{w}x{h} should produce hits");
            for r in &regions {
                assert!(r.is_within(w, h), "{r:?} escapes {w}x{h}");
                assert_eq!(r.confidence, CASCADE_NOMINAL_CONFIDENCE);
            }
        }
    }

    #[test]
    fn test_windows_below_min_size_are_skipped() {
        let params = CascadeParams {
            min_neighbors: 0,
            ..CascadeParams::default()
        };
        let loc = locator(&accept_all_xml(), params);
        for r in loc.locate(&noise_frame(120, 90, 7)) {
            assert!(r.width >= 30 && r.height >= 30, "{r:?}");
        }
    }

    #[test]
    fn test_reject_all_cascade_finds_nothing() {
        let loc = locator(&edge_cascade_xml(1.0, 1.0, 2.0), CascadeParams::default());
        assert!(loc.locate(&noise_frame(100, 100, 4)).is_empty());
    }

    #[test]
    fn test_flat_frame_is_still_scanned() {
        let loc = locator(&accept_all_xml(), CascadeParams::default());
        let frame = Frame::new(vec![90; 100 * 100 * 3], 100, 100);
        let regions = loc.locate(&frame);
        assert!(!regions.is_empty());
        assert!(regions.iter().all(|r| r.is_within(100, 100)));
    }

    #[test]
    fn test_frame_smaller_than_window_finds_nothing() {
        let loc = locator(&accept_all_xml(), CascadeParams::default());
        assert!(loc.locate(&noise_frame(20, 20, 5)).is_empty());
    }

    #[test]
    fn test_empty_frame_finds_nothing() {
        let loc = locator(&accept_all_xml(), CascadeParams::default());
        assert!(loc.locate(&Frame::new(Vec::new(), 0, 0)).is_empty());
    }

    #[rstest]
    #[case(1.0)]
    #[case(0.5)]
    #[case(f64::NAN)]
    fn test_scale_factor_must_exceed_one(#[case] scale_factor: f64) {
        let params = CascadeParams {
            scale_factor,
            ..CascadeParams::default()
        };
        let cascade = HaarCascade::parse(&accept_all_xml()).unwrap();
        assert!(CascadeFaceLocator::new(cascade, params).is_err());
    }

    #[test]
    fn test_from_file_missing_cascade() {
        let result =
            CascadeFaceLocator::from_file(Path::new("/nonexistent.xml"), CascadeParams::default());
        assert!(result.is_err());
    }
}
