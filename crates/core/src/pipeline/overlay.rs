use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::demographics::domain::demographic_estimate::DemographicEstimate;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::bitmap_font::{draw_text_mut, text_size};

const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;
const LABEL_SCALE: u32 = 2;
/// Gap between the label's bottom edge and the box top.
const LABEL_GAP: i32 = 10;

/// `"<gender>, <age>"`, e.g. `"Female, 34"`.
pub fn label_for(estimate: &DemographicEstimate) -> String {
    format!("{}, {}", estimate.gender, estimate.age)
}

/// Draws the region outline and its label into the frame.
///
/// The label sits above the box and is shifted back inside the frame when
/// it would cross an edge.
pub fn draw_detection(frame: &mut Frame, region: &FaceRegion, label: &str) {
    let (fw, fh) = (frame.width() as i32, frame.height() as i32);
    let mut canvas = frame.as_image_mut();

    for inset in 0..BOX_THICKNESS {
        let w = region.width.saturating_sub(2 * inset);
        let h = region.height.saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut canvas, rect, OVERLAY_COLOR);
    }

    let (tw, th) = text_size(label, LABEL_SCALE);
    let (tw, th) = (tw as i32, th as i32);
    let x = (region.x as i32).min(fw - tw).max(0);
    let y = (region.y as i32 - LABEL_GAP - th).min(fh - th).max(0);
    draw_text_mut(&mut canvas, OVERLAY_COLOR, x, y, LABEL_SCALE, label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demographics::domain::gender::Gender;

    fn black(width: u32, height: u32) -> Frame {
        Frame::new(vec![0; (width * height * 3) as usize], width, height)
    }

    fn is_green(frame: &Frame, x: usize, y: usize) -> bool {
        let px = frame.as_ndarray();
        px[[y, x, 0]] == 0 && px[[y, x, 1]] == 255 && px[[y, x, 2]] == 0
    }

    fn green_rows(frame: &Frame, x0: usize, x1: usize) -> Vec<usize> {
        (0..frame.height() as usize)
            .filter(|&y| (x0..x1).any(|x| is_green(frame, x, y)))
            .collect()
    }

    #[test]
    fn test_label_text() {
        let e = DemographicEstimate::new(34, Gender::Female, 0.9);
        assert_eq!(label_for(&e), "Female, 34");
        assert_eq!(label_for(&DemographicEstimate::neutral()), "Unknown, 30");
    }

    #[test]
    fn test_box_is_two_pixels_thick() {
        let mut frame = black(100, 100);
        draw_detection(&mut frame, &FaceRegion::new(40, 50, 30, 30, 0.8), "");
        assert!(is_green(&frame, 40, 60));
        assert!(is_green(&frame, 41, 60));
        assert!(!is_green(&frame, 42, 60));
        assert!(is_green(&frame, 69, 79));
        assert!(is_green(&frame, 68, 78));
        assert!(!is_green(&frame, 55, 65));
    }

    #[test]
    fn test_label_sits_above_box() {
        let mut frame = black(200, 200);
        draw_detection(&mut frame, &FaceRegion::new(50, 100, 60, 60, 0.8), "Male, 25");
        let rows = green_rows(&frame, 0, 200);
        let label_rows: Vec<usize> = rows.into_iter().filter(|&y| y < 100).collect();
        assert!(!label_rows.is_empty());
        assert!(*label_rows.iter().max().unwrap() < 90);
        assert!(*label_rows.iter().min().unwrap() >= 100 - 10 - 14);
    }

    #[test]
    fn test_label_clamped_inside_frame_at_top() {
        let mut frame = black(120, 80);
        draw_detection(&mut frame, &FaceRegion::new(0, 0, 40, 40, 0.8), "Unknown, 30");
        // Label is pushed down to the top edge instead of vanishing.
        let label_pixels = (2..38).filter(|&x| is_green(&frame, x, 6)).count();
        assert!(label_pixels > 0);
    }

    #[test]
    fn test_tiny_region_does_not_panic() {
        let mut frame = black(10, 10);
        draw_detection(&mut frame, &FaceRegion::new(9, 9, 1, 1, 0.8), "Male, 5");
        assert!(is_green(&frame, 9, 9));
    }
}
