use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Stands in when no cascade could be loaded: reports no faces.
pub struct NullFaceLocator;

impl FaceLocator for NullFaceLocator {
    fn locate(&self, _frame: &Frame) -> Vec<FaceRegion> {
        Vec::new()
    }
}
