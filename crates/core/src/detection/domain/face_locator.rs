use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Domain interface for face location.
///
/// `locate` never fails: implementations return an empty list when they
/// cannot produce regions. Every returned region lies inside the frame and
/// has a non-zero area. Implementations are stateless per call and are
/// shared across connections, hence `&self` and `Sync`.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, frame: &Frame) -> Vec<FaceRegion>;
}
