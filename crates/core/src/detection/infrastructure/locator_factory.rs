use std::fmt;
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::error::DetectorUnavailable;

use super::cascade_face_locator::{CascadeFaceLocator, CascadeParams};
use super::null_face_locator::NullFaceLocator;

/// Which locator ended up in service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatorKind {
    Cascade,
    Null,
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorKind::Cascade => f.write_str("cascade"),
            LocatorKind::Null => f.write_str("none (no faces reported)"),
        }
    }
}

/// Builds the cascade locator, falling back to a locator that never finds
/// anything when the cascade cannot be loaded.
///
/// The fallback is logged once here; `locate` stays silent afterwards.
pub fn create_locator(cascade_path: &Path, params: CascadeParams) -> (Box<dyn FaceLocator>, LocatorKind) {
    match CascadeFaceLocator::from_file(cascade_path, params) {
        Ok(locator) => {
            log::info!(
                "Using cascade face locator from {} (scale_factor={}, min_neighbors={}, min_size={})",
                cascade_path.display(),
                params.scale_factor,
                params.min_neighbors,
                params.min_size
            );
            (Box::new(locator), LocatorKind::Cascade)
        }
        Err(e) => {
            let err = DetectorUnavailable::new("face cascade", e);
            log::warn!("{err} ({}); no faces will be reported", cascade_path.display());
            (Box::new(NullFaceLocator), LocatorKind::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::tests::accept_all_xml;
    use crate::shared::frame::Frame;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_cascade_falls_back_to_null() {
        let (locator, kind) = create_locator(Path::new("/nonexistent/cascade.xml"), CascadeParams::default());
        assert_eq!(kind, LocatorKind::Null);
        let frame = Frame::new(vec![0; 40 * 40 * 3], 40, 40);
        assert!(locator.locate(&frame).is_empty());
    }

    #[test]
    fn test_corrupt_cascade_falls_back_to_null() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cascade.xml");
        fs::write(&path, "<opencv_storage><cascade>").unwrap();
        let (_, kind) = create_locator(&path, CascadeParams::default());
        assert_eq!(kind, LocatorKind::Null);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(LocatorKind::Cascade.to_string(), "cascade");
        assert_eq!(LocatorKind::Null.to_string(), "none (no faces reported)");
    }

    #[test]
    fn test_valid_cascade_is_used() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cascade.xml");
        fs::write(&path, accept_all_xml()).unwrap();
        let (_, kind) = create_locator(&path, CascadeParams::default());
        assert_eq!(kind, LocatorKind::Cascade);
    }
}
