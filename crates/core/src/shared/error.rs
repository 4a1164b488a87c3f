//! Error types for the three recoverable failure classes of a frame run.
//!
//! None of these ever reach the transport layer: each one is converted into
//! degraded output at the boundary that can recover from it.

use thiserror::Error;

/// Inbound frame bytes could not be turned into a [`Frame`](super::frame::Frame).
#[derive(Error, Debug)]
pub enum DecodeFailure {
    #[error("frame payload is not a base64 data URI")]
    NotDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),
    #[error("decoded image has zero area")]
    ZeroArea,
}

/// The cascade or model backing a detector could not be loaded.
#[derive(Error, Debug)]
#[error("{component} unavailable: {reason}")]
pub struct DetectorUnavailable {
    pub component: &'static str,
    pub reason: String,
}

impl DetectorUnavailable {
    pub fn new(component: &'static str, reason: impl ToString) -> Self {
        Self {
            component,
            reason: reason.to_string(),
        }
    }
}

/// A face crop came out with zero area.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("empty face region at ({x}, {y}) size {width}x{height}")]
pub struct EmptyRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
