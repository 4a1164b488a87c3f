//! Data-URI transport encoding for frames.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::shared::error::DecodeFailure;
use crate::shared::frame::Frame;

const JPEG_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Decodes `data:image/<fmt>;base64,<payload>` into an RGB frame.
///
/// The declared format is not trusted; the image type is sniffed from the
/// payload bytes.
pub fn decode_data_uri(uri: &str) -> Result<Frame, DecodeFailure> {
    let rest = uri.trim().strip_prefix("data:").ok_or(DecodeFailure::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DecodeFailure::NotDataUri)?;
    if !header.ends_with(";base64") {
        return Err(DecodeFailure::NotDataUri);
    }

    let bytes = BASE64.decode(payload.trim())?;
    let img = image::load_from_memory(&bytes)?.to_rgb8();
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeFailure::ZeroArea);
    }
    Ok(Frame::from(img))
}

/// Encodes a frame as a baseline JPEG data URI. `quality` is 1–100.
pub fn encode_jpeg_data_uri(frame: &Frame, quality: u8) -> Result<String, image::ImageError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).write_image(
        frame.data(),
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(format!("{JPEG_URI_PREFIX}{}", BASE64.encode(buffer)))
}
