use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
use ndarray::ArrayView3;

use crate::shared::error::EmptyRegion;
use crate::shared::region::FaceRegion;

/// A decoded frame: contiguous RGB bytes in row-major order.
///
/// Owned by exactly one pipeline run; overlays are drawn into it in place
/// before it is re-encoded.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    pub fn as_image(&self) -> ImageBuffer<Rgb<u8>, &[u8]> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
            .expect("Frame data length must match dimensions")
    }

    /// Mutable `image` view over the pixel buffer, for drawing in place.
    pub fn as_image_mut(&mut self) -> ImageBuffer<Rgb<u8>, &mut [u8]> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_mut_slice())
            .expect("Frame data length must match dimensions")
    }

    pub fn into_rgb_image(self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel intensity with ITU-R BT.601 weights, the convention
    /// cascade classifiers are trained with.
    pub fn to_gray(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width, self.height);
        for (dst, px) in gray.iter_mut().zip(self.data.chunks_exact(CHANNELS)) {
            let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            *dst = luma.round().min(255.0) as u8;
        }
        gray
    }

    /// Copies the region out at native resolution.
    ///
    /// The region is intersected with the frame first; an empty intersection
    /// is an [`EmptyRegion`] error.
    pub fn crop(&self, region: &FaceRegion) -> Result<Frame, EmptyRegion> {
        let x0 = region.x.min(self.width);
        let y0 = region.y.min(self.height);
        let x1 = region.x.saturating_add(region.width).min(self.width);
        let y1 = region.y.saturating_add(region.height).min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return Err(EmptyRegion {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
            });
        }

        let w = (x1 - x0) as usize;
        let h = (y1 - y0) as usize;
        let stride = self.width as usize * CHANNELS;
        let mut data = Vec::with_capacity(w * h * CHANNELS);
        for row in y0 as usize..y1 as usize {
            let start = row * stride + x0 as usize * CHANNELS;
            data.extend_from_slice(&self.data[start..start + w * CHANNELS]);
        }
        Ok(Frame::new(data, w as u32, h as u32))
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Frame::new(img.into_raw(), width, height)
    }
}
