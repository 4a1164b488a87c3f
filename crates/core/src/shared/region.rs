use serde::Serialize;

/// An axis-aligned face box in frame pixel coordinates.
///
/// Regions handed out by a face locator always lie inside the frame and have
/// a non-zero area (see [`FaceRegion::clamp_to`]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Locator confidence in [0, 1]. Advisory only.
    pub confidence: f32,
}

/// Wire form of a region's geometry: `{x, y, width, height}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Intersects a signed candidate box with a `frame_w × frame_h` frame.
    ///
    /// Returns `None` when nothing of the box is left inside the frame.
    pub fn clamp_to(
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        confidence: f32,
        frame_w: u32,
        frame_h: u32,
    ) -> Option<Self> {
        let x0 = x.clamp(0, frame_w as i64);
        let y0 = y.clamp(0, frame_h as i64);
        let x1 = (x + width).clamp(0, frame_w as i64);
        let y1 = (y + height).clamp(0, frame_h as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
            confidence.clamp(0.0, 1.0),
        ))
    }

    /// True when the region satisfies the locator contract for a
    /// `frame_w × frame_h` frame.
    pub fn is_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= frame_w as u64
            && self.y as u64 + self.height as u64 <= frame_h as u64
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}
