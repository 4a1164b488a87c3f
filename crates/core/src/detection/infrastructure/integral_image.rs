use image::GrayImage;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Tables are `(width + 1) × (height + 1)` with a zero first row and column,
/// so any rectangle sum is four lookups.
pub struct IntegralImage {
    stride: usize,
    width: u32,
    height: u32,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralImage {
    pub fn from_gray(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let stride = width as usize + 1;
        let len = stride * (height as usize + 1);
        let mut sum = vec![0u64; len];
        let mut sq_sum = vec![0u64; len];

        for (y, row) in img.rows().enumerate() {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for (x, px) in row.enumerate() {
                let v = px.0[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            stride,
            width,
            height,
            sum,
            sq_sum,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of pixel values in `[x, x+w) × [y, y+h)`.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sum, self.stride, x, y, w, h)
    }

    /// Sum of squared pixel values in `[x, x+w) × [y, y+h)`.
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sq_sum, self.stride, x, y, w, h)
    }

    fn lookup(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        (table[y1 * stride + x1] + table[y0 * stride + x0])
            - (table[y0 * stride + x1] + table[y1 * stride + x0])
    }
}
