// frame.rs -- Interleaved B,G,R color frame.
//
// This is the pipeline's input format: 3 bytes per pixel in fixed B,G,R
// order (the byte order camera capture libraries hand out), row-major, with
// a row stride counted in BYTES that may exceed width * 3.
//
//   byte:   0  1  2  3  4  5  6  7  8 ...
//   value:  B0 G0 R0 B1 G1 R1 B2 G2 R2 ...
//
// Unlike Image<T>, the stride here cannot be expressed in pixels, because
// capture buffers are free to pad rows to any byte alignment.

use std::fmt;

/// Bytes per interleaved pixel.
pub const CHANNELS: usize = 3;

/// Owned B,G,R interleaved frame.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorFrame {
    data: Vec<u8>,
    width: usize,
    height: usize,
    /// Row stride in bytes. stride >= width * 3.
    stride: usize,
}

impl ColorFrame {
    /// Zero-filled (black) frame with tightly packed rows.
    pub fn new(width: usize, height: usize) -> Self {
        ColorFrame {
            data: vec![0; width * CHANNELS * height],
            width,
            height,
            stride: width * CHANNELS,
        }
    }

    /// Frame over tightly packed B,G,R bytes.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height * 3`.
    pub fn from_vec(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::from_vec_with_stride(width, height, width * CHANNELS, data)
    }

    /// Frame over B,G,R bytes with an explicit row stride in bytes.
    ///
    /// # Panics
    /// Panics if `stride < width * 3` or `data.len() != height * stride`.
    pub fn from_vec_with_stride(width: usize, height: usize, stride: usize, data: Vec<u8>) -> Self {
        assert!(
            stride >= width * CHANNELS,
            "stride ({stride}) must be >= width * 3 ({})",
            width * CHANNELS
        );
        assert_eq!(
            data.len(),
            height * stride,
            "data length ({}) must equal height * stride ({})",
            data.len(),
            height * stride,
        );
        ColorFrame {
            data,
            width,
            height,
            stride,
        }
    }

    /// Build a frame by evaluating `f(x, y) -> [b, g, r]` at every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> [u8; 3],
    {
        let mut frame = Self::new(width, height);
        for y in 0..height {
            for (x, px) in frame.row_mut(y).chunks_exact_mut(CHANNELS).enumerate() {
                px.copy_from_slice(&f(x, y));
            }
        }
        frame
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The `[b, g, r]` bytes of pixel (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for frame {}×{}",
            self.width,
            self.height,
        );
        let i = y * self.stride + x * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite pixel (x, y) with `[b, g, r]`.
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, bgr: [u8; 3]) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for frame {}×{}",
            self.width,
            self.height,
        );
        let i = y * self.stride + x * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&bgr);
    }

    /// The `width * 3` pixel bytes of row `y`, without padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width * CHANNELS]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &mut self.data[start..start + self.width * CHANNELS]
    }

    /// Raw bytes, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give the byte buffer back (e.g. to a capture pool).
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for ColorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ColorFrame {{ {}×{}, stride={} }}",
            self.width, self.height, self.stride
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_order() {
        let frame = ColorFrame::from_vec(2, 1, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.pixel(0, 0), [1, 2, 3]);
        assert_eq!(frame.pixel(1, 0), [4, 5, 6]);
    }

    #[test]
    fn test_stride_padding_is_skipped() {
        // 2 pixels per row, 8 bytes stride: 2 bytes of padding.
        let data = vec![
            1, 2, 3, 4, 5, 6, 0xEE, 0xEE, //
            7, 8, 9, 10, 11, 12, 0xEE, 0xEE,
        ];
        let frame = ColorFrame::from_vec_with_stride(2, 2, 8, data);
        assert_eq!(frame.row(1), &[7, 8, 9, 10, 11, 12]);
        assert_eq!(frame.pixel(1, 1), [10, 11, 12]);
    }

    #[test]
    fn test_from_fn_and_set_pixel() {
        let mut frame = ColorFrame::from_fn(3, 2, |x, y| [x as u8, y as u8, 9]);
        assert_eq!(frame.pixel(2, 1), [2, 1, 9]);
        frame.set_pixel(0, 0, [5, 6, 7]);
        assert_eq!(frame.pixel(0, 0), [5, 6, 7]);
    }

    #[test]
    #[should_panic(expected = "must be >= width * 3")]
    fn test_short_stride_panics() {
        ColorFrame::from_vec_with_stride(4, 1, 11, vec![0; 11]);
    }

    #[test]
    #[should_panic(expected = "data length")]
    fn test_wrong_length_panics() {
        ColorFrame::from_vec(2, 2, vec![0; 11]);
    }
}
