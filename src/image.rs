// image.rs -- Runtime-sized single-channel plane, generic over pixel type.
//
// Luma and gradient-magnitude buffers are `Image<u8>`. Signed Sobel
// components are `Image<i16>`. The interleaved color input lives in
// frame.rs because its stride is counted in bytes, not pixels.
//
// Memory layout (stride = 5, width = 4):
//
//   data index:  0  1  2  3 [4]  5  6  7  8 [9] 10 11 12 13 [14]
//   pixel:       ■  ■  ■  ■  ·   ■  ■  ■  ■  ·   ■  ■  ■  ■  ·
//   row:         |--- row 0 ---|  |--- row 1 ---|  |--- row 2 ---|
//
//   [4], [9], [14] are padding elements. Buffers produced by the pipeline
//   always have stride == width; padded planes are accepted by every
//   kernel because rows are addressed through `row()`.
//
// New concepts this file introduces:
// - RowBandMut: a mutable borrow of a contiguous run of rows. This is the
//   unit a worker writes during one stage. Two bands built from disjoint
//   RowRanges never overlap, which is what makes the threaded stages
//   lock-free.

use std::fmt;

use crate::partition::RowRange;

// ---------------------------------------------------------------------------
// Pixel Trait
// ---------------------------------------------------------------------------

/// Trait for types that can serve as pixel values in an Image.
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + fmt::Debug + 'static {}

impl Pixel for u8 {}
impl Pixel for i16 {}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D plane with runtime dimensions, generic over pixel type `T`.
pub struct Image<T: Pixel> {
    /// Pixel data in row-major order. Length = height * stride.
    data: Vec<T>,
    width: usize,
    height: usize,
    /// Row stride in elements. stride >= width.
    stride: usize,
}

// Manual Clone: a deep copy of the pixel buffer.
impl<T: Pixel> Clone for Image<T> {
    fn clone(&self) -> Self {
        Image {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }
}

impl<T: Pixel> Image<T> {
    /// Create a zero-initialized image with stride equal to width.
    pub fn new(width: usize, height: usize) -> Self {
        Self::new_with_stride(width, height, width)
    }

    /// Create a zero-initialized image with an explicit stride.
    ///
    /// # Panics
    /// Panics if `stride < width`.
    pub fn new_with_stride(width: usize, height: usize, stride: usize) -> Self {
        assert!(
            stride >= width,
            "stride ({stride}) must be >= width ({width})"
        );
        Image {
            data: vec![T::default(); height * stride],
            width,
            height,
            stride,
        }
    }

    /// Create an image from an existing pixel vector (stride = width).
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image {
            data,
            width,
            height,
            stride: width,
        }
    }

    /// Create an image from raw data with explicit stride.
    ///
    /// # Panics
    /// Panics if `data.len() != height * stride` or `stride < width`.
    pub fn from_vec_with_stride(width: usize, height: usize, stride: usize, data: Vec<T>) -> Self {
        assert!(stride >= width, "stride ({stride}) must be >= width ({width})");
        assert_eq!(
            data.len(),
            height * stride,
            "data length ({}) must equal height * stride ({})",
            data.len(),
            height * stride,
        );
        Image {
            data,
            width,
            height,
            stride,
        }
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Get the pixel value at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.stride + x]
    }

    /// Get a mutable reference to the pixel at (x, y).
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.stride + x;
        &mut self.data[idx]
    }

    /// Set the pixel at (x, y) to the given value.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    /// Borrow a single row as a slice (without stride padding).
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Mutable borrow of a single row.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Mutably borrow the rows in `rows` as a band.
    ///
    /// # Panics
    /// Panics if `rows.end > height`.
    pub fn band_mut(&mut self, rows: RowRange) -> RowBandMut<'_, T> {
        assert!(
            rows.end <= self.height,
            "row range {rows:?} exceeds image height {}",
            self.height,
        );
        let stride = self.stride;
        let data = &mut self.data[rows.start * stride..rows.end * stride];
        RowBandMut::new(data, rows, self.width, stride)
    }

    /// Set every element (padding included) to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Iterate over all pixels as `(x, y, value)` tuples, skipping padding.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| (x, y, self.data[y * self.stride + x]))
        })
    }

    /// Access the underlying data as a flat slice. Includes stride padding.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the underlying data.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Total number of elements in the buffer (including stride padding).
    pub fn buffer_len(&self) -> usize {
        self.data.len()
    }

    /// True when both images have the same width and height.
    pub fn same_shape<U: Pixel>(&self, other: &Image<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

impl<T: Pixel> PartialEq for Image<T> {
    /// Pixel-wise equality over the visible region. Padding is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other) && (0..self.height).all(|y| self.row(y) == other.row(y))
    }
}

// Debug formatting -- useful for small images in tests.
impl<T: Pixel> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{}, stride={} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
            self.stride,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(16) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 16 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Index / IndexMut -- img[(x, y)] syntax
// ---------------------------------------------------------------------------

impl<T: Pixel> std::ops::Index<(usize, usize)> for Image<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.bounds_check(x, y);
        &self.data[y * self.stride + x]
    }
}

impl<T: Pixel> std::ops::IndexMut<(usize, usize)> for Image<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.stride + x;
        &mut self.data[idx]
    }
}

// ---------------------------------------------------------------------------
// RowBandMut<'a, T> -- mutable run of rows
// ---------------------------------------------------------------------------
//
// Rows are addressed with ABSOLUTE row indices (the same `y` you would pass
// to Image::row_mut), so a kernel does not need to know where its band
// starts. Asking for a row outside the band panics.

/// Mutable view over the rows `rows.start..rows.end` of a plane.
pub struct RowBandMut<'a, T: Pixel> {
    /// Elements from the first pixel of `rows.start` to the end of the
    /// last row's stride.
    data: &'a mut [T],
    rows: RowRange,
    width: usize,
    stride: usize,
}

impl<'a, T: Pixel> RowBandMut<'a, T> {
    pub(crate) fn new(data: &'a mut [T], rows: RowRange, width: usize, stride: usize) -> Self {
        debug_assert_eq!(data.len(), rows.len() * stride);
        RowBandMut {
            data,
            rows,
            width,
            stride,
        }
    }

    /// Rows covered by this band.
    #[inline]
    pub fn rows(&self) -> RowRange {
        self.rows
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Mutable slice of absolute row `y`.
    ///
    /// # Panics
    /// Panics if `y` is not inside the band.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(
            self.rows.contains(y),
            "row {y} outside band {:?}",
            self.rows
        );
        let start = (y - self.rows.start) * self.stride;
        &mut self.data[start..start + self.width]
    }
}

impl<T: Pixel> fmt::Debug for RowBandMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowBandMut")
            .field("rows", &self.rows)
            .field("width", &self.width)
            .field("stride", &self.stride)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_u8() {
        let img: Image<u8> = Image::new(10, 5);
        assert_eq!(img.width(), 10);
        assert_eq!(img.height(), 5);
        assert_eq!(img.stride(), 10);
        for (_, _, v) in img.pixels() {
            assert_eq!(v, 0u8);
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut img: Image<u8> = Image::new(4, 3);
        img.set(0, 0, 10);
        img.set(3, 2, 255);
        img.set(1, 1, 42);
        assert_eq!(img.get(0, 0), 10);
        assert_eq!(img.get(3, 2), 255);
        assert_eq!(img.get(1, 1), 42);
        assert_eq!(img.get(2, 2), 0);
    }

    #[test]
    fn test_row_slice_skips_padding() {
        let data: Vec<u8> = (0..15).collect();
        let img = Image::from_vec_with_stride(4, 3, 5, data);
        assert_eq!(img.row(0), &[0, 1, 2, 3]);
        assert_eq!(img.row(1), &[5, 6, 7, 8]);
        assert_eq!(img.row(2), &[10, 11, 12, 13]);
    }

    #[test]
    fn test_band_addresses_absolute_rows() {
        let mut img: Image<u8> = Image::new(3, 5);
        {
            let mut band = img.band_mut(RowRange::new(2, 4));
            assert_eq!(band.rows(), RowRange::new(2, 4));
            band.row_mut(2).fill(7);
            band.row_mut(3).copy_from_slice(&[1, 2, 3]);
        }
        assert_eq!(img.row(1), &[0, 0, 0]);
        assert_eq!(img.row(2), &[7, 7, 7]);
        assert_eq!(img.row(3), &[1, 2, 3]);
        assert_eq!(img.row(4), &[0, 0, 0]);
    }

    #[test]
    fn test_band_with_stride_padding() {
        let mut img: Image<u8> = Image::new_with_stride(2, 3, 4);
        {
            let mut band = img.band_mut(RowRange::new(1, 3));
            band.row_mut(2).copy_from_slice(&[9, 8]);
        }
        assert_eq!(img.row(2), &[9, 8]);
        // Padding untouched.
        assert_eq!(img.as_slice()[2 * 4 + 2], 0);
    }

    #[test]
    fn test_empty_band() {
        let mut img: Image<u8> = Image::new(3, 3);
        let band = img.band_mut(RowRange::new(3, 3));
        assert!(band.rows().is_empty());
    }

    #[test]
    #[should_panic(expected = "outside band")]
    fn test_band_rejects_foreign_row() {
        let mut img: Image<u8> = Image::new(3, 5);
        let mut band = img.band_mut(RowRange::new(1, 2));
        band.row_mut(2);
    }

    #[test]
    #[should_panic(expected = "exceeds image height")]
    fn test_band_rejects_out_of_range() {
        let mut img: Image<u8> = Image::new(3, 5);
        img.band_mut(RowRange::new(4, 6));
    }

    #[test]
    fn test_equality_ignores_padding() {
        let a = Image::from_vec_with_stride(2, 2, 3, vec![1u8, 2, 99, 3, 4, 77]);
        let b = Image::from_vec(2, 2, vec![1u8, 2, 3, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_signed_pixels() {
        let mut img: Image<i16> = Image::new(2, 2);
        img[(1, 0)] = -1020;
        assert_eq!(img.get(1, 0), -1020);
        assert_eq!(img.get(0, 0), 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds() {
        let img: Image<u8> = Image::new(4, 4);
        img.get(4, 0);
    }

    #[test]
    #[should_panic(expected = "stride")]
    fn test_stride_less_than_width() {
        let _img: Image<u8> = Image::new_with_stride(10, 5, 8);
    }
}
