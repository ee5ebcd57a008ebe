// gradient.rs -- Sobel gradient magnitude over a luma plane.
//
// 3×3 Sobel operators, applied directly (no separable convolution pass):
//
//   Gx:  -1  0 +1        Gy:  -1 -2 -1
//        -2  0 +2              0  0  0
//        -1  0 +1             +1 +2 +1
//
//   out[i][j] = min(|Gx| + |Gy|, 255)
//
// Only interior pixels are computed. Row i needs rows i-1 and i+1, and
// column j needs columns j-1 and j+1, so rows 0 and height-1 and columns 0
// and width-1 are never written:
//
//   ┌─────────────┐
//   │ x x x x x x │   x = border, left as-is
//   │ x . . . . x │   . = written
//   │ x . . . . x │
//   │ x x x x x x │
//   └─────────────┘
//
// A worker's row range is narrowed to the interior here, not by the
// partitioner, so a range that touches row 0 or the last row is legal and
// simply writes fewer rows.

use crate::image::{Image, RowBandMut};
use crate::kernels::{self, scalar, KernelPath};
use crate::partition::RowRange;

/// Gradient magnitude for the interior rows of `rows`, default kernel path.
///
/// # Panics
/// Panics if the planes differ in shape or `rows` extends past the last row.
pub fn sobel_magnitude(luma: &Image<u8>, out: &mut Image<u8>, rows: RowRange) {
    sobel_magnitude_with(KernelPath::default(), luma, out, rows);
}

/// Same as [`sobel_magnitude`] with an explicit kernel path.
pub fn sobel_magnitude_with(path: KernelPath, luma: &Image<u8>, out: &mut Image<u8>, rows: RowRange) {
    assert!(
        luma.same_shape(out),
        "magnitude plane {}×{} does not match luma plane {}×{}",
        out.width(),
        out.height(),
        luma.width(),
        luma.height(),
    );
    let mut band = out.band_mut(rows);
    sobel_magnitude_band(path, luma, &mut band);
}

/// Gradient magnitude for the interior rows covered by `band`.
///
/// # Panics
/// Panics if the band width differs from the luma width or the band extends
/// below the luma plane.
pub fn sobel_magnitude_band(path: KernelPath, luma: &Image<u8>, band: &mut RowBandMut<'_, u8>) {
    let rows = band.rows();
    assert_eq!(
        band.width(),
        luma.width(),
        "magnitude band width does not match luma plane"
    );
    assert!(
        rows.end <= luma.height(),
        "rows {rows:?} exceed luma height {}",
        luma.height()
    );

    for i in rows.interior(luma.height()) {
        kernels::sobel_row(path, luma.row(i - 1), luma.row(i), luma.row(i + 1), band.row_mut(i));
    }
}

/// Gradient magnitude of a whole plane. Border pixels are 0.
pub fn magnitude(luma: &Image<u8>) -> Image<u8> {
    let mut out = Image::new(luma.width(), luma.height());
    sobel_magnitude(luma, &mut out, RowRange::full(luma.height()));
    out
}

/// Signed horizontal component Gx. Positive when intensity increases to the
/// right. Border pixels are 0.
pub fn sobel_x(luma: &Image<u8>) -> Image<i16> {
    let mut out = Image::new(luma.width(), luma.height());
    for i in RowRange::full(luma.height()).interior(luma.height()) {
        scalar::sobel_x_row(luma.row(i - 1), luma.row(i), luma.row(i + 1), out.row_mut(i));
    }
    out
}

/// Signed vertical component Gy. Positive when intensity increases downward.
pub fn sobel_y(luma: &Image<u8>) -> Image<i16> {
    let mut out = Image::new(luma.width(), luma.height());
    for i in RowRange::full(luma.height()).interior(luma.height()) {
        scalar::sobel_y_row(luma.row(i - 1), luma.row(i + 1), out.row_mut(i));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_paths() -> [KernelPath; 2] {
        [KernelPath::Scalar, KernelPath::Batched]
    }

    #[test]
    fn test_constant_image_zero_magnitude() {
        let luma = Image::from_vec(40, 6, vec![128u8; 240]);
        for path in both_paths() {
            let mut out = Image::new(40, 6);
            sobel_magnitude_with(path, &luma, &mut out, RowRange::full(6));
            assert!(out.as_slice().iter().all(|&v| v == 0), "{path:?}");
        }
    }

    #[test]
    fn test_bright_column_ridge() {
        // One bright column at x = 3 on a dark background. Gx is ±800 on
        // both neighbours and 0 on the column itself.
        let (w, h) = (7, 5);
        let mut luma = Image::new(w, h);
        for y in 0..h {
            luma.set(3, y, 200);
        }
        let out = magnitude(&luma);
        for y in 1..h - 1 {
            assert_eq!(out.row(y), &[0, 0, 255, 0, 255, 0, 0], "row {y}");
        }
    }

    #[test]
    fn test_step_edge_is_two_pixels_wide() {
        // Left half 0, right half 40: Gx = 4 * 40 = 160 either side of the step.
        let (w, h) = (20, 4);
        let mut luma = Image::new(w, h);
        for y in 0..h {
            for x in 10..w {
                luma.set(x, y, 40);
            }
        }
        for path in both_paths() {
            let mut out = Image::new(w, h);
            sobel_magnitude_with(path, &luma, &mut out, RowRange::full(h));
            for x in 1..w - 1 {
                let expected = if x == 9 || x == 10 { 160 } else { 0 };
                assert_eq!(out.get(x, 1), expected, "{path:?} x={x}");
                assert_eq!(out.get(x, 2), expected, "{path:?} x={x}");
            }
        }
    }

    #[test]
    fn test_border_is_never_written() {
        let (w, h) = (33, 6);
        let data: Vec<u8> = (0..w * h).map(|i| (i * 97 % 256) as u8).collect();
        let luma = Image::from_vec(w, h, data);
        for path in both_paths() {
            let mut out = Image::from_vec(w, h, vec![77u8; w * h]);
            sobel_magnitude_with(path, &luma, &mut out, RowRange::full(h));
            assert!(out.row(0).iter().all(|&v| v == 77));
            assert!(out.row(h - 1).iter().all(|&v| v == 77));
            for y in 0..h {
                assert_eq!(out.get(0, y), 77);
                assert_eq!(out.get(w - 1, y), 77);
            }
        }
    }

    #[test]
    fn test_range_touching_only_border_writes_nothing() {
        let luma = Image::from_vec(5, 5, vec![255u8; 25]);
        let mut out = Image::from_vec(5, 5, vec![1u8; 25]);
        sobel_magnitude(&luma, &mut out, RowRange::new(4, 5));
        sobel_magnitude(&luma, &mut out, RowRange::new(0, 1));
        assert!(out.as_slice().iter().all(|&v| v == 1));
    }

    #[test]
    fn test_tiny_planes() {
        for (w, h) in [(0, 0), (1, 1), (2, 2), (3, 2), (2, 3)] {
            let luma = Image::from_vec(w, h, vec![200u8; w * h]);
            let out = magnitude(&luma);
            assert!(out.as_slice().iter().all(|&v| v == 0), "{w}×{h}");
        }
    }

    #[test]
    fn test_signed_components() {
        // Intensity increases to the right and downward.
        let (w, h) = (5, 5);
        let mut luma = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                luma.set(x, y, (10 * x + 20 * y) as u8);
            }
        }
        let gx = sobel_x(&luma);
        let gy = sobel_y(&luma);
        // Gx = 4 * (2 * 10) = 80, Gy = 4 * (2 * 20) = 160.
        assert_eq!(gx.get(2, 2), 80);
        assert_eq!(gy.get(2, 2), 160);
        assert_eq!(gx.get(0, 2), 0);
        assert_eq!(gy.get(2, 0), 0);

        // Mirrored image flips the sign of Gx.
        let mut mirrored = Image::new(w, h);
        for (x, y, v) in luma.pixels() {
            mirrored.set(w - 1 - x, y, v);
        }
        assert_eq!(sobel_x(&mirrored).get(2, 2), -80);
    }

    #[test]
    fn test_magnitude_matches_components() {
        let (w, h) = (9, 7);
        let data: Vec<u8> = (0..w * h).map(|i| (i * 61 % 256) as u8).collect();
        let luma = Image::from_vec(w, h, data);
        let gx = sobel_x(&luma);
        let gy = sobel_y(&luma);
        let mag = magnitude(&luma);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let sum = gx.get(x, y).unsigned_abs() as u32 + gy.get(x, y).unsigned_abs() as u32;
                assert_eq!(mag.get(x, y) as u32, sum.min(255), "({x},{y})");
            }
        }
    }

    #[test]
    #[should_panic(expected = "does not match luma plane")]
    fn test_shape_mismatch_panics() {
        let luma: Image<u8> = Image::new(5, 5);
        let mut out = Image::new(6, 5);
        sobel_magnitude(&luma, &mut out, RowRange::full(5));
    }
}
