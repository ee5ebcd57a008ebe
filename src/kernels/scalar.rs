//! Scalar row kernels. These define the output every other backend must match.

use crate::arith::{gradient_magnitude, luma_q8, sobel_gx, sobel_gy};
use crate::frame::CHANNELS;

/// Convert `out.len()` interleaved B,G,R pixels from `bgr` to luma.
#[inline]
pub fn luma_row(bgr: &[u8], out: &mut [u8]) {
    for (dst, px) in out.iter_mut().zip(bgr.chunks_exact(CHANNELS)) {
        *dst = luma_q8(px[0], px[1], px[2]);
    }
}

/// Sobel magnitude for columns `from..width-1` of one interior row.
///
/// `prev`, `curr`, `next` and `out` all have length `width`. Column 0 and
/// column `width-1` are never written.
#[inline]
pub fn sobel_row(prev: &[u8], curr: &[u8], next: &[u8], out: &mut [u8], from: usize) {
    let width = out.len();
    if width < 3 {
        return;
    }
    for j in from.max(1)..width - 1 {
        let gx = sobel_gx(prev, curr, next, j);
        let gy = sobel_gy(prev, next, j);
        out[j] = gradient_magnitude(gx, gy);
    }
}

/// Signed horizontal component for columns `1..width-1` of one interior row.
pub fn sobel_x_row(prev: &[u8], curr: &[u8], next: &[u8], out: &mut [i16]) {
    let width = out.len();
    if width < 3 {
        return;
    }
    for j in 1..width - 1 {
        out[j] = sobel_gx(prev, curr, next, j) as i16;
    }
}

/// Signed vertical component for columns `1..width-1` of one interior row.
pub fn sobel_y_row(prev: &[u8], next: &[u8], out: &mut [i16]) {
    let width = out.len();
    if width < 3 {
        return;
    }
    for j in 1..width - 1 {
        out[j] = sobel_gy(prev, next, j) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_row() {
        let bgr = [255, 255, 255, 0, 0, 0, 255, 0, 0];
        let mut out = [1u8; 3];
        luma_row(&bgr, &mut out);
        assert_eq!(out, [255, 0, 28]);
    }

    #[test]
    fn test_sobel_row_leaves_border_columns() {
        let prev = [0u8, 0, 0, 0];
        let curr = [0u8, 0, 0, 0];
        let next = [90u8, 90, 90, 90];
        let mut out = [7u8; 4];
        sobel_row(&prev, &curr, &next, &mut out, 1);
        // Gy = 90 + 180 + 90 = 360 → saturates.
        assert_eq!(out, [7, 255, 255, 7]);
    }

    #[test]
    fn test_sobel_row_resumes_from_column() {
        let row = [0u8, 10, 20, 30, 40];
        let mut out = [0u8; 5];
        sobel_row(&row, &row, &row, &mut out, 3);
        // Linear ramp of 10 per column: Gx = 20 + 40 + 20 = 80.
        assert_eq!(out, [0, 0, 0, 80, 0]);
    }

    #[test]
    fn test_narrow_rows_are_noops() {
        let row = [200u8, 0];
        let mut out = [5u8; 2];
        sobel_row(&row, &row, &row, &mut out, 1);
        assert_eq!(out, [5, 5]);
    }

    #[test]
    fn test_signed_components() {
        let prev = [0u8, 0, 0];
        let curr = [100u8, 50, 0];
        let next = [0u8, 0, 0];
        let mut gx = [0i16; 3];
        let mut gy = [0i16; 3];
        sobel_x_row(&prev, &curr, &next, &mut gx);
        sobel_y_row(&prev, &next, &mut gy);
        assert_eq!(gx, [0, -200, 0]);
        assert_eq!(gy, [0, 0, 0]);
    }
}
