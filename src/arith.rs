// arith.rs -- Fixed-point luma weights and saturating gradient arithmetic.
//
// Every kernel backend (scalar, SSE2, NEON) is defined against the functions
// in this file. The SIMD paths are allowed to reorder the arithmetic only in
// ways that produce the same bytes.
//
// LUMA (Q8 fixed point):
//   Y = (29*B + 150*G + 77*R) >> 8
//
//   The weights are ITU-R BT.601 (0.114, 0.587, 0.299) scaled by 256 and
//   rounded. They sum to 256, so the largest intermediate is 256 * 255 = 65280,
//   which fits a u16 lane. That is what lets the vector paths stay in 16 bits.
//
// SOBEL:
//   Gx and Gy each lie in [-1020, 1020]. |Gx| + |Gy| lies in [0, 2040], so an
//   i16 lane holds the whole computation. The sum is clamped to 255 once.

/// Weight applied to the blue byte.
pub const LUMA_WEIGHT_B: u32 = 29;
/// Weight applied to the green byte.
pub const LUMA_WEIGHT_G: u32 = 150;
/// Weight applied to the red byte.
pub const LUMA_WEIGHT_R: u32 = 77;
/// Right shift that removes the Q8 scale.
pub const LUMA_SHIFT: u32 = 8;

/// Q8 luma of one B,G,R pixel.
#[inline(always)]
pub fn luma_q8(b: u8, g: u8, r: u8) -> u8 {
    let acc = LUMA_WEIGHT_B * b as u32 + LUMA_WEIGHT_G * g as u32 + LUMA_WEIGHT_R * r as u32;
    (acc >> LUMA_SHIFT) as u8
}

/// Clamp a non-negative magnitude to the byte range. Negative input maps to 0.
#[inline(always)]
pub fn saturate_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Horizontal Sobel response at column `j` of the middle row.
///
/// `prev`, `curr`, `next` are rows `i-1`, `i`, `i+1`. Requires `1 <= j < len-1`.
#[inline(always)]
pub fn sobel_gx(prev: &[u8], curr: &[u8], next: &[u8], j: usize) -> i32 {
    (prev[j + 1] as i32 - prev[j - 1] as i32)
        + 2 * (curr[j + 1] as i32 - curr[j - 1] as i32)
        + (next[j + 1] as i32 - next[j - 1] as i32)
}

/// Vertical Sobel response at column `j` of the middle row.
///
/// Positive when intensity increases downward.
#[inline(always)]
pub fn sobel_gy(prev: &[u8], next: &[u8], j: usize) -> i32 {
    (next[j - 1] as i32 - prev[j - 1] as i32)
        + 2 * (next[j] as i32 - prev[j] as i32)
        + (next[j + 1] as i32 - prev[j + 1] as i32)
}

/// L1 gradient magnitude, saturated once after the sum.
#[inline(always)]
pub fn gradient_magnitude(gx: i32, gy: i32) -> u8 {
    saturate_u8(gx.abs() + gy.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one_in_q8() {
        assert_eq!(LUMA_WEIGHT_B + LUMA_WEIGHT_G + LUMA_WEIGHT_R, 1 << LUMA_SHIFT);
    }

    #[test]
    fn test_luma_extremes() {
        assert_eq!(luma_q8(0, 0, 0), 0);
        // 256 * 255 >> 8 = 255 exactly, no rounding loss at white.
        assert_eq!(luma_q8(255, 255, 255), 255);
    }

    #[test]
    fn test_luma_single_channels() {
        // 29*255 = 7395 → 28, 150*255 = 38250 → 149, 77*255 = 19635 → 76
        assert_eq!(luma_q8(255, 0, 0), 28);
        assert_eq!(luma_q8(0, 255, 0), 149);
        assert_eq!(luma_q8(0, 0, 255), 76);
    }

    #[test]
    fn test_luma_truncates() {
        // 29*1 + 150*1 + 77*1 = 256 → 1; one less on green drops to 0.
        assert_eq!(luma_q8(1, 1, 1), 1);
        assert_eq!(luma_q8(1, 0, 1), 0);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate_u8(0), 0);
        assert_eq!(saturate_u8(255), 255);
        assert_eq!(saturate_u8(256), 255);
        assert_eq!(saturate_u8(2040), 255);
        assert_eq!(saturate_u8(-7), 0);
    }

    #[test]
    fn test_negative_gradient_is_not_wrapped() {
        // Bright on the left, dark on the right: Gx must be negative, and
        // its magnitude must survive (a u8 subtraction would wrap instead).
        let row = [200u8, 100, 0];
        let gx = sobel_gx(&row, &row, &row, 1);
        assert_eq!(gx, -800);
        assert_eq!(gradient_magnitude(gx, 0), 255);

        let weak = [10u8, 0, 0];
        let gx = sobel_gx(&weak, &weak, &weak, 1);
        assert_eq!(gx, -40);
        assert_eq!(gradient_magnitude(gx, 0), 40);
    }

    #[test]
    fn test_gy_sign() {
        let dark = [0u8; 3];
        let bright = [50u8; 3];
        assert_eq!(sobel_gy(&dark, &bright, 1), 200);
        assert_eq!(sobel_gy(&bright, &dark, 1), -200);
    }

    #[test]
    fn test_extreme_components() {
        let dark = [0u8; 3];
        let bright = [255u8; 3];
        let gy = sobel_gy(&dark, &bright, 1);
        assert_eq!(gy, 1020);
        let edge = [0u8, 0, 255];
        let gx = sobel_gx(&edge, &edge, &edge, 1);
        assert_eq!(gx, 1020);
        assert_eq!(gradient_magnitude(gx, -gy), 255);
    }
}
