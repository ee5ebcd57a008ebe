//! NEON row kernels (aarch64).
//!
//! Same contract as the SSE2 backend: whole groups only, the caller finishes
//! the row with the scalar kernel.

use std::arch::aarch64::*;

use crate::arith::{LUMA_WEIGHT_B, LUMA_WEIGHT_G, LUMA_WEIGHT_R};
use crate::frame::CHANNELS;

/// Pixels per luma group (`vld3_u8` deinterleaves 8 pixels).
pub const LUMA_GROUP: usize = 8;
/// Output columns per Sobel group.
pub const SOBEL_GROUP: usize = 16;

/// Luma for whole groups of 8 pixels. Returns the number of pixels written.
///
/// # Safety
/// Caller must ensure NEON is available and `bgr.len() >= out.len() * 3`.
#[target_feature(enable = "neon")]
pub unsafe fn luma_row(bgr: &[u8], out: &mut [u8]) -> usize {
    debug_assert!(bgr.len() >= out.len() * CHANNELS);
    let groups = out.len() / LUMA_GROUP;

    unsafe {
        for group in 0..groups {
            let px = vld3_u8(bgr.as_ptr().add(group * LUMA_GROUP * CHANNELS));
            // 255 * 256 fits u16, so the multiply-accumulate never wraps.
            let acc = vmulq_n_u16(vmovl_u8(px.0), LUMA_WEIGHT_B as u16);
            let acc = vmlaq_n_u16(acc, vmovl_u8(px.1), LUMA_WEIGHT_G as u16);
            let acc = vmlaq_n_u16(acc, vmovl_u8(px.2), LUMA_WEIGHT_R as u16);
            vst1_u8(out.as_mut_ptr().add(group * LUMA_GROUP), vshrn_n_u16::<8>(acc));
        }
    }

    groups * LUMA_GROUP
}

/// Sobel magnitude for groups of 16 output columns starting at column 1.
/// Returns the first column that was not written.
///
/// # Safety
/// Caller must ensure NEON is available and that all four slices have the
/// same length.
#[target_feature(enable = "neon")]
pub unsafe fn sobel_row(prev: &[u8], curr: &[u8], next: &[u8], out: &mut [u8]) -> usize {
    let width = out.len();
    debug_assert!(prev.len() == width && curr.len() == width && next.len() == width);

    let mut j = 1;
    unsafe {
        while j + SOBEL_GROUP < width {
            let p = prev.as_ptr().add(j);
            let c = curr.as_ptr().add(j);
            let n = next.as_ptr().add(j);

            let pl = vld1q_u8(p.sub(1));
            let pc = vld1q_u8(p);
            let pr = vld1q_u8(p.add(1));
            let cl = vld1q_u8(c.sub(1));
            let cr = vld1q_u8(c.add(1));
            let nl = vld1q_u8(n.sub(1));
            let nc = vld1q_u8(n);
            let nr = vld1q_u8(n.add(1));

            let lo = magnitude8(
                widen_lo(pl),
                widen_lo(pc),
                widen_lo(pr),
                widen_lo(cl),
                widen_lo(cr),
                widen_lo(nl),
                widen_lo(nc),
                widen_lo(nr),
            );
            let hi = magnitude8(
                widen_hi(pl),
                widen_hi(pc),
                widen_hi(pr),
                widen_hi(cl),
                widen_hi(cr),
                widen_hi(nl),
                widen_hi(nc),
                widen_hi(nr),
            );

            // vqmovun narrows with unsigned saturation: the single clamp.
            vst1q_u8(
                out.as_mut_ptr().add(j),
                vcombine_u8(vqmovun_s16(lo), vqmovun_s16(hi)),
            );
            j += SOBEL_GROUP;
        }
    }
    j
}

#[inline]
#[target_feature(enable = "neon")]
unsafe fn widen_lo(v: uint8x16_t) -> int16x8_t {
    vreinterpretq_s16_u16(vmovl_u8(vget_low_u8(v)))
}

#[inline]
#[target_feature(enable = "neon")]
unsafe fn widen_hi(v: uint8x16_t) -> int16x8_t {
    vreinterpretq_s16_u16(vmovl_high_u8(v))
}

/// |Gx| + |Gy| on 8 i16 lanes, unsaturated.
#[allow(clippy::too_many_arguments)]
#[inline]
#[target_feature(enable = "neon")]
unsafe fn magnitude8(
    pl: int16x8_t,
    pc: int16x8_t,
    pr: int16x8_t,
    cl: int16x8_t,
    cr: int16x8_t,
    nl: int16x8_t,
    nc: int16x8_t,
    nr: int16x8_t,
) -> int16x8_t {
    let gx = vaddq_s16(
        vaddq_s16(vsubq_s16(pr, pl), vsubq_s16(nr, nl)),
        vshlq_n_s16::<1>(vsubq_s16(cr, cl)),
    );
    let gy = vaddq_s16(
        vaddq_s16(vsubq_s16(nl, pl), vsubq_s16(nr, pr)),
        vshlq_n_s16::<1>(vsubq_s16(nc, pc)),
    );
    vaddq_s16(vabsq_s16(gx), vabsq_s16(gy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::scalar;

    #[test]
    fn test_luma_matches_scalar() {
        let n = LUMA_GROUP * 3 + 2;
        let bgr: Vec<u8> = (0..n * 3).map(|i| (i * 53 % 256) as u8).collect();
        let mut simd = vec![0u8; n];
        let mut reference = vec![0u8; n];
        let done = unsafe { luma_row(&bgr, &mut simd) };
        scalar::luma_row(&bgr, &mut reference);
        assert_eq!(done, LUMA_GROUP * 3);
        assert_eq!(&simd[..done], &reference[..done]);
    }

    #[test]
    fn test_sobel_saturates_once() {
        let width = 1 + SOBEL_GROUP + 1;
        let prev = vec![0u8; width];
        let curr = vec![0u8; width];
        let next = vec![255u8; width];
        let mut out = vec![0u8; width];
        let end = unsafe { sobel_row(&prev, &curr, &next, &mut out) };
        assert_eq!(end, 1 + SOBEL_GROUP);
        assert!(out[1..end].iter().all(|&v| v == 255));
        assert_eq!(out[width - 1], 0);
    }

    #[test]
    fn test_sobel_negative_gradients() {
        let width = 40;
        let row: Vec<u8> = (0..width).map(|x| 255 - (x * 6) as u8).collect();
        let mut simd = vec![0u8; width];
        let mut reference = vec![0u8; width];
        let end = unsafe { sobel_row(&row, &row, &row, &mut simd) };
        scalar::sobel_row(&row, &row, &row, &mut reference, 1);
        assert_eq!(&simd[1..end], &reference[1..end]);
    }
}
