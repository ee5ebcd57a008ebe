//! SSE2 row kernels (x86_64).
//!
//! Both kernels work on 16 pixels per group and return how many pixels (or
//! the first column) they did NOT handle, so the caller can finish the row
//! with the scalar kernel.

use std::arch::x86_64::*;

use crate::arith::{LUMA_SHIFT, LUMA_WEIGHT_B, LUMA_WEIGHT_G, LUMA_WEIGHT_R};
use crate::frame::CHANNELS;

/// Pixels per luma group.
pub const LUMA_GROUP: usize = 16;
/// Output columns per Sobel group.
pub const SOBEL_GROUP: usize = 16;

/// Luma for whole groups of 16 pixels. Returns the number of pixels written.
///
/// SSE2 has no 3-way byte deinterleave, so each group is split into B, G, R
/// u16 lanes first; the weighting, shift and narrowing run 8 lanes wide.
///
/// # Safety
/// Caller must ensure SSE2 is available and `bgr.len() >= out.len() * 3`.
#[target_feature(enable = "sse2")]
pub unsafe fn luma_row(bgr: &[u8], out: &mut [u8]) -> usize {
    debug_assert!(bgr.len() >= out.len() * CHANNELS);
    let groups = out.len() / LUMA_GROUP;

    unsafe {
        let wb = _mm_set1_epi16(LUMA_WEIGHT_B as i16);
        let wg = _mm_set1_epi16(LUMA_WEIGHT_G as i16);
        let wr = _mm_set1_epi16(LUMA_WEIGHT_R as i16);

        let mut b = [0u16; LUMA_GROUP];
        let mut g = [0u16; LUMA_GROUP];
        let mut r = [0u16; LUMA_GROUP];

        for group in 0..groups {
            let px = &bgr[group * LUMA_GROUP * CHANNELS..(group + 1) * LUMA_GROUP * CHANNELS];
            for (k, p) in px.chunks_exact(CHANNELS).enumerate() {
                b[k] = p[0] as u16;
                g[k] = p[1] as u16;
                r[k] = p[2] as u16;
            }

            let lo = weigh8(
                _mm_loadu_si128(b.as_ptr() as *const __m128i),
                _mm_loadu_si128(g.as_ptr() as *const __m128i),
                _mm_loadu_si128(r.as_ptr() as *const __m128i),
                wb,
                wg,
                wr,
            );
            let hi = weigh8(
                _mm_loadu_si128(b.as_ptr().add(8) as *const __m128i),
                _mm_loadu_si128(g.as_ptr().add(8) as *const __m128i),
                _mm_loadu_si128(r.as_ptr().add(8) as *const __m128i),
                wb,
                wg,
                wr,
            );

            // Lanes are <= 255 after the shift, so signed packing is exact.
            let packed = _mm_packus_epi16(lo, hi);
            _mm_storeu_si128(
                out.as_mut_ptr().add(group * LUMA_GROUP) as *mut __m128i,
                packed,
            );
        }
    }

    groups * LUMA_GROUP
}

/// `(b*wb + g*wg + r*wr) >> 8` on 8 u16 lanes.
///
/// Products and sum stay below 65536, so wrapping 16-bit adds are exact.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn weigh8(b: __m128i, g: __m128i, r: __m128i, wb: __m128i, wg: __m128i, wr: __m128i) -> __m128i {
    unsafe {
        let acc = _mm_add_epi16(_mm_mullo_epi16(b, wb), _mm_mullo_epi16(g, wg));
        let acc = _mm_add_epi16(acc, _mm_mullo_epi16(r, wr));
        _mm_srli_epi16::<{ LUMA_SHIFT as i32 }>(acc)
    }
}

/// Sobel magnitude for groups of 16 output columns starting at column 1.
///
/// Returns the first column that was not written. The group at `j` reads
/// columns `j-1..j+17`, so groups stop once `j + 16` reaches `width - 1`.
///
/// # Safety
/// Caller must ensure SSE2 is available and that all four slices have the
/// same length.
#[target_feature(enable = "sse2")]
pub unsafe fn sobel_row(prev: &[u8], curr: &[u8], next: &[u8], out: &mut [u8]) -> usize {
    let width = out.len();
    debug_assert!(prev.len() == width && curr.len() == width && next.len() == width);

    let mut j = 1;
    unsafe {
        while j + SOBEL_GROUP < width {
            let p = prev.as_ptr().add(j);
            let c = curr.as_ptr().add(j);
            let n = next.as_ptr().add(j);

            let pl = _mm_loadu_si128(p.sub(1) as *const __m128i);
            let pc = _mm_loadu_si128(p as *const __m128i);
            let pr = _mm_loadu_si128(p.add(1) as *const __m128i);
            let cl = _mm_loadu_si128(c.sub(1) as *const __m128i);
            let cr = _mm_loadu_si128(c.add(1) as *const __m128i);
            let nl = _mm_loadu_si128(n.sub(1) as *const __m128i);
            let nc = _mm_loadu_si128(n as *const __m128i);
            let nr = _mm_loadu_si128(n.add(1) as *const __m128i);

            let zero = _mm_setzero_si128();
            let lo = magnitude8(
                _mm_unpacklo_epi8(pl, zero),
                _mm_unpacklo_epi8(pc, zero),
                _mm_unpacklo_epi8(pr, zero),
                _mm_unpacklo_epi8(cl, zero),
                _mm_unpacklo_epi8(cr, zero),
                _mm_unpacklo_epi8(nl, zero),
                _mm_unpacklo_epi8(nc, zero),
                _mm_unpacklo_epi8(nr, zero),
            );
            let hi = magnitude8(
                _mm_unpackhi_epi8(pl, zero),
                _mm_unpackhi_epi8(pc, zero),
                _mm_unpackhi_epi8(pr, zero),
                _mm_unpackhi_epi8(cl, zero),
                _mm_unpackhi_epi8(cr, zero),
                _mm_unpackhi_epi8(nl, zero),
                _mm_unpackhi_epi8(nc, zero),
                _mm_unpackhi_epi8(nr, zero),
            );

            // packus clamps each i16 lane to [0, 255]: the single saturation.
            _mm_storeu_si128(
                out.as_mut_ptr().add(j) as *mut __m128i,
                _mm_packus_epi16(lo, hi),
            );
            j += SOBEL_GROUP;
        }
    }
    j
}

/// |Gx| + |Gy| on 8 i16 lanes, unsaturated (at most 2040).
#[allow(clippy::too_many_arguments)]
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn magnitude8(
    pl: __m128i,
    pc: __m128i,
    pr: __m128i,
    cl: __m128i,
    cr: __m128i,
    nl: __m128i,
    nc: __m128i,
    nr: __m128i,
) -> __m128i {
    unsafe {
        // Gx = (pr - pl) + 2*(cr - cl) + (nr - nl)
        let gx = _mm_add_epi16(
            _mm_add_epi16(_mm_sub_epi16(pr, pl), _mm_sub_epi16(nr, nl)),
            _mm_slli_epi16::<1>(_mm_sub_epi16(cr, cl)),
        );
        // Gy = (nl - pl) + 2*(nc - pc) + (nr - pr)
        let gy = _mm_add_epi16(
            _mm_add_epi16(_mm_sub_epi16(nl, pl), _mm_sub_epi16(nr, pr)),
            _mm_slli_epi16::<1>(_mm_sub_epi16(nc, pc)),
        );
        _mm_add_epi16(abs_epi16(gx), abs_epi16(gy))
    }
}

/// SSE2 lacks `_mm_abs_epi16` (SSSE3); max(x, -x) is exact for |x| <= 1020.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn abs_epi16(x: __m128i) -> __m128i {
    unsafe { _mm_max_epi16(x, _mm_sub_epi16(_mm_setzero_si128(), x)) }
}
