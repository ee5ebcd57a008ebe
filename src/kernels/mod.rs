// kernels/mod.rs -- Row kernels and backend dispatch.
//
// Every stage works one row at a time. A row goes through the batched
// backend first (whole groups of pixels), then the scalar kernel finishes
// whatever is left:
//
//   columns:  0 | 1 ........................ k | k+1 ... w-2 | w-1
//                 └──── batched groups ─────┘   └─ scalar ──┘
//
// The scalar kernel is the reference. A batched backend must write the same
// bytes for the columns it claims, and nothing outside them.

pub mod scalar;

#[cfg(target_arch = "aarch64")]
pub mod neon;
#[cfg(target_arch = "x86_64")]
pub mod sse;

use crate::cpu_features;
use crate::frame::CHANNELS;

/// Which implementation a stage runs its rows through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KernelPath {
    /// One pixel at a time. The reference output.
    Scalar,
    /// SIMD groups (SSE2 or NEON) plus a scalar remainder. Falls back to
    /// `Scalar` on targets without either.
    #[default]
    Batched,
}

impl KernelPath {
    pub fn name(self) -> &'static str {
        match self {
            KernelPath::Scalar => "scalar",
            KernelPath::Batched => cpu_features::batched_backend(),
        }
    }
}

/// Luma for `out.len()` pixels of interleaved B,G,R.
#[inline]
pub fn luma_row(path: KernelPath, bgr: &[u8], out: &mut [u8]) {
    debug_assert!(bgr.len() >= out.len() * CHANNELS);
    let done = match path {
        KernelPath::Scalar => 0,
        KernelPath::Batched => batched_luma(bgr, out),
    };
    scalar::luma_row(&bgr[done * CHANNELS..], &mut out[done..]);
}

/// Sobel magnitude for columns `1..width-1` of one interior row.
#[inline]
pub fn sobel_row(path: KernelPath, prev: &[u8], curr: &[u8], next: &[u8], out: &mut [u8]) {
    if out.len() < 3 {
        return;
    }
    let from = match path {
        KernelPath::Scalar => 1,
        KernelPath::Batched => batched_sobel(prev, curr, next, out),
    };
    scalar::sobel_row(prev, curr, next, out, from);
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn batched_luma(bgr: &[u8], out: &mut [u8]) -> usize {
    if cpu_features::has_sse2() {
        // SAFETY: SSE2 detected; length checked by the caller.
        unsafe { sse::luma_row(bgr, out) }
    } else {
        0
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn batched_sobel(prev: &[u8], curr: &[u8], next: &[u8], out: &mut [u8]) -> usize {
    if cpu_features::has_sse2() && prev.len() == out.len() && curr.len() == out.len() && next.len() == out.len() {
        // SAFETY: SSE2 detected and all rows have the output's width.
        unsafe { sse::sobel_row(prev, curr, next, out) }
    } else {
        1
    }
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn batched_luma(bgr: &[u8], out: &mut [u8]) -> usize {
    if cpu_features::has_neon() {
        // SAFETY: NEON detected; length checked by the caller.
        unsafe { neon::luma_row(bgr, out) }
    } else {
        0
    }
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn batched_sobel(prev: &[u8], curr: &[u8], next: &[u8], out: &mut [u8]) -> usize {
    if cpu_features::has_neon() && prev.len() == out.len() && curr.len() == out.len() && next.len() == out.len() {
        // SAFETY: NEON detected and all rows have the output's width.
        unsafe { neon::sobel_row(prev, curr, next, out) }
    } else {
        1
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn batched_luma(_bgr: &[u8], _out: &mut [u8]) -> usize {
    0
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn batched_sobel(_prev: &[u8], _curr: &[u8], _next: &[u8], _out: &mut [u8]) -> usize {
    1
}
