//! CPU feature detection for runtime SIMD dispatch.
//!
//! Detection runs once and is cached, so hot row loops can ask for it on
//! every call without repeating CPUID.

use std::sync::OnceLock;

/// SIMD features the kernels can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuFeatures {
    pub sse2: bool,
    pub neon: bool,
}

static FEATURES: OnceLock<CpuFeatures> = OnceLock::new();

/// Get cached CPU features (detected once on first call).
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn get() -> CpuFeatures {
    *FEATURES.get_or_init(|| CpuFeatures {
        sse2: is_x86_feature_detected!("sse2"),
        neon: false,
    })
}

/// NEON is part of the aarch64 baseline.
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn get() -> CpuFeatures {
    *FEATURES.get_or_init(|| CpuFeatures {
        sse2: false,
        neon: std::arch::is_aarch64_feature_detected!("neon"),
    })
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
pub fn get() -> CpuFeatures {
    *FEATURES.get_or_init(|| CpuFeatures {
        sse2: false,
        neon: false,
    })
}

#[inline]
pub fn has_sse2() -> bool {
    get().sse2
}

#[inline]
pub fn has_neon() -> bool {
    get().neon
}

/// Name of the backend `KernelPath::Batched` resolves to on this machine.
pub fn batched_backend() -> &'static str {
    let f = get();
    if f.sse2 {
        "sse2"
    } else if f.neon {
        "neon"
    } else {
        "scalar"
    }
}
