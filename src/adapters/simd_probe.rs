use std::sync::OnceLock;

use tracing::info;

use crate::ports::BackendProbe;

/// SIMD capabilities of the CPU.
#[derive(Debug, Clone, Copy, Default)]
struct SimdCapabilities {
    avx2: bool,
    neon: bool,
}

impl SimdCapabilities {
    #[cfg(target_arch = "x86_64")]
    fn detect() -> Self {
        Self {
            avx2: std::arch::is_x86_feature_detected!("avx2"),
            neon: false,
        }
    }

    #[cfg(target_arch = "aarch64")]
    fn detect() -> Self {
        // NEON is mandatory on AArch64
        Self {
            avx2: false,
            neon: true,
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    fn detect() -> Self {
        Self::default()
    }

    fn has_good_simd(&self) -> bool {
        self.avx2 || self.neon
    }
}

/// CPU-feature-based backend probe.
///
/// Treats a CPU with wide vector units as the accelerated backend and any
/// supported architecture as the software fallback. Results are cached after
/// the first detection.
pub struct SimdBackendProbe {
    simd: OnceLock<SimdCapabilities>,
}

impl SimdBackendProbe {
    pub fn new() -> Self {
        Self {
            simd: OnceLock::new(),
        }
    }

    fn simd(&self) -> SimdCapabilities {
        *self.simd.get_or_init(|| {
            let simd = SimdCapabilities::detect();
            info!(avx2 = simd.avx2, neon = simd.neon, "SIMD capabilities detected");
            simd
        })
    }

    fn arch_supported() -> bool {
        matches!(std::env::consts::ARCH, "x86_64" | "aarch64")
    }
}

impl Default for SimdBackendProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendProbe for SimdBackendProbe {
    fn accelerated_available(&self) -> bool {
        self.simd().has_good_simd()
    }

    fn fallback_available(&self) -> bool {
        Self::arch_supported()
    }

    fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.simd().has_good_simd() {
            warnings.push(
                "No wide SIMD support detected; falling back to quantized inference".to_string(),
            );
        }
        if !Self::arch_supported() {
            warnings.push(format!(
                "Unsupported CPU architecture: {}",
                std::env::consts::ARCH
            ));
        }
        warnings
    }
}
