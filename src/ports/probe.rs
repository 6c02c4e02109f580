use crate::ports::engine::{Device, Precision};

/// Port for recognition backend probing.
///
/// Implementations check whether a hardware-accelerated backend and a
/// software fallback are reachable on this system.
pub trait BackendProbe: Send + Sync {
    /// Whether the hardware-accelerated backend is available.
    fn accelerated_available(&self) -> bool;

    /// Whether the software fallback is available.
    fn fallback_available(&self) -> bool;

    /// Non-fatal findings worth surfacing to the caller.
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Backend preference derived from a probe.
///
/// Accelerated backends run full precision; the fallback runs quantized.
/// `None` means no backend exists at all.
pub fn backend_preference(probe: &dyn BackendProbe) -> Option<(Device, Precision)> {
    if probe.accelerated_available() {
        Some((Device::Accelerated, Precision::Full))
    } else if probe.fallback_available() {
        Some((Device::Cpu, Precision::Quantized))
    } else {
        None
    }
}
