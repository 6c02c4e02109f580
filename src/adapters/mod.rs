pub mod config_store;
pub mod memory;
pub mod simd_probe;

pub use config_store::TomlConfigStore;
pub use memory::{InMemoryMediaStore, InMemoryTimelineStore};
pub use simd_probe::SimdBackendProbe;
