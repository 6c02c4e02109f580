pub mod config;
pub mod engine;
pub mod media;
pub mod probe;
pub mod synthesis;
pub mod timeline;

pub use config::ConfigStore;
pub use engine::{
    Device, EngineEvent, EngineEventSender, EngineMetadata, EngineTask, InferenceOptions,
    ModelHandle, ModelSpec, Precision, SpeechEngine,
};
pub use media::MediaStore;
pub use probe::{backend_preference, BackendProbe};
pub use synthesis::{SpeechSynthesizer, SynthesizedAudio, VoiceInfo};
pub use timeline::TimelineStore;
