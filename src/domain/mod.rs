pub mod audio;
pub mod config;
pub mod error;
pub mod extraction;
pub mod projection;
pub mod status;
pub mod subtitle;
pub mod timeline;
pub mod transcript;

pub use audio::PcmBuffer;
pub use config::AppConfig;
pub use error::PipelineError;
pub use extraction::{DecodedMedia, TrackMix};
pub use projection::Granularity;
pub use status::{ProcessingStatus, Stage};
pub use timeline::{CaptionElement, MediaKind, TimelineElement, Track};
pub use transcript::{RawTranscription, Transcript, TranscriptChunk, TranscriptWord};
