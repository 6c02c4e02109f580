use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{PcmBuffer, PipelineError};

/// Metadata for one synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    /// BCP-47 locale (e.g. "en-US").
    pub locale: String,
    pub gender: String,
}

/// A synthesized utterance: playable samples plus the source text.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub buffer: PcmBuffer,
    pub text: String,
}

/// Port for the text-to-speech capability.
///
/// Consumed as a black box with a fixed voice catalog.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// The fixed voice catalog.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Synthesize `text` with the given voice.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SynthesizedAudio, PipelineError>;
}
