use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::config::EngineConfig;
use crate::domain::{PcmBuffer, PipelineError, RawTranscription};

/// Compute device preference for the recognition backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    /// Hardware-accelerated backend.
    Accelerated,
    /// Software fallback.
    Cpu,
}

/// Numeric precision the model runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// Full-precision weights, used on accelerated backends.
    Full,
    /// Quantized weights, used on the software fallback.
    Quantized,
}

/// Recognition task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineTask {
    Transcribe,
    Translate,
}

/// A concrete model selection: identifier plus backend placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_id: String,
    pub device: Device,
    pub precision: Precision,
}

impl ModelSpec {
    pub fn new(model_id: impl Into<String>, device: Device, precision: Precision) -> Self {
        Self {
            model_id: model_id.into(),
            device,
            precision,
        }
    }

    /// Distilled variants run with a shorter recognition window.
    pub fn is_distilled(&self) -> bool {
        self.model_id.contains("distil")
    }
}

/// Per-job inference options handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOptions {
    pub task: EngineTask,
    /// Language code, `None` for auto-detection.
    pub language: Option<String>,
    /// Recognition window length in seconds.
    pub chunk_length_secs: f64,
    /// Overlap between consecutive windows in seconds.
    pub stride_length_secs: f64,
}

/// Fixed window geometry for distilled model variants.
const DISTILLED_WINDOW: (f64, f64) = (20.0, 3.0);

impl InferenceOptions {
    /// Window geometry for a model: the configured chunk/stride for standard
    /// variants, a fixed shorter 20s/3s window for distilled variants.
    pub fn for_model(
        spec: &ModelSpec,
        task: EngineTask,
        language: Option<String>,
        engine: &EngineConfig,
    ) -> Self {
        let (chunk_length_secs, stride_length_secs) = if spec.is_distilled() {
            DISTILLED_WINDOW
        } else {
            (engine.chunk_length_secs, engine.stride_length_secs)
        };
        Self {
            task,
            language,
            chunk_length_secs,
            stride_length_secs,
        }
    }
}

/// Feature-extraction and position-limit metadata the engine must expose.
///
/// Absence means the engine build is unusable for windowed inference and is
/// reported as a configuration error, not a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetadata {
    /// Mel feature bins per frame.
    pub feature_size: u32,
    /// Maximum positions the decoder supports.
    pub max_position_embeddings: u32,
}

/// Events streamed by the engine during model load and inference.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A model file download began.
    DownloadStarted { file: String },
    /// Byte-level download progress for one file.
    DownloadProgress {
        file: String,
        loaded: u64,
        total: u64,
    },
    /// A model file finished downloading.
    DownloadComplete { file: String },
    /// A recognition window opened at `offset_secs` into the audio.
    WindowStarted { index: usize, offset_secs: f64 },
    /// Partial text decoded for the currently open window.
    Token { text: String },
    /// The open window finished; `end_offset_secs` stamps its end.
    WindowComplete { end_offset_secs: f64 },
}

/// Sender half of the engine event stream.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// A live, exclusively owned model instance.
///
/// Ownership moves with model swaps; only one handle is live at a time and
/// the previous one is disposed before its replacement loads.
pub trait ModelHandle: Send {
    fn model_id(&self) -> &str;

    /// Release the model. Failures are logged by the caller, not propagated.
    fn dispose(self: Box<Self>) -> Result<(), PipelineError>;
}

/// The out-of-process speech recognition capability.
///
/// Consumed as a black box: raw PCM plus configuration in, streamed events
/// and a raw transcription out. Everything crossing this boundary is owned
/// data; no memory is shared with the engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine build metadata, `None` when the build is misconfigured.
    fn metadata(&self) -> Option<EngineMetadata>;

    /// Load a model, streaming download progress on `events`.
    async fn load_model(
        &self,
        spec: &ModelSpec,
        events: EngineEventSender,
    ) -> Result<Box<dyn ModelHandle>, PipelineError>;

    /// Run inference over mono PCM at the engine's required sample rate,
    /// streaming window/token events on `events`.
    async fn transcribe(
        &self,
        model: &dyn ModelHandle,
        audio: &PcmBuffer,
        options: &InferenceOptions,
        events: EngineEventSender,
    ) -> Result<RawTranscription, PipelineError>;
}
