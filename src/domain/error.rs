use thiserror::Error;

/// Domain-level errors for the caption pipeline.
///
/// All payloads are plain strings so the enum stays `Clone`: in-flight
/// transcription results are shared between concurrent callers, and the
/// error side of that result must be cloneable too.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("No recognition backend available: {0}")]
    NoBackendAvailable(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("No model specified for transcription")]
    MissingModelSpec,

    #[error("Audio buffer is empty")]
    EmptyAudioInput,

    #[error("Engine configuration invalid: {0}")]
    EngineConfiguration(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Transcription worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Transcription worker communication failed: {0}")]
    WorkerCommunication(String),

    #[error("No audio could be extracted from the selected elements")]
    NoAudioExtractable,

    #[error("Media error: {0}")]
    Media(String),

    #[error("Timeline error: {0}")]
    Timeline(String),

    #[error("Unknown transcript: {0}")]
    UnknownTranscript(String),

    #[error("Transcription terminated")]
    Terminated,

    #[error("Synthesis error: {0}")]
    Synthesis(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(err: toml::ser::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
