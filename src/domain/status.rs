use serde::{Deserialize, Serialize};

/// Stage of the transcription state machine.
///
/// `Ready` is both the initial and the quiescent post-completion state.
/// `Error` is reachable from any non-terminal stage; `Terminated` only via
/// explicit cancellation and is distinct from `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ready,
    Loading,
    Initializing,
    Downloading,
    Transcribing,
    Terminated,
    Error,
}

/// The single observable state value driving UI feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub is_processing: bool,
    pub stage: Stage,
    /// Progress percentage in `[0, 100]`.
    pub progress: u8,
    pub error: Option<String>,
}

impl ProcessingStatus {
    /// Initial quiescent status.
    pub fn ready() -> Self {
        Self {
            is_processing: false,
            stage: Stage::Ready,
            progress: 0,
            error: None,
        }
    }

    /// An in-progress status at the given stage.
    pub fn processing(stage: Stage, progress: u8) -> Self {
        Self {
            is_processing: true,
            stage,
            progress: progress.min(100),
            error: None,
        }
    }

    /// Completed status. Processing flag is cleared so UIs never wedge.
    pub fn complete() -> Self {
        Self {
            is_processing: false,
            stage: Stage::Ready,
            progress: 100,
            error: None,
        }
    }

    /// Error status with a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_processing: false,
            stage: Stage::Error,
            progress: 0,
            error: Some(message.into()),
        }
    }

    /// Terminated status, set only by explicit cancellation.
    pub fn terminated() -> Self {
        Self {
            is_processing: false,
            stage: Stage::Terminated,
            progress: 0,
            error: None,
        }
    }
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self::ready()
    }
}
