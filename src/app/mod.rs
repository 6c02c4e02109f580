pub mod controller;
pub mod orchestrator;
pub mod session;
pub mod worker;

pub use controller::PipelineController;
pub use orchestrator::{TranscriptionOrchestrator, TranscriptRecord};
pub use session::{ChunkRecord, InferenceSession, InferenceSnapshot};
pub use worker::WorkerClient;
