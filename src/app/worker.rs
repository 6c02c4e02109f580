//! The transcription worker task.
//!
//! The orchestrator never touches the engine directly: a spawned task owns
//! the engine handle and the single live model, and everything crosses the
//! boundary as owned values over channels. Model swaps serialize through the
//! task's command loop, so the previous model is always disposed before its
//! replacement loads.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::domain::{PcmBuffer, PipelineError, RawTranscription};
use crate::ports::engine::{
    EngineEventSender, InferenceOptions, ModelHandle, ModelSpec, SpeechEngine,
};

/// Commands accepted by the worker task.
pub enum WorkerCommand {
    LoadModel {
        spec: ModelSpec,
        events: EngineEventSender,
        reply: oneshot::Sender<Result<(), PipelineError>>,
    },
    Transcribe {
        audio: PcmBuffer,
        options: InferenceOptions,
        events: EngineEventSender,
        reply: oneshot::Sender<Result<RawTranscription, PipelineError>>,
    },
}

/// Cheap-to-clone client handle for a running worker task.
#[derive(Clone)]
pub struct WorkerClient {
    commands: mpsc::Sender<WorkerCommand>,
    abort: AbortHandle,
}

impl WorkerClient {
    /// Spawn the worker and wait for its readiness handshake.
    ///
    /// Readiness is a oneshot the task resolves exactly once; there is no
    /// retry loop and no polling.
    pub async fn spawn(engine: Arc<dyn SpeechEngine>) -> Result<Self, PipelineError> {
        let (commands, receiver) = mpsc::channel(8);
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(worker_loop(engine, receiver, ready_tx));
        let abort = handle.abort_handle();

        ready_rx.await.map_err(|_| {
            PipelineError::WorkerUnavailable("worker exited before readiness".to_string())
        })?;

        info!("Transcription worker ready");
        Ok(Self { commands, abort })
    }

    /// Ensure the worker has `spec` loaded, swapping out any other model.
    pub async fn load_model(
        &self,
        spec: ModelSpec,
        events: EngineEventSender,
    ) -> Result<(), PipelineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(WorkerCommand::LoadModel {
                spec,
                events,
                reply,
            })
            .await
            .map_err(|_| PipelineError::WorkerUnavailable("worker channel closed".to_string()))?;

        response.await.map_err(|_| {
            PipelineError::WorkerCommunication("no reply to model load".to_string())
        })?
    }

    /// Run inference on the currently loaded model.
    pub async fn transcribe(
        &self,
        audio: PcmBuffer,
        options: InferenceOptions,
        events: EngineEventSender,
    ) -> Result<RawTranscription, PipelineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(WorkerCommand::Transcribe {
                audio,
                options,
                events,
                reply,
            })
            .await
            .map_err(|_| PipelineError::WorkerUnavailable("worker channel closed".to_string()))?;

        response.await.map_err(|_| {
            PipelineError::WorkerCommunication("no reply to transcription".to_string())
        })?
    }

    /// Immediately and unconditionally stop the worker.
    ///
    /// Any in-flight job is discarded without a completion message.
    pub fn terminate(self) {
        self.abort.abort();
        info!("Transcription worker terminated");
    }
}

async fn worker_loop(
    engine: Arc<dyn SpeechEngine>,
    mut commands: mpsc::Receiver<WorkerCommand>,
    ready: oneshot::Sender<()>,
) {
    let _ = ready.send(());
    let mut model: Option<Box<dyn ModelHandle>> = None;

    while let Some(command) = commands.recv().await {
        match command {
            WorkerCommand::LoadModel {
                spec,
                events,
                reply,
            } => {
                let result = ensure_model(&*engine, &mut model, &spec, events).await;
                let _ = reply.send(result);
            }
            WorkerCommand::Transcribe {
                audio,
                options,
                events,
                reply,
            } => {
                let result = match model.as_deref() {
                    Some(handle) => engine.transcribe(handle, &audio, &options, events).await,
                    None => Err(PipelineError::ModelLoad(
                        "no model loaded in worker".to_string(),
                    )),
                };
                let _ = reply.send(result);
            }
        }
    }

    dispose(&mut model);
    debug!("Worker loop exited");
}

/// Load `spec` unless it is already live, disposing the previous model first.
async fn ensure_model(
    engine: &dyn SpeechEngine,
    model: &mut Option<Box<dyn ModelHandle>>,
    spec: &ModelSpec,
    events: EngineEventSender,
) -> Result<(), PipelineError> {
    if let Some(current) = model.as_deref() {
        if current.model_id() == spec.model_id {
            debug!(model = %spec.model_id, "Model already loaded");
            return Ok(());
        }
        info!(
            from = current.model_id(),
            to = %spec.model_id,
            "Swapping recognition model"
        );
        dispose(model);
    }

    let handle = engine.load_model(spec, events).await?;
    info!(model = %spec.model_id, "Model loaded");
    *model = Some(handle);
    Ok(())
}

/// Best-effort disposal. Failures are logged, never propagated.
fn dispose(model: &mut Option<Box<dyn ModelHandle>>) {
    if let Some(handle) = model.take() {
        let id = handle.model_id().to_string();
        if let Err(err) = handle.dispose() {
            warn!(model = %id, error = %err, "Model disposal failed");
        } else {
            debug!(model = %id, "Model disposed");
        }
    }
}
