//! Transcription orchestration.
//!
//! Owns the worker lifecycle: backend selection, model load with progress
//! streaming, single-flight job enforcement, cancellation, and translation of
//! low-level engine events into the observable processing status. Status and
//! inference snapshots are two separate watch channels, and the final result
//! is the awaited return value; no callback carries multiplexed meanings.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::app::session::{InferenceSession, InferenceSnapshot};
use crate::app::worker::WorkerClient;
use crate::domain::config::EngineConfig;
use crate::domain::{PcmBuffer, PipelineError, ProcessingStatus, Stage, Transcript};
use crate::ports::engine::{EngineEvent, EngineTask, InferenceOptions, ModelSpec, SpeechEngine};
use crate::ports::probe::{backend_preference, BackendProbe};

type JobResult = Result<Arc<Transcript>, PipelineError>;
type SharedJob = Shared<BoxFuture<'static, JobResult>>;

/// A completed transcription kept in the results list.
#[derive(Debug, Clone)]
pub struct TranscriptRecord {
    pub id: String,
    pub model_id: String,
    pub transcript: Arc<Transcript>,
}

/// Orchestrates the transcription worker and exposes its observable state.
#[derive(Clone)]
pub struct TranscriptionOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Arc<dyn SpeechEngine>,
    probe: Arc<dyn BackendProbe>,
    status_tx: watch::Sender<ProcessingStatus>,
    snapshot_tx: watch::Sender<InferenceSnapshot>,
    worker: Mutex<Option<WorkerClient>>,
    /// The in-flight job, tagged with its number so a finishing job never
    /// clears a successor's slot.
    in_flight: Mutex<Option<(u64, SharedJob)>>,
    results: RwLock<Vec<TranscriptRecord>>,
    job_counter: AtomicU64,
    /// Window geometry for jobs; read once per job at submission.
    engine_config: Mutex<EngineConfig>,
}

impl Inner {
    fn set_status(&self, status: ProcessingStatus) {
        self.status_tx.send_replace(status);
    }
}

impl TranscriptionOrchestrator {
    pub fn new(engine: Arc<dyn SpeechEngine>, probe: Arc<dyn BackendProbe>) -> Self {
        let (status_tx, _) = watch::channel(ProcessingStatus::ready());
        let (snapshot_tx, _) = watch::channel(InferenceSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                engine,
                probe,
                status_tx,
                snapshot_tx,
                worker: Mutex::new(None),
                in_flight: Mutex::new(None),
                results: RwLock::new(Vec::new()),
                job_counter: AtomicU64::new(0),
                engine_config: Mutex::new(EngineConfig::default()),
            }),
        }
    }

    /// Observable processing status.
    pub fn status(&self) -> watch::Receiver<ProcessingStatus> {
        self.status_tx().subscribe()
    }

    /// Observable streaming snapshots of the running inference.
    pub fn progress(&self) -> watch::Receiver<InferenceSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    fn status_tx(&self) -> &watch::Sender<ProcessingStatus> {
        &self.inner.status_tx
    }

    /// Replace the window geometry used by subsequent jobs. A job already in
    /// flight keeps the geometry it started with.
    pub fn set_engine_config(&self, config: EngineConfig) {
        *self.inner.engine_config.lock() = config;
    }

    /// Submit audio for transcription.
    ///
    /// At most one job is in flight; a concurrent submission awaits the
    /// existing job's shared result instead of duplicating work. Resolves
    /// exactly once per job with a transcript or an error, and every error
    /// path leaves the status at `Error` with processing cleared.
    pub async fn submit(
        &self,
        audio: PcmBuffer,
        model_id: &str,
        task: EngineTask,
        language: Option<String>,
    ) -> JobResult {
        let job = {
            let mut in_flight = self.inner.in_flight.lock();
            if let Some((number, job)) = in_flight.as_ref() {
                debug!(job = number, "Joining in-flight transcription");
                job.clone()
            } else {
                let number = self.inner.job_counter.fetch_add(1, Ordering::Relaxed) + 1;
                let inner = Arc::clone(&self.inner);
                let model_id = model_id.to_string();
                let job: SharedJob = async move {
                    let result = run_job(&inner, number, audio, model_id, task, language).await;
                    {
                        let mut in_flight = inner.in_flight.lock();
                        if matches!(in_flight.as_ref(), Some((n, _)) if *n == number) {
                            *in_flight = None;
                        }
                    }
                    settle(&inner, result)
                }
                .boxed()
                .shared();
                *in_flight = Some((number, job.clone()));
                job
            }
        };

        job.await
    }

    /// Immediately and unconditionally cancel the worker.
    ///
    /// Any in-flight job is discarded; its callers observe `Terminated`,
    /// which is distinct from `Error`.
    pub fn terminate(&self) {
        self.inner.set_status(ProcessingStatus::terminated());
        if let Some(worker) = self.inner.worker.lock().take() {
            worker.terminate();
        }
        *self.inner.in_flight.lock() = None;
        info!("Transcription terminated");
    }

    /// Completed transcripts, newest last.
    pub fn transcripts(&self) -> Vec<TranscriptRecord> {
        self.inner.results.read().clone()
    }

    /// Remove one result by id. Returns whether anything was removed.
    pub fn remove_transcript(&self, id: &str) -> bool {
        let mut results = self.inner.results.write();
        let before = results.len();
        results.retain(|r| r.id != id);
        results.len() != before
    }

    /// Clear the results list.
    pub fn clear_transcripts(&self) {
        self.inner.results.write().clear();
    }
}

/// Map a finished job into the observable status exactly once.
fn settle(inner: &Inner, result: JobResult) -> JobResult {
    match result {
        Ok(transcript) => {
            inner.set_status(ProcessingStatus::complete());
            Ok(transcript)
        }
        Err(_) if inner.status_tx.borrow().stage == Stage::Terminated => {
            // Termination discarded the job; keep the terminated status.
            Err(PipelineError::Terminated)
        }
        Err(err) => {
            inner.set_status(ProcessingStatus::error(err.to_string()));
            Err(err)
        }
    }
}

async fn run_job(
    inner: &Arc<Inner>,
    job_number: u64,
    audio: PcmBuffer,
    model_id: String,
    task: EngineTask,
    language: Option<String>,
) -> JobResult {
    if audio.is_empty() {
        return Err(PipelineError::EmptyAudioInput);
    }
    if model_id.trim().is_empty() {
        return Err(PipelineError::MissingModelSpec);
    }

    let metadata = inner.engine.metadata().ok_or_else(|| {
        PipelineError::EngineConfiguration(
            "engine exposes no feature-extraction or position-limit metadata".to_string(),
        )
    })?;
    debug!(
        feature_size = metadata.feature_size,
        max_position_embeddings = metadata.max_position_embeddings,
        "Engine metadata validated"
    );

    inner.set_status(ProcessingStatus::processing(Stage::Loading, 0));

    for warning in inner.probe.warnings() {
        warn!(warning, "Backend probe warning");
    }
    let (device, precision) = backend_preference(&*inner.probe).ok_or_else(|| {
        let warnings = inner.probe.warnings().join("; ");
        PipelineError::NoBackendAvailable(if warnings.is_empty() {
            "no accelerated backend and no software fallback".to_string()
        } else {
            warnings
        })
    })?;

    let worker = {
        let existing = inner.worker.lock().clone();
        match existing {
            Some(worker) => worker,
            None => {
                let worker = WorkerClient::spawn(Arc::clone(&inner.engine)).await?;
                *inner.worker.lock() = Some(worker.clone());
                worker
            }
        }
    };

    inner.set_status(ProcessingStatus::processing(Stage::Initializing, 0));

    let spec = ModelSpec::new(model_id, device, precision);
    let engine_config = inner.engine_config.lock().clone();
    let options = InferenceOptions::for_model(&spec, task, language, &engine_config);
    info!(
        model = %spec.model_id,
        device = ?spec.device,
        precision = ?spec.precision,
        chunk_length_secs = options.chunk_length_secs,
        "Starting transcription job"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    pump_load(inner, worker.load_model(spec.clone(), events_tx), events_rx).await?;

    inner.set_status(ProcessingStatus::processing(Stage::Transcribing, 0));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let raw = pump_inference(
        inner,
        worker.transcribe(audio, options, events_tx),
        events_rx,
    )
    .await?;

    let id = format!("transcript-{job_number}");
    let transcript = Arc::new(Transcript::from_engine_output(id.clone(), &raw));
    inner.results.write().push(TranscriptRecord {
        id,
        model_id: spec.model_id,
        transcript: Arc::clone(&transcript),
    });

    info!(
        chunks = transcript.chunks.len(),
        total_duration_ms = transcript.total_duration_ms,
        "Transcription complete"
    );
    Ok(transcript)
}

fn on_load_event(inner: &Inner, event: EngineEvent) {
    match event {
        EngineEvent::DownloadStarted { file } => {
            debug!(file, "Model download started");
            inner.set_status(ProcessingStatus::processing(Stage::Downloading, 0));
        }
        EngineEvent::DownloadProgress { file, loaded, total } => {
            let pct = if total > 0 {
                ((loaded * 100) / total).min(100) as u8
            } else {
                0
            };
            debug!(file, loaded, total, pct, "Model download progress");
            inner.set_status(ProcessingStatus::processing(Stage::Downloading, pct));
        }
        EngineEvent::DownloadComplete { file } => {
            debug!(file, "Model download complete");
        }
        _ => {}
    }
}

fn on_inference_event(inner: &Inner, session: &mut InferenceSession, event: &EngineEvent) {
    if let Some(snapshot) = session.on_event(event) {
        inner.set_status(ProcessingStatus::processing(
            Stage::Transcribing,
            snapshot.progress,
        ));
        inner.snapshot_tx.send_replace(snapshot);
    }
}

/// Await the model load while folding download events into the status.
///
/// Events still queued when the load resolves are drained before returning,
/// so the final observable status never lags the channel.
async fn pump_load(
    inner: &Inner,
    load: impl Future<Output = Result<(), PipelineError>>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
) -> Result<(), PipelineError> {
    tokio::pin!(load);
    loop {
        tokio::select! {
            Some(event) = events.recv() => on_load_event(inner, event),
            result = &mut load => {
                while let Ok(event) = events.try_recv() {
                    on_load_event(inner, event);
                }
                return result;
            }
        }
    }
}

/// Await the inference while folding window/token events into snapshots.
/// Drains queued events on completion, like [`pump_load`].
async fn pump_inference<T>(
    inner: &Inner,
    job: impl Future<Output = Result<T, PipelineError>>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
) -> Result<T, PipelineError> {
    let mut session = InferenceSession::new();
    tokio::pin!(job);
    loop {
        tokio::select! {
            Some(event) = events.recv() => on_inference_event(inner, &mut session, &event),
            result = &mut job => {
                while let Ok(event) = events.try_recv() {
                    on_inference_event(inner, &mut session, &event);
                }
                return result;
            }
        }
    }
}
