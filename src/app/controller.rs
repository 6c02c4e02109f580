//! The pipeline controller: the application facade over stores, the
//! transcription orchestrator, and the optional synthesizer.
//!
//! Every captioning flow runs through here: compose a track's audio, resample
//! it to the engine rate, transcribe, project the transcript back onto the
//! timeline as a new caption track. The controller owns the loaded
//! configuration and the logging guard.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::app::orchestrator::{TranscriptionOrchestrator, TranscriptRecord};
use crate::app::session::InferenceSnapshot;
use crate::domain::extraction::{compose_track, extract_segment, resample};
use crate::domain::projection::{project, Granularity};
use crate::domain::subtitle::{subtitle_filename, to_srt};
use crate::domain::{
    AppConfig, PcmBuffer, PipelineError, ProcessingStatus, TimelineElement, Transcript,
};
use crate::infrastructure::init_logging;
use crate::ports::engine::{EngineTask, SpeechEngine};
use crate::ports::{
    BackendProbe, ConfigStore, MediaStore, SpeechSynthesizer, SynthesizedAudio, TimelineStore,
    VoiceInfo,
};

pub struct PipelineController {
    config: RwLock<AppConfig>,
    config_store: Option<Arc<dyn ConfigStore>>,
    media: Arc<dyn MediaStore>,
    timeline: Arc<dyn TimelineStore>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    orchestrator: TranscriptionOrchestrator,
    _log_guard: Option<WorkerGuard>,
}

impl PipelineController {
    /// Full startup path: load (or create) the configuration, initialize
    /// logging, and wire the orchestrator.
    pub fn init(
        config_store: Arc<dyn ConfigStore>,
        media: Arc<dyn MediaStore>,
        timeline: Arc<dyn TimelineStore>,
        engine: Arc<dyn SpeechEngine>,
        probe: Arc<dyn BackendProbe>,
    ) -> Result<Self, PipelineError> {
        let config = config_store.load()?;
        let log_guard = init_logging(&config.logging, &config_store.logs_dir())?;

        info!(config_path = ?config_store.config_path(), "Pipeline controller starting");

        let orchestrator = TranscriptionOrchestrator::new(engine, probe);
        orchestrator.set_engine_config(config.engine.clone());

        Ok(Self {
            config: RwLock::new(config),
            config_store: Some(config_store),
            media,
            timeline,
            synthesizer: None,
            orchestrator,
            _log_guard: log_guard,
        })
    }

    /// Embedding path: explicit configuration, no persistence, no logging
    /// setup. The host owns both.
    pub fn with_config(
        config: AppConfig,
        media: Arc<dyn MediaStore>,
        timeline: Arc<dyn TimelineStore>,
        engine: Arc<dyn SpeechEngine>,
        probe: Arc<dyn BackendProbe>,
    ) -> Self {
        let orchestrator = TranscriptionOrchestrator::new(engine, probe);
        orchestrator.set_engine_config(config.engine.clone());

        Self {
            config: RwLock::new(config),
            config_store: None,
            media,
            timeline,
            synthesizer: None,
            orchestrator,
            _log_guard: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Replace the configuration, persisting it when a store is attached.
    pub fn update_config(&self, config: AppConfig) -> Result<(), PipelineError> {
        if let Some(store) = &self.config_store {
            store.save(&config)?;
        }
        self.orchestrator.set_engine_config(config.engine.clone());
        *self.config.write() = config;
        Ok(())
    }

    pub fn status(&self) -> watch::Receiver<ProcessingStatus> {
        self.orchestrator.status()
    }

    pub fn progress(&self) -> watch::Receiver<InferenceSnapshot> {
        self.orchestrator.progress()
    }

    pub fn terminate(&self) {
        self.orchestrator.terminate();
    }

    /// Caption a whole track.
    ///
    /// Mixes the track's audio-bearing elements into one stream, transcribes
    /// it, projects the transcript at `granularity`, and lands the captions
    /// on a freshly created `<track name> captions` track. Returns the new
    /// track's id.
    pub async fn caption_track(
        &self,
        track_id: &str,
        model_id: Option<&str>,
        granularity: Granularity,
    ) -> Result<String, PipelineError> {
        let track = self.timeline.track(track_id)?;
        let media = Arc::clone(&self.media);
        let mix = compose_track(&track.elements, move |id| media.decode(id))?;

        let transcript = self.transcribe_buffer(mix.buffer, model_id).await?;
        let captions = project(&transcript, granularity, mix.timeline_offset);

        let caption_track_id = self
            .timeline
            .create_track(&format!("{} captions", track.name))?;
        let emitted = captions.len();
        for caption in captions {
            self.timeline.add_caption(&caption_track_id, caption)?;
        }

        info!(
            source = track_id,
            captions = caption_track_id,
            elements = emitted,
            "Captioned track"
        );
        Ok(caption_track_id)
    }

    /// Transcribe a single timeline element at its trims.
    pub async fn transcribe_element(
        &self,
        element_id: &str,
        model_id: Option<&str>,
    ) -> Result<Arc<Transcript>, PipelineError> {
        let element = self.find_element(element_id)?;
        let decoded = self.media.decode(&element.media_id)?;
        if !decoded.kind.has_audio() {
            return Err(PipelineError::NoAudioExtractable);
        }

        let segment = extract_segment(
            &decoded.buffer,
            element.trim_start,
            element.effective_duration(),
        );
        self.transcribe_buffer(segment, model_id).await
    }

    /// Export one completed transcript as an SRT file named after a track.
    ///
    /// The file lands in the configured export directory, falling back to the
    /// application data directory. Returns the written path.
    pub fn export_subtitles(
        &self,
        transcript_id: &str,
        track_id: &str,
    ) -> Result<PathBuf, PipelineError> {
        let record = self
            .orchestrator
            .transcripts()
            .into_iter()
            .find(|r| r.id == transcript_id)
            .ok_or_else(|| PipelineError::UnknownTranscript(transcript_id.to_string()))?;
        let track = self.timeline.track(track_id)?;

        let directory = self.export_directory()?;
        fs::create_dir_all(&directory)?;

        let path = directory.join(subtitle_filename(&track.name));
        fs::write(&path, to_srt(&record.transcript))?;

        info!(path = ?path, transcript = transcript_id, "Exported subtitles");
        Ok(path)
    }

    pub fn transcripts(&self) -> Vec<TranscriptRecord> {
        self.orchestrator.transcripts()
    }

    pub fn remove_transcript(&self, id: &str) -> bool {
        self.orchestrator.remove_transcript(id)
    }

    pub fn clear_transcripts(&self) {
        self.orchestrator.clear_transcripts();
    }

    /// The synthesizer's voice catalog, empty when none is attached.
    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.synthesizer
            .as_ref()
            .map(|s| s.voices())
            .unwrap_or_default()
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SynthesizedAudio, PipelineError> {
        let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
            PipelineError::Synthesis("no speech synthesizer configured".to_string())
        })?;
        synthesizer.synthesize(text, voice_id).await
    }

    /// Resample to the engine rate and submit, filling model/task/language
    /// from the configuration where the caller left them open.
    async fn transcribe_buffer(
        &self,
        buffer: PcmBuffer,
        model_id: Option<&str>,
    ) -> Result<Arc<Transcript>, PipelineError> {
        let (sample_rate, default_model, task, language) = {
            let config = self.config.read();
            let task = match config.model.task.as_str() {
                "translate" => EngineTask::Translate,
                _ => EngineTask::Transcribe,
            };
            let language = match config.model.language.as_str() {
                "auto" | "" => None,
                code => Some(code.to_string()),
            };
            (
                config.engine.sample_rate,
                config.model.default_model.clone(),
                task,
                language,
            )
        };

        let audio = resample(buffer, sample_rate);
        let model_id = model_id.unwrap_or(&default_model);
        self.orchestrator
            .submit(audio, model_id, task, language)
            .await
    }

    fn find_element(&self, element_id: &str) -> Result<TimelineElement, PipelineError> {
        self.timeline
            .tracks()
            .into_iter()
            .flat_map(|t| t.elements)
            .find(|e| e.id == element_id)
            .ok_or_else(|| PipelineError::Timeline(format!("unknown element: {element_id}")))
    }

    fn export_directory(&self) -> Result<PathBuf, PipelineError> {
        let configured = self.config.read().export.directory.clone();
        if !configured.is_empty() {
            return Ok(PathBuf::from(configured));
        }
        self.config_store
            .as_ref()
            .map(|s| s.data_dir())
            .ok_or_else(|| PipelineError::Config("no export directory configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    use async_trait::async_trait;

    use crate::adapters::{InMemoryMediaStore, InMemoryTimelineStore};
    use crate::domain::transcript::{RawChunk, RawTranscription};
    use crate::domain::{MediaKind, Track};
    use crate::ports::engine::{
        EngineEventSender, EngineMetadata, InferenceOptions, ModelHandle, ModelSpec,
    };

    const SR: u32 = 16_000;

    struct StaticHandle(String);

    impl ModelHandle for StaticHandle {
        fn model_id(&self) -> &str {
            &self.0
        }
        fn dispose(self: Box<Self>) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    /// Engine returning a fixed transcription, recording the audio and
    /// options it saw.
    struct StaticEngine {
        output: RawTranscription,
        seen: parking_lot::Mutex<Vec<PcmBuffer>>,
        seen_options: parking_lot::Mutex<Vec<InferenceOptions>>,
    }

    impl StaticEngine {
        fn new(output: RawTranscription) -> Self {
            Self {
                output,
                seen: parking_lot::Mutex::new(Vec::new()),
                seen_options: parking_lot::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpeechEngine for StaticEngine {
        fn metadata(&self) -> Option<EngineMetadata> {
            Some(EngineMetadata {
                feature_size: 80,
                max_position_embeddings: 448,
            })
        }

        async fn load_model(
            &self,
            spec: &ModelSpec,
            _events: EngineEventSender,
        ) -> Result<Box<dyn ModelHandle>, PipelineError> {
            Ok(Box::new(StaticHandle(spec.model_id.clone())))
        }

        async fn transcribe(
            &self,
            _model: &dyn ModelHandle,
            audio: &PcmBuffer,
            options: &InferenceOptions,
            _events: EngineEventSender,
        ) -> Result<RawTranscription, PipelineError> {
            self.seen.lock().push(audio.clone());
            self.seen_options.lock().push(options.clone());
            Ok(self.output.clone())
        }
    }

    struct AlwaysCpu;

    impl BackendProbe for AlwaysCpu {
        fn accelerated_available(&self) -> bool {
            false
        }
        fn fallback_available(&self) -> bool {
            true
        }
    }

    fn two_chunk_output() -> RawTranscription {
        RawTranscription {
            text: "hello world goodbye".to_string(),
            chunks: vec![
                RawChunk {
                    timestamp: (0.0, Some(2.0)),
                    text: "hello world".to_string(),
                    words: None,
                },
                RawChunk {
                    timestamp: (2.5, Some(4.0)),
                    text: "goodbye".to_string(),
                    words: None,
                },
            ],
            words: None,
            language: Some("en".to_string()),
        }
    }

    struct Fixture {
        media: Arc<InMemoryMediaStore>,
        timeline: Arc<InMemoryTimelineStore>,
        engine: Arc<StaticEngine>,
    }

    fn controller(output: RawTranscription) -> (PipelineController, Fixture) {
        let media = Arc::new(InMemoryMediaStore::new());
        let timeline = Arc::new(InMemoryTimelineStore::new());
        let engine = Arc::new(StaticEngine::new(output));

        let controller = PipelineController::with_config(
            AppConfig::new(),
            Arc::clone(&media) as Arc<dyn MediaStore>,
            Arc::clone(&timeline) as Arc<dyn TimelineStore>,
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            Arc::new(AlwaysCpu),
        );

        (
            controller,
            Fixture {
                media,
                timeline,
                engine,
            },
        )
    }

    fn audio_element(id: &str, media_id: &str, start: f64, duration: f64) -> TimelineElement {
        TimelineElement {
            id: id.to_string(),
            name: id.to_string(),
            start_time: start,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            media_id: media_id.to_string(),
        }
    }

    fn seed_track(fixture: &Fixture, start: f64) -> String {
        fixture.media.insert(
            "m1",
            MediaKind::Audio,
            PcmBuffer::mono(vec![0.3; (SR * 5) as usize], SR),
        );
        fixture.timeline.insert_track(Track {
            id: "t1".to_string(),
            name: "Narration".to_string(),
            elements: vec![audio_element("e1", "m1", start, 5.0)],
        });
        "t1".to_string()
    }

    #[tokio::test]
    async fn test_caption_track_creates_offset_captions() {
        let (controller, fixture) = controller(two_chunk_output());
        let track_id = seed_track(&fixture, 10.0);

        let caption_track_id = controller
            .caption_track(&track_id, None, Granularity::Sentence)
            .await
            .unwrap();

        let track = fixture.timeline.track(&caption_track_id).unwrap();
        assert_eq!(track.name, "Narration captions");
        assert_eq!(track.elements.len(), 2);
        // Transcript zero is re-anchored to the element's track position.
        assert!((track.elements[0].start_time - 10.0).abs() < 1e-9);
        assert!((track.elements[0].duration - 2.0).abs() < 1e-9);
        assert_eq!(track.elements[0].name, "hello world");
        assert!((track.elements[1].start_time - 12.5).abs() < 1e-9);
        assert!((track.elements[1].duration - 1.5).abs() < 1e-9);

        assert_eq!(controller.transcripts().len(), 1);
    }

    #[tokio::test]
    async fn test_caption_track_without_audio_fails() {
        let (controller, fixture) = controller(two_chunk_output());
        fixture.timeline.insert_track(Track {
            id: "t1".to_string(),
            name: "Empty".to_string(),
            elements: vec![],
        });

        let err = controller
            .caption_track("t1", None, Granularity::Sentence)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::NoAudioExtractable);
    }

    #[tokio::test]
    async fn test_unknown_track_is_timeline_error() {
        let (controller, _fixture) = controller(two_chunk_output());
        let err = controller
            .caption_track("missing", None, Granularity::Sentence)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeline(_)));
    }

    #[tokio::test]
    async fn test_transcribe_element_respects_trims() {
        let (controller, fixture) = controller(two_chunk_output());
        fixture.media.insert(
            "m1",
            MediaKind::Audio,
            PcmBuffer::mono(vec![0.3; (SR * 10) as usize], SR),
        );
        fixture.timeline.insert_track(Track {
            id: "t1".to_string(),
            name: "Clips".to_string(),
            elements: vec![TimelineElement {
                id: "e1".to_string(),
                name: "clip".to_string(),
                start_time: 0.0,
                duration: 10.0,
                trim_start: 2.0,
                trim_end: 5.0,
                media_id: "m1".to_string(),
            }],
        });

        let transcript = controller.transcribe_element("e1", None).await.unwrap();
        assert_eq!(transcript.chunks.len(), 2);

        // 10s element with 2s+5s trimmed leaves a 3s segment.
        let seen = fixture.engine.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), (SR * 3) as usize);
        assert_eq!(seen[0].sample_rate, SR);
    }

    #[tokio::test]
    async fn test_transcribe_element_resamples_to_engine_rate() {
        let (controller, fixture) = controller(two_chunk_output());
        fixture.media.insert(
            "m1",
            MediaKind::Audio,
            PcmBuffer::mono(vec![0.3; 48_000], 48_000),
        );
        fixture.timeline.insert_track(Track {
            id: "t1".to_string(),
            name: "Clips".to_string(),
            elements: vec![audio_element("e1", "m1", 0.0, 1.0)],
        });

        controller.transcribe_element("e1", None).await.unwrap();

        let seen = fixture.engine.seen.lock();
        assert_eq!(seen[0].sample_rate, SR);
        assert_eq!(seen[0].len(), SR as usize);
    }

    #[tokio::test]
    async fn test_transcribe_element_rejects_silent_media_kinds() {
        let (controller, fixture) = controller(two_chunk_output());
        fixture.media.insert(
            "img",
            MediaKind::Image,
            PcmBuffer::mono(vec![0.5; 100], SR),
        );
        fixture.timeline.insert_track(Track {
            id: "t1".to_string(),
            name: "Stills".to_string(),
            elements: vec![audio_element("e1", "img", 0.0, 1.0)],
        });

        let err = controller.transcribe_element("e1", None).await.unwrap_err();
        assert_eq!(err, PipelineError::NoAudioExtractable);
    }

    #[tokio::test]
    async fn test_export_subtitles_writes_named_file() {
        let (controller, fixture) = controller(two_chunk_output());
        let track_id = seed_track(&fixture, 0.0);

        let export_dir = env::temp_dir().join("scribeline_export_test");
        let _ = fs::remove_dir_all(&export_dir);
        let mut config = controller.config();
        config.export.directory = export_dir.to_string_lossy().into_owned();
        controller.update_config(config).unwrap();

        controller
            .caption_track(&track_id, None, Granularity::Sentence)
            .await
            .unwrap();
        let transcript_id = controller.transcripts()[0].id.clone();

        let path = controller.export_subtitles(&transcript_id, &track_id).unwrap();
        assert!(path.ends_with("Narration_subtitles.srt"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("1\n00:00:00,000 --> 00:00:02,000\nhello world\n"));
        assert!(content.contains("goodbye"));

        let _ = fs::remove_dir_all(&export_dir);
    }

    #[tokio::test]
    async fn test_export_unknown_transcript_fails() {
        let (controller, fixture) = controller(two_chunk_output());
        let track_id = seed_track(&fixture, 0.0);

        let err = controller
            .export_subtitles("missing", &track_id)
            .unwrap_err();
        assert_eq!(err, PipelineError::UnknownTranscript("missing".to_string()));
    }

    #[tokio::test]
    async fn test_synthesize_without_synthesizer_fails() {
        let (controller, _fixture) = controller(two_chunk_output());
        assert!(controller.voices().is_empty());

        let err = controller.synthesize("hello", "voice-1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_synthesize_delegates_to_synthesizer() {
        struct FixedVoice;

        #[async_trait]
        impl SpeechSynthesizer for FixedVoice {
            fn voices(&self) -> Vec<VoiceInfo> {
                vec![VoiceInfo {
                    id: "voice-1".to_string(),
                    name: "Test Voice".to_string(),
                    locale: "en-US".to_string(),
                    gender: "neutral".to_string(),
                }]
            }

            async fn synthesize(
                &self,
                text: &str,
                _voice_id: &str,
            ) -> Result<SynthesizedAudio, PipelineError> {
                Ok(SynthesizedAudio {
                    buffer: PcmBuffer::mono(vec![0.0; 100], SR),
                    text: text.to_string(),
                })
            }
        }

        let (controller, _fixture) = controller(two_chunk_output());
        let controller = controller.with_synthesizer(Arc::new(FixedVoice));

        assert_eq!(controller.voices().len(), 1);
        let audio = controller.synthesize("hello", "voice-1").await.unwrap();
        assert_eq!(audio.text, "hello");
        assert_eq!(audio.buffer.len(), 100);
    }

    #[tokio::test]
    async fn test_update_config_changes_model_default() {
        let (controller, fixture) = controller(two_chunk_output());
        let track_id = seed_track(&fixture, 0.0);

        let mut config = controller.config();
        config.model.default_model = "whisper-base".to_string();
        controller.update_config(config).unwrap();

        controller
            .caption_track(&track_id, None, Granularity::Sentence)
            .await
            .unwrap();
        assert_eq!(controller.transcripts()[0].model_id, "whisper-base");
    }

    #[tokio::test]
    async fn test_update_config_changes_window_geometry() {
        let (controller, fixture) = controller(two_chunk_output());
        let track_id = seed_track(&fixture, 0.0);

        let mut config = controller.config();
        config.engine.chunk_length_secs = 12.0;
        config.engine.stride_length_secs = 2.0;
        controller.update_config(config).unwrap();

        controller
            .caption_track(&track_id, None, Granularity::Sentence)
            .await
            .unwrap();

        let seen = fixture.engine.seen_options.lock();
        assert_eq!(seen.len(), 1);
        assert!((seen[0].chunk_length_secs - 12.0).abs() < 1e-9);
        assert!((seen[0].stride_length_secs - 2.0).abs() < 1e-9);
    }
}
