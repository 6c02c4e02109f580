//! Streaming inference session bookkeeping.
//!
//! Translates the engine's window/token event stream into chunk records, a
//! live-preview text, a tokens-per-second rate, and a progress percentage.

use std::time::Instant;

use tracing::warn;

use crate::ports::engine::EngineEvent;

/// One recognition window's accumulating transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub start_secs: f64,
    /// Stamped when the engine signals the window's end.
    pub end_secs: Option<f64>,
    pub text: String,
    pub finalized: bool,
}

/// A progress snapshot of a running inference.
///
/// Only finalized chunks appear in `chunks`; the still-open window's text is
/// exposed separately as `current_text` for live previews.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceSnapshot {
    pub chunks: Vec<ChunkRecord>,
    pub current_text: Option<String>,
    /// Heuristic percentage in `[0, 95]`; the final 5% is reserved for
    /// post-processing. Not a precise token-count ratio.
    pub progress: u8,
    pub tokens_per_sec: f64,
}

/// Per-job session state fed by [`EngineEvent`]s.
#[derive(Debug, Default)]
pub struct InferenceSession {
    records: Vec<ChunkRecord>,
    window_index: usize,
    tokens_in_window: u64,
    window_first_token: Option<Instant>,
    tokens_per_sec: f64,
}

impl InferenceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one engine event into the session. Returns a fresh snapshot when
    /// the event changed anything observable.
    pub fn on_event(&mut self, event: &EngineEvent) -> Option<InferenceSnapshot> {
        match event {
            EngineEvent::WindowStarted { index, offset_secs } => {
                if let Some(open) = self.records.last_mut() {
                    if !open.finalized {
                        // The engine moved on without closing the window.
                        warn!(
                            start_secs = open.start_secs,
                            "Recognition window superseded before completion"
                        );
                        open.finalized = true;
                    }
                }
                self.records.push(ChunkRecord {
                    start_secs: *offset_secs,
                    end_secs: None,
                    text: String::new(),
                    finalized: false,
                });
                self.window_index = *index;
                self.tokens_in_window = 0;
                self.window_first_token = None;
                Some(self.snapshot())
            }
            EngineEvent::Token { text } => {
                let Some(open) = self.records.last_mut().filter(|r| !r.finalized) else {
                    warn!("Token received outside an open recognition window");
                    return None;
                };
                open.text.push_str(text);

                self.tokens_in_window += 1;
                match self.window_first_token {
                    None => self.window_first_token = Some(Instant::now()),
                    Some(first) => {
                        let elapsed = first.elapsed().as_secs_f64();
                        if elapsed > 0.0 {
                            self.tokens_per_sec = self.tokens_in_window as f64 / elapsed;
                        }
                    }
                }
                Some(self.snapshot())
            }
            EngineEvent::WindowComplete { end_offset_secs } => {
                let Some(open) = self.records.last_mut().filter(|r| !r.finalized) else {
                    warn!("Window completion received with no open window");
                    return None;
                };
                open.end_secs = Some(*end_offset_secs);
                open.finalized = true;
                Some(self.snapshot())
            }
            // Download events belong to model load, not this session.
            EngineEvent::DownloadStarted { .. }
            | EngineEvent::DownloadProgress { .. }
            | EngineEvent::DownloadComplete { .. } => None,
        }
    }

    fn finalized_count(&self) -> usize {
        self.records.iter().filter(|r| r.finalized).count()
    }

    /// Heuristic inference progress: `min(95, window_index * 15 +
    /// finalized_chunks * 5)`, an approximation rather than an exact ratio.
    pub fn progress(&self) -> u8 {
        let value = self.window_index * 15 + self.finalized_count() * 5;
        value.min(95) as u8
    }

    /// Current snapshot: finalized chunks plus the open window's text.
    pub fn snapshot(&self) -> InferenceSnapshot {
        InferenceSnapshot {
            chunks: self
                .records
                .iter()
                .filter(|r| r.finalized)
                .cloned()
                .collect(),
            current_text: self
                .records
                .last()
                .filter(|r| !r.finalized && !r.text.is_empty())
                .map(|r| r.text.clone()),
            progress: self.progress(),
            tokens_per_sec: self.tokens_per_sec,
        }
    }
}
