use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single transcribed word with millisecond timestamps.
///
/// Timestamps are relative to the extracted audio segment fed to the engine,
/// never to the original media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TranscriptWord {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// A contiguous, time-stamped span of transcribed text covering one
/// recognition window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub words: Vec<TranscriptWord>,
}

/// A completed transcript. Immutable after construction from engine output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub chunks: Vec<TranscriptChunk>,
    pub language: Option<String>,
    pub total_duration_ms: u64,
}

/// A word as the engine reports it, with second-resolution timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// One recognition-window result in the engine's wire shape.
///
/// `timestamp.1` is `None` while the window is still open; completed output
/// always carries both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    pub timestamp: (f64, Option<f64>),
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<RawWord>>,
}

/// The complete output of one inference call, as streamed back by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTranscription {
    pub text: String,
    pub chunks: Vec<RawChunk>,
    /// Flat word list covering the whole output, when the engine produces
    /// word timings decoupled from its chunking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<RawWord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Where a chunk's word timings come from.
///
/// Engines differ in how much word-level detail they expose, so word
/// population is an explicit ladder rather than ad hoc presence checks.
enum WordSource<'a> {
    /// The chunk carries its own word timings.
    ChunkLevel(&'a [RawWord]),
    /// Only an output-wide flat word list exists.
    FlatList(&'a [RawWord]),
    /// Text only. Words are synthesized by splitting on whitespace.
    TextOnly,
}

impl Transcript {
    /// Normalize raw engine output into the canonical transcript model.
    ///
    /// Each chunk's `[start, end]` seconds pair becomes milliseconds. Word
    /// population falls back gracefully: chunk-level timings, then the flat
    /// word list filtered to the chunk span, then evenly spaced synthetic
    /// words from the chunk text.
    pub fn from_engine_output(id: impl Into<String>, raw: &RawTranscription) -> Self {
        let mut chunks = Vec::with_capacity(raw.chunks.len());

        for raw_chunk in &raw.chunks {
            let start_ms = secs_to_ms(raw_chunk.timestamp.0);
            let end_ms = raw_chunk
                .timestamp
                .1
                .map(secs_to_ms)
                .unwrap_or(start_ms)
                .max(start_ms);

            let source = match (&raw_chunk.words, &raw.words) {
                (Some(words), _) if !words.is_empty() => WordSource::ChunkLevel(words),
                (_, Some(flat)) if !flat.is_empty() => WordSource::FlatList(flat),
                _ => WordSource::TextOnly,
            };

            let words = match source {
                WordSource::ChunkLevel(words) => convert_words(words),
                WordSource::FlatList(flat) => {
                    let within: Vec<&RawWord> = flat
                        .iter()
                        .filter(|w| {
                            let ms = secs_to_ms(w.start);
                            ms >= start_ms && ms <= end_ms
                        })
                        .collect();
                    within
                        .iter()
                        .map(|w| TranscriptWord {
                            text: w.text.clone(),
                            start_ms: secs_to_ms(w.start),
                            end_ms: secs_to_ms(w.end).max(secs_to_ms(w.start)),
                        })
                        .collect()
                }
                WordSource::TextOnly => synthesize_words(&raw_chunk.text, start_ms, end_ms),
            };

            chunks.push(TranscriptChunk {
                text: raw_chunk.text.trim().to_string(),
                start_ms,
                end_ms,
                words,
            });
        }

        chunks.sort_by(|a, b| a.start_ms.cmp(&b.start_ms));
        let total_duration_ms = chunks.iter().map(|c| c.end_ms).max().unwrap_or(0);

        debug!(
            chunks = chunks.len(),
            total_duration_ms, "Normalized engine output"
        );

        Self {
            id: id.into(),
            chunks,
            language: raw.language.clone(),
            total_duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All words across all chunks, in chunk order.
    pub fn words(&self) -> impl Iterator<Item = &TranscriptWord> {
        self.chunks.iter().flat_map(|c| c.words.iter())
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

fn convert_words(words: &[RawWord]) -> Vec<TranscriptWord> {
    words
        .iter()
        .map(|w| {
            let start_ms = secs_to_ms(w.start);
            TranscriptWord {
                text: w.text.clone(),
                start_ms,
                end_ms: secs_to_ms(w.end).max(start_ms),
            }
        })
        .collect()
}

/// Split chunk text on whitespace and give every word an equal, contiguous
/// share of the chunk span. The last word absorbs the integer remainder so
/// the word durations sum exactly to the chunk duration.
fn synthesize_words(text: &str, start_ms: u64, end_ms: u64) -> Vec<TranscriptWord> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let span = end_ms.saturating_sub(start_ms);
    let share = span / tokens.len() as u64;
    let count = tokens.len();

    tokens
        .into_iter()
        .enumerate()
        .map(|(i, token)| {
            let word_start = start_ms + share * i as u64;
            let word_end = if i + 1 == count {
                end_ms
            } else {
                start_ms + share * (i as u64 + 1)
            };
            TranscriptWord {
                text: token.to_string(),
                start_ms: word_start,
                end_ms: word_end,
            }
        })
        .collect()
}
