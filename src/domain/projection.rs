//! Projection of transcript timestamps onto timeline caption elements.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::timeline::CaptionElement;
use crate::domain::transcript::Transcript;

/// Minimum on-screen duration for a sentence caption, in seconds.
const MIN_SENTENCE_SECS: f64 = 1.0;
/// Minimum on-screen duration for a word caption, in seconds.
const MIN_WORD_SECS: f64 = 0.5;
/// Elements clamped below this are dropped instead of emitted degenerate.
const MIN_CLAMPED_SECS: f64 = 0.001;

/// Unit at which transcript timestamps are projected onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    /// One caption per transcript chunk.
    Sentence,
    /// One caption per word.
    Word,
}

/// Convert a transcript into non-overlapping caption elements positioned in
/// track coordinates.
///
/// `timeline_offset_secs` re-anchors the transcript's zero (the start of the
/// extracted audio) to its absolute position on the track.
pub fn project(
    transcript: &Transcript,
    granularity: Granularity,
    timeline_offset_secs: f64,
) -> Vec<CaptionElement> {
    let mut elements: Vec<CaptionElement> = match granularity {
        Granularity::Sentence => transcript
            .chunks
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| CaptionElement {
                text: c.text.trim().to_string(),
                start_time: timeline_offset_secs + c.start_ms as f64 / 1000.0,
                duration: ((c.end_ms.saturating_sub(c.start_ms)) as f64 / 1000.0)
                    .max(MIN_SENTENCE_SECS),
            })
            .collect(),
        Granularity::Word => transcript
            .words()
            .filter(|w| !w.text.trim().is_empty())
            .map(|w| CaptionElement {
                text: w.text.trim().to_string(),
                start_time: timeline_offset_secs + w.start_ms as f64 / 1000.0,
                duration: (w.duration_ms() as f64 / 1000.0).max(MIN_WORD_SECS),
            })
            .collect(),
    };

    let candidates = elements.len();
    elements = resolve_overlaps(elements);

    debug!(
        ?granularity,
        candidates,
        emitted = elements.len(),
        "Projected transcript onto timeline"
    );

    elements
}

/// Clamp overlapping neighbours in a single forward pass.
///
/// Sorted by start time, each element's duration is clamped down to the next
/// element's start. A forward pass never reintroduces an earlier overlap
/// because durations are only ever reduced. Minimum-duration floors can push
/// an element entirely past a close neighbour; such elements would come out
/// with zero or negative length, and are dropped rather than emitted.
pub fn resolve_overlaps(mut elements: Vec<CaptionElement>) -> Vec<CaptionElement> {
    elements.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut output: Vec<CaptionElement> = Vec::with_capacity(elements.len());
    for i in 0..elements.len() {
        let mut current = elements[i].clone();
        if i + 1 < elements.len() {
            let next_start = elements[i + 1].start_time;
            if current.start_time + current.duration > next_start {
                current.duration = next_start - current.start_time;
            }
        }
        if current.duration >= MIN_CLAMPED_SECS {
            output.push(current);
        } else {
            debug!(
                text = %current.text,
                start_time = current.start_time,
                "Dropping caption clamped to degenerate duration"
            );
        }
    }

    output
}
