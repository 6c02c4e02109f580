//! Deterministic audio extraction, resampling, and track composition.

use tracing::{debug, warn};

use crate::domain::audio::PcmBuffer;
use crate::domain::error::PipelineError;
use crate::domain::timeline::{MediaKind, TimelineElement};

/// Headroom target applied when peak normalization kicks in.
const NORMALIZATION_CEILING: f32 = 0.95;

/// A decoded media source with its kind, as returned by a media lookup.
#[derive(Debug, Clone)]
pub struct DecodedMedia {
    pub kind: MediaKind,
    pub buffer: PcmBuffer,
}

/// A composed track mix plus the timeline position of its first sample.
#[derive(Debug, Clone)]
pub struct TrackMix {
    pub buffer: PcmBuffer,
    /// Start time of the earliest contributing element, in track seconds.
    /// Added back to transcript timestamps when re-anchoring captions.
    pub timeline_offset: f64,
}

/// Copy a trimmed sample range out of a decoded source as a mono buffer.
///
/// The range `[round(trim_start * sr), round(trim_start * sr) + round(duration * sr))`
/// is clamped to the source length; a clamped-empty range yields a one-sample
/// silent buffer so extraction is total over any trim configuration. Mono
/// reduction always reads channel 0 of interleaved sources. That is a
/// deliberate simplification kept for determinism, not a down-mix.
pub fn extract_segment(decoded: &PcmBuffer, trim_start_secs: f64, duration_secs: f64) -> PcmBuffer {
    let sr = decoded.sample_rate;
    let channels = decoded.channels.max(1) as usize;
    let frames = decoded.samples.len() / channels;

    let start = (trim_start_secs * sr as f64).round().max(0.0) as usize;
    let count = (duration_secs * sr as f64).round().max(0.0) as usize;
    let start = start.min(frames);
    let end = (start + count).min(frames);

    if end <= start {
        return PcmBuffer::silent(sr);
    }

    let samples: Vec<f32> = (start..end)
        .map(|frame| decoded.samples[frame * channels])
        .collect();

    PcmBuffer::mono(samples, sr)
}

/// Resample a mono buffer to `target_rate` by linear interpolation.
///
/// Identity at matching rates. Otherwise produces `floor(len / ratio)`
/// samples for `ratio = input_rate / target_rate`, interpolating between the
/// two neighbouring source samples and falling back to the left sample when
/// the right one is out of range. Non-band-limited on purpose: adequate as a
/// speech-recognition front end, not for general resampling.
pub fn resample(buffer: PcmBuffer, target_rate: u32) -> PcmBuffer {
    if buffer.sample_rate == target_rate {
        return buffer;
    }

    let ratio = buffer.sample_rate as f64 / target_rate as f64;
    let out_len = (buffer.samples.len() as f64 / ratio).floor() as usize;
    let mut samples = Vec::with_capacity(out_len);

    for j in 0..out_len {
        let src = j as f64 * ratio;
        let i = src.floor() as usize;
        let frac = (src - i as f64) as f32;
        let left = buffer.samples[i];
        let value = match buffer.samples.get(i + 1) {
            Some(&right) => (1.0 - frac) * left + frac * right,
            None => left,
        };
        samples.push(value);
    }

    PcmBuffer::mono(samples, target_rate)
}

/// Mix every audio-bearing element of a track into one continuous mono
/// stream in track coordinates.
///
/// Elements are extracted at their trims and summed sample-wise into a
/// buffer spanning `max(start_time + effective_duration)` at the first
/// decoded segment's sample rate. Elements that fail to decode are skipped
/// with a warning; only zero successes is an error. A final peak pass
/// rescales to 0.95 of full scale when the additive mix clips.
pub fn compose_track(
    elements: &[TimelineElement],
    lookup: impl Fn(&str) -> Result<DecodedMedia, PipelineError>,
) -> Result<TrackMix, PipelineError> {
    let mut eligible: Vec<&TimelineElement> = elements
        .iter()
        .filter(|e| e.effective_duration() > 0.0)
        .collect();
    eligible.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_secs = eligible
        .iter()
        .map(|e| e.end_time())
        .fold(0.0f64, f64::max);

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = 0u32;
    let mut any_mixed = false;
    let mut timeline_offset = f64::INFINITY;

    for element in &eligible {
        let decoded = match lookup(&element.media_id) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(
                    element = %element.id,
                    media = %element.media_id,
                    error = %err,
                    "Skipping element that failed to decode"
                );
                continue;
            }
        };

        if !decoded.kind.has_audio() {
            debug!(element = %element.id, "Skipping element without audio");
            continue;
        }

        let mut segment =
            extract_segment(&decoded.buffer, element.trim_start, element.effective_duration());

        // The first decoded segment fixes the mix rate and allocates the
        // full-length output; later segments are resampled to match.
        if !any_mixed {
            sample_rate = segment.sample_rate;
            let len = (total_secs * sample_rate as f64).round() as usize;
            samples = vec![0.0; len.max(1)];
            any_mixed = true;
        } else if segment.sample_rate != sample_rate {
            segment = resample(segment, sample_rate);
        }

        let offset = (element.start_time * sample_rate as f64).round() as usize;
        for (i, sample) in segment.samples.iter().enumerate() {
            if let Some(slot) = samples.get_mut(offset + i) {
                *slot += sample;
            }
        }

        timeline_offset = timeline_offset.min(element.start_time);
    }

    if !any_mixed {
        return Err(PipelineError::NoAudioExtractable);
    }

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 1.0 {
        let scale = NORMALIZATION_CEILING / peak;
        for sample in &mut samples {
            *sample *= scale;
        }
        debug!(peak, scale, "Normalized track mix");
    }

    Ok(TrackMix {
        buffer: PcmBuffer::mono(samples, sample_rate),
        timeline_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SR: u32 = 100;

    fn element(id: &str, media: &str, start: f64, duration: f64, trim: f64) -> TimelineElement {
        TimelineElement {
            id: id.to_string(),
            name: id.to_string(),
            start_time: start,
            duration,
            trim_start: trim,
            trim_end: 0.0,
            media_id: media.to_string(),
        }
    }

    fn library(items: Vec<(&str, MediaKind, PcmBuffer)>) -> HashMap<String, DecodedMedia> {
        items
            .into_iter()
            .map(|(id, kind, buffer)| (id.to_string(), DecodedMedia { kind, buffer }))
            .collect()
    }

    fn lookup_in(
        library: &HashMap<String, DecodedMedia>,
    ) -> impl Fn(&str) -> Result<DecodedMedia, PipelineError> + '_ {
        move |id| {
            library
                .get(id)
                .cloned()
                .ok_or_else(|| PipelineError::Media(format!("unknown media: {id}")))
        }
    }

    #[test]
    fn test_extract_segment_range() {
        let decoded = PcmBuffer::mono((0..500).map(|i| i as f32).collect(), SR);
        let segment = extract_segment(&decoded, 1.0, 2.0);

        assert_eq!(segment.len(), 200);
        assert_eq!(segment.samples[0], 100.0);
        assert_eq!(segment.samples[199], 299.0);
    }

    #[test]
    fn test_extract_segment_clamps_to_source() {
        let decoded = PcmBuffer::mono(vec![1.0; 100], SR);
        let segment = extract_segment(&decoded, 0.5, 5.0);
        assert_eq!(segment.len(), 50);
    }

    #[test]
    fn test_extract_segment_empty_range_is_silent() {
        let decoded = PcmBuffer::mono(vec![1.0; 100], SR);

        let past_end = extract_segment(&decoded, 10.0, 2.0);
        assert_eq!(past_end.samples, vec![0.0]);

        let zero_duration = extract_segment(&decoded, 0.0, 0.0);
        assert_eq!(zero_duration.samples, vec![0.0]);
    }

    #[test]
    fn test_extract_segment_reads_channel_zero() {
        // Interleaved stereo: channel 0 ascending, channel 1 all -1.
        let mut samples = Vec::new();
        for i in 0..10 {
            samples.push(i as f32);
            samples.push(-1.0);
        }
        let decoded = PcmBuffer {
            samples,
            sample_rate: 10,
            channels: 2,
        };

        let segment = extract_segment(&decoded, 0.0, 1.0);
        assert_eq!(segment.channels, 1);
        assert_eq!(segment.samples, (0..10).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_resample_identity_at_matching_rate() {
        let buffer = PcmBuffer::mono(vec![0.1, 0.2, 0.3], SR);
        let out = resample(buffer.clone(), SR);
        assert_eq!(out, buffer);
    }

    #[test]
    fn test_resample_downsample_by_half() {
        let buffer = PcmBuffer::mono((0..8).map(|i| i as f32).collect(), 8);
        let out = resample(buffer, 4);

        assert_eq!(out.sample_rate, 4);
        assert_eq!(out.len(), 4);
        // Ratio 2: picks every other sample exactly.
        assert_eq!(out.samples, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_resample_interpolates_fractional_indices() {
        let buffer = PcmBuffer::mono(vec![0.0, 1.0], 2);
        let out = resample(buffer, 4);

        assert_eq!(out.len(), 4);
        assert!((out.samples[0] - 0.0).abs() < 1e-6);
        assert!((out.samples[1] - 0.5).abs() < 1e-6);
        // Past the last pair the left sample is used as-is.
        assert!((out.samples[2] - 1.0).abs() < 1e-6);
        assert!((out.samples[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_compose_track_additive_mix() {
        // Element A: 0..5s of 0.25, element B: 3..7s of 0.25, over 7 seconds.
        let library = library(vec![
            ("a", MediaKind::Audio, PcmBuffer::mono(vec![0.25; 500], SR)),
            ("b", MediaKind::Audio, PcmBuffer::mono(vec![0.25; 400], SR)),
        ]);
        let elements = vec![
            element("e1", "a", 0.0, 5.0, 0.0),
            element("e2", "b", 3.0, 4.0, 0.0),
        ];

        let mix = compose_track(&elements, lookup_in(&library)).unwrap();
        assert_eq!(mix.buffer.len(), 700);
        assert!((mix.timeline_offset - 0.0).abs() < 1e-9);

        // [0,3)s: A only, [3,5)s: sum of both, [5,7)s: B only.
        assert!((mix.buffer.samples[100] - 0.25).abs() < 1e-6);
        assert!((mix.buffer.samples[400] - 0.5).abs() < 1e-6);
        assert!((mix.buffer.samples[600] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_compose_track_normalizes_clipping_mix() {
        let library = library(vec![
            ("a", MediaKind::Audio, PcmBuffer::mono(vec![0.8; 100], SR)),
            ("b", MediaKind::Audio, PcmBuffer::mono(vec![0.8; 100], SR)),
        ]);
        let elements = vec![
            element("e1", "a", 0.0, 1.0, 0.0),
            element("e2", "b", 0.0, 1.0, 0.0),
        ];

        let mix = compose_track(&elements, lookup_in(&library)).unwrap();
        let peak = mix.buffer.peak();
        assert!((peak - 0.95).abs() < 1e-4);
    }

    #[test]
    fn test_compose_track_leaves_quiet_mix_unchanged() {
        let library = library(vec![(
            "a",
            MediaKind::Audio,
            PcmBuffer::mono(vec![0.4; 100], SR),
        )]);
        let elements = vec![element("e1", "a", 0.0, 1.0, 0.0)];

        let mix = compose_track(&elements, lookup_in(&library)).unwrap();
        assert!((mix.buffer.peak() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_compose_track_skips_failed_decodes() {
        let library = library(vec![(
            "good",
            MediaKind::Audio,
            PcmBuffer::mono(vec![0.5; 100], SR),
        )]);
        let elements = vec![
            element("e1", "missing", 0.0, 1.0, 0.0),
            element("e2", "good", 1.0, 1.0, 0.0),
        ];

        let mix = compose_track(&elements, lookup_in(&library)).unwrap();
        assert!((mix.timeline_offset - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_compose_track_all_failures_is_error() {
        let library = library(vec![]);
        let elements = vec![element("e1", "missing", 0.0, 1.0, 0.0)];

        let err = compose_track(&elements, lookup_in(&library)).unwrap_err();
        assert_eq!(err, PipelineError::NoAudioExtractable);
    }

    #[test]
    fn test_compose_track_ignores_images_and_dead_trims() {
        let library = library(vec![
            ("img", MediaKind::Image, PcmBuffer::mono(vec![0.9; 100], SR)),
            ("aud", MediaKind::Audio, PcmBuffer::mono(vec![0.5; 100], SR)),
        ]);
        let elements = vec![
            element("e1", "img", 0.0, 1.0, 0.0),
            // Fully trimmed away, not eligible.
            element("e2", "aud", 0.0, 1.0, 1.0),
            element("e3", "aud", 2.0, 1.0, 0.0),
        ];

        let mix = compose_track(&elements, lookup_in(&library)).unwrap();
        assert!((mix.timeline_offset - 2.0).abs() < 1e-9);
        // Track length is governed by e3's end, not the skipped elements.
        assert_eq!(mix.buffer.len(), 300);
    }

    #[test]
    fn test_compose_track_offset_from_earliest_contributor() {
        let library = library(vec![
            ("a", MediaKind::Audio, PcmBuffer::mono(vec![0.1; 200], SR)),
        ]);
        let elements = vec![
            element("e1", "a", 4.0, 1.0, 0.0),
            element("e2", "a", 1.5, 1.0, 0.0),
        ];

        let mix = compose_track(&elements, lookup_in(&library)).unwrap();
        assert!((mix.timeline_offset - 1.5).abs() < 1e-9);
    }
}
