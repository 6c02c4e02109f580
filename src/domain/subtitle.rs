//! SRT serialization for transcripts.
//!
//! SRT uses millisecond timing (`HH:MM:SS,mmm`). One block per transcript
//! chunk: 1-based index, timing line, trimmed text, blank-line separated.

use crate::domain::error::PipelineError;
use crate::domain::transcript::Transcript;

/// Format milliseconds as an SRT timestamp (`HH:MM:SS,mmm`).
pub fn format_srt_time(ms: u64) -> String {
    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

/// Serialize a transcript to SRT format.
pub fn to_srt(transcript: &Transcript) -> String {
    let mut output = String::new();

    for (i, chunk) in transcript.chunks.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(chunk.start_ms),
            format_srt_time(chunk.end_ms)
        ));
        output.push_str(chunk.text.trim());
        output.push('\n');
    }

    output
}

/// File name for a track's exported subtitles.
pub fn subtitle_filename(track_name: &str) -> String {
    format!("{}_subtitles.srt", track_name)
}

/// A parsed SRT cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Parse SRT content into cues.
///
/// Lenient about indices (regenerated on write anyway) and line endings.
pub fn parse_srt(content: &str) -> Result<Vec<SrtCue>, PipelineError> {
    let content = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut cues = Vec::new();

    for block in content.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let lines: Vec<&str> = block.lines().collect();
        let Some(timing_idx) = lines.iter().position(|l| l.contains(" --> ")) else {
            continue;
        };

        let (start_ms, end_ms) = parse_timing(lines[timing_idx]).ok_or_else(|| {
            PipelineError::Serialization(format!("invalid SRT timing line: {}", lines[timing_idx]))
        })?;

        let text = lines[timing_idx + 1..].join("\n");
        if !text.is_empty() {
            cues.push(SrtCue {
                start_ms,
                end_ms,
                text,
            });
        }
    }

    Ok(cues)
}

fn parse_timing(line: &str) -> Option<(u64, u64)> {
    let mut parts = line.split(" --> ");
    let start = parse_srt_time(parts.next()?.trim())?;
    let end = parse_srt_time(parts.next()?.trim())?;
    Some((start, end))
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`, period also accepted).
pub fn parse_srt_time(s: &str) -> Option<u64> {
    let s = s.trim().replace(',', ".");
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: u64 = parts[0].parse().ok()?;
    let minutes: u64 = parts[1].parse().ok()?;

    let mut sec_parts = parts[2].split('.');
    let seconds: u64 = sec_parts.next()?.parse().ok()?;
    let millis: u64 = match sec_parts.next() {
        Some(ms) => {
            let val: u64 = ms.parse().ok()?;
            match ms.len() {
                1 => val * 100,
                2 => val * 10,
                _ => val,
            }
        }
        None => 0,
    };

    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis)
}
