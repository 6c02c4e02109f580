use serde::{Deserialize, Serialize};

/// Kind of media a timeline element references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
    Image,
}

impl MediaKind {
    /// Whether this media kind carries a decodable audio stream.
    pub fn has_audio(&self) -> bool {
        matches!(self, MediaKind::Audio | MediaKind::Video)
    }
}

/// An element placed on a timeline track.
///
/// Times are in seconds in track coordinates. The audible span is
/// `duration - trim_start - trim_end`; elements with a non-positive span are
/// not eligible for audio extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineElement {
    pub id: String,
    pub name: String,
    /// Position of the element on the track, in seconds.
    pub start_time: f64,
    /// Nominal duration in seconds, before trims.
    pub duration: f64,
    /// Seconds trimmed from the head of the underlying media.
    pub trim_start: f64,
    /// Seconds trimmed from the tail of the underlying media.
    pub trim_end: f64,
    /// Reference into the media store.
    pub media_id: String,
}

impl TimelineElement {
    /// Audible span after trims, in seconds.
    pub fn effective_duration(&self) -> f64 {
        self.duration - self.trim_start - self.trim_end
    }

    /// End of the audible span in track coordinates.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.effective_duration()
    }
}

/// A timeline track holding ordered elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub elements: Vec<TimelineElement>,
}

/// A caption text element derived from a transcript chunk or word.
///
/// `start_time` is absolute in track coordinates (timeline offset plus the
/// transcript-relative timestamp); `duration` is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionElement {
    pub text: String,
    pub start_time: f64,
    pub duration: f64,
}
