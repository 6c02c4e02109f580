//! In-memory media and timeline stores.
//!
//! Back the controller in tests and embeddings that manage their own media;
//! production hosts supply their own store implementations.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::extraction::DecodedMedia;
use crate::domain::{CaptionElement, MediaKind, PcmBuffer, PipelineError, TimelineElement, Track};
use crate::ports::{MediaStore, TimelineStore};

/// Media store over pre-decoded PCM buffers.
#[derive(Default)]
pub struct InMemoryMediaStore {
    items: RwLock<HashMap<String, DecodedMedia>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded source under `media_id`.
    pub fn insert(&self, media_id: impl Into<String>, kind: MediaKind, buffer: PcmBuffer) {
        self.items
            .write()
            .insert(media_id.into(), DecodedMedia { kind, buffer });
    }
}

impl MediaStore for InMemoryMediaStore {
    fn decode(&self, media_id: &str) -> Result<DecodedMedia, PipelineError> {
        self.items
            .read()
            .get(media_id)
            .cloned()
            .ok_or_else(|| PipelineError::Media(format!("unknown media: {media_id}")))
    }
}

/// Timeline store holding tracks in memory. Single-writer by construction:
/// mutation happens only through `create_track` and `add_caption`.
#[derive(Default)]
pub struct InMemoryTimelineStore {
    tracks: RwLock<Vec<Track>>,
    next_id: RwLock<u64>,
}

impl InMemoryTimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a full track, for timelines built outside this store.
    pub fn insert_track(&self, track: Track) {
        self.tracks.write().push(track);
    }
}

impl TimelineStore for InMemoryTimelineStore {
    fn tracks(&self) -> Vec<Track> {
        self.tracks.read().clone()
    }

    fn track(&self, track_id: &str) -> Result<Track, PipelineError> {
        self.tracks
            .read()
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or_else(|| PipelineError::Timeline(format!("unknown track: {track_id}")))
    }

    fn create_track(&self, name: &str) -> Result<String, PipelineError> {
        let mut next_id = self.next_id.write();
        *next_id += 1;
        let id = format!("track-{}", *next_id);

        self.tracks.write().push(Track {
            id: id.clone(),
            name: name.to_string(),
            elements: Vec::new(),
        });

        debug!(track = %id, name, "Created track");
        Ok(id)
    }

    fn add_caption(&self, track_id: &str, element: CaptionElement) -> Result<(), PipelineError> {
        let mut tracks = self.tracks.write();
        let track = tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or_else(|| PipelineError::Timeline(format!("unknown track: {track_id}")))?;

        track.elements.push(TimelineElement {
            id: format!("{}-cap-{}", track_id, track.elements.len() + 1),
            name: element.text.clone(),
            start_time: element.start_time,
            duration: element.duration,
            trim_start: 0.0,
            trim_end: 0.0,
            media_id: String::new(),
        });

        Ok(())
    }
}
