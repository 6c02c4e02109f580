use crate::domain::{CaptionElement, PipelineError, Track};

/// Port for timeline store access.
///
/// Read access to tracks and elements; write access is limited to creating
/// a track and adding caption elements to it.
pub trait TimelineStore: Send + Sync {
    /// All tracks, in display order.
    fn tracks(&self) -> Vec<Track>;

    /// Look up one track by id.
    fn track(&self, track_id: &str) -> Result<Track, PipelineError>;

    /// Create a new empty track, returning its id.
    fn create_track(&self, name: &str) -> Result<String, PipelineError>;

    /// Append a caption element to a track.
    fn add_caption(&self, track_id: &str, element: CaptionElement) -> Result<(), PipelineError>;
}
