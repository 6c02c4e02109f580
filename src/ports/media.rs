use crate::domain::extraction::DecodedMedia;
use crate::domain::PipelineError;

/// Port for media lookup: element references resolve to a decodable source
/// and its kind.
///
/// Decoding is synchronous and runs to completion; sources are assumed to be
/// already-demuxed PCM. Container demuxing is out of scope.
pub trait MediaStore: Send + Sync {
    /// Decode the referenced media into linear PCM, reporting its kind.
    fn decode(&self, media_id: &str) -> Result<DecodedMedia, PipelineError>;
}
