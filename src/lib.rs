#![forbid(unsafe_code)]

//! Audio-to-caption pipeline for timeline-based editors.
//!
//! Composes a track's audio into one mono stream, transcribes it through a
//! swappable speech engine behind a cancellable worker, and projects the
//! transcript back onto the timeline as non-overlapping caption elements.
//! Hosts embed [`app::PipelineController`] and supply the engine, media, and
//! timeline ports; in-memory adapters back the stores for tests and
//! self-contained embeddings.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::PipelineController;
pub use domain::{PipelineError, Transcript};
