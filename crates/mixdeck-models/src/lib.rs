//! Shared data models for the Mixdeck media pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Background jobs and their lifecycle
//! - The track fields the pipeline reads and writes
//! - Status and queue statistics returned to callers

pub mod job;
pub mod track;

// Re-export common types
pub use job::{Job, JobId, JobStatus, JobType, QueueStats, UnknownJobType};
pub use track::{ProcessingStatus, Track, TrackId, TrackProcessingStatus, TrackUpdate};
