//! Track status projection: the only path by which the queue reads and
//! writes track records.

mod memory;

pub use memory::InMemoryTrackStore;

use async_trait::async_trait;
use mixdeck_models::{Track, TrackId, TrackUpdate};
use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Track store unavailable: {0}")]
    Unavailable(String),

    #[error("Track write failed: {0}")]
    WriteFailed(String),
}

/// Read/write facade over the persistence layer that owns tracks.
///
/// Writes are partial updates. Writing to a track that does not exist is
/// not an error.
#[async_trait]
pub trait TrackStatusProjection: Send + Sync {
    async fn read_track(&self, id: &TrackId) -> ProjectionResult<Option<Track>>;

    async fn write_processing_result(&self, id: &TrackId, update: TrackUpdate)
        -> ProjectionResult<()>;

    async fn write_failure(&self, id: &TrackId, message: &str) -> ProjectionResult<()> {
        self.write_processing_result(id, TrackUpdate::failed(message))
            .await
    }
}
