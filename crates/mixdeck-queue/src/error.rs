//! Queue error types.

use mixdeck_media::MediaError;
use mixdeck_models::TrackId;
use mixdeck_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

use crate::projection::ProjectionError;

pub type QueueResult<T> = Result<T, QueueError>;
pub type JobResult<T> = Result<T, JobError>;

/// Error classes reported to callers and recorded in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Storage credentials or bucket missing
    Configuration,
    /// Rejected input (MIME type, size, malformed reference, missing source)
    Validation,
    /// Referenced track, job or object does not exist
    NotFound,
    /// Network or transfer failure
    Storage,
    /// Media could not be decoded or transcoded
    Processing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
            ErrorKind::Processing => "processing",
        }
    }
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    if err.is_configuration() {
        ErrorKind::Configuration
    } else if err.is_validation() {
        ErrorKind::Validation
    } else if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Storage
    }
}

/// Errors returned synchronously by the queue API.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid track id: {0:?}")]
    InvalidTrackId(String),

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Track projection error: {0}")]
    Projection(#[from] ProjectionError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::InvalidTrackId(_) => ErrorKind::Validation,
            QueueError::TrackNotFound(_) => ErrorKind::NotFound,
            QueueError::Projection(_) => ErrorKind::Storage,
        }
    }
}

/// Errors raised while handling a single job. Recorded on the job and track.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Track {track_id} has no {field}")]
    MissingSource {
        track_id: TrackId,
        field: &'static str,
    },

    #[error("Processing produced no {0}")]
    MissingArtifact(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Processing error: {0}")]
    Media(#[from] MediaError),

    #[error("Track projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    pub fn missing_source(track_id: &TrackId, field: &'static str) -> Self {
        Self::MissingSource {
            track_id: track_id.clone(),
            field,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::TrackNotFound(_) => ErrorKind::NotFound,
            JobError::MissingSource { .. } => ErrorKind::Validation,
            JobError::MissingArtifact(_) | JobError::Media(_) | JobError::Panicked(_) => {
                ErrorKind::Processing
            }
            JobError::Storage(e) => storage_kind(e),
            JobError::Projection(_) | JobError::Scratch(_) => ErrorKind::Storage,
        }
    }
}
