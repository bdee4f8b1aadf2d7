//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Storage error: {0}")]
    Storage(#[from] mixdeck_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] mixdeck_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] mixdeck_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
