//! Background media-processing queue.
//!
//! A [`JobQueueManager`] owns an ordered list of jobs and a single worker
//! that drains them one at a time: download the track's source, run the
//! media processor, upload derived files, write results through the
//! [`TrackStatusProjection`].

pub mod config;
mod dispatch;
pub mod error;
pub mod job_store;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod projection;

#[cfg(test)]
mod test_support;

pub use config::QueueConfig;
pub use error::{ErrorKind, JobError, JobResult, QueueError, QueueResult};
pub use job_store::JobStore;
pub use logging::JobLogger;
pub use manager::JobQueueManager;
pub use projection::{
    InMemoryTrackStore, ProjectionError, ProjectionResult, TrackStatusProjection,
};
