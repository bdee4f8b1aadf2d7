//! Background processing jobs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::TrackId;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of processing a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// Extract a normalized audio stream from the original video
    AudioExtraction,
    /// Compute duration and waveform from the track audio
    WaveformGeneration,
    /// Transcode the original video into a playable rendition
    VideoTranscode,
    /// Audio extraction, transcode and waveform from the original video
    FullProcessing,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::AudioExtraction,
        JobType::WaveformGeneration,
        JobType::VideoTranscode,
        JobType::FullProcessing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::AudioExtraction => "audio-extraction",
            JobType::WaveformGeneration => "waveform-generation",
            JobType::VideoTranscode => "video-transcode",
            JobType::FullProcessing => "full-processing",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownJobType(pub String);

impl fmt::Display for UnknownJobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job type: {}", self.0)
    }
}

impl std::error::Error for UnknownJobType {}

impl FromStr for JobType {
    type Err = UnknownJobType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownJobType(s.to_string()))
    }
}

/// Job lifecycle state.
///
/// Transitions are monotonic: `pending -> processing -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for the worker
    #[default]
    Pending,
    /// Job is being processed
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of background work tied to one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Track this job processes (non-owning reference)
    pub track_id: TrackId,

    /// Job type
    pub job_type: JobType,

    /// Current state
    #[serde(default)]
    pub status: JobStatus,

    /// Failure message, set only when `status == failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(track_id: TrackId, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            track_id,
            job_type,
            status: JobStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move `pending -> processing`. Returns false if the job was not pending.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
        true
    }

    /// Move `processing -> completed`. Returns false if the job was not processing.
    pub fn complete(&mut self) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.status = JobStatus::Completed;
        self.error = None;
        self.updated_at = Utc::now();
        true
    }

    /// Move `processing -> failed`. Returns false if the job was not processing.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        true
    }
}

/// Counts of live jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_serde_names() {
        let json = serde_json::to_string(&JobType::FullProcessing).unwrap();
        assert_eq!(json, "\"full-processing\"");

        let parsed: JobType = serde_json::from_str("\"waveform-generation\"").unwrap();
        assert_eq!(parsed, JobType::WaveformGeneration);
    }

    #[test]
    fn test_job_type_from_str() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.as_str().parse::<JobType>().unwrap(), job_type);
        }
        assert!("thumbnail".parse::<JobType>().is_err());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = Job::new(TrackId::from("track-1"), JobType::WaveformGeneration);
        assert_eq!(job.status, JobStatus::Pending);

        assert!(job.start());
        assert_eq!(job.status, JobStatus::Processing);
        assert!(!job.start());

        assert!(job.complete());
        assert!(job.is_terminal());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_terminal_job_is_frozen() {
        let mut job = Job::new(TrackId::from("track-1"), JobType::FullProcessing);
        job.start();
        assert!(job.fail("decode error"));
        assert_eq!(job.error.as_deref(), Some("decode error"));

        assert!(!job.complete());
        assert!(!job.fail("again"));
        assert!(!job.start());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("decode error"));
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut job = Job::new(TrackId::from("track-1"), JobType::VideoTranscode);
        assert!(!job.complete());
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_fail_requires_processing() {
        let mut job = Job::new(TrackId::from("track-1"), JobType::WaveformGeneration);
        assert!(!job.fail("never started"));
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error.is_none());

        job.start();
        assert!(job.fail("decode error"));
        assert_eq!(job.status, JobStatus::Failed);
    }
}
