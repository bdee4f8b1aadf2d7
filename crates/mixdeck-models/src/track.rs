//! Track projection models.
//!
//! Only the subset of the track record that the media pipeline reads or
//! writes lives here. Everything else about a track belongs to the
//! persistence layer.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Processing status mirrored onto the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// A job has been issued and not yet finished
    #[default]
    Pending,
    /// Accepted from stored records. The queue never writes it: a track
    /// stays `pending` while its job runs, and in-flight work shows up in
    /// the job's own status instead.
    Processing,
    /// Derived data is available
    Completed,
    /// The last job failed; see `processing_error`
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Track fields relevant to media processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Track {
    /// Track ID
    pub id: TrackId,

    /// Uploaded audio location
    pub audio_url: String,

    /// Uploaded source video location, for video tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_video_url: Option<String>,

    /// Audio stream extracted from the source video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_audio_url: Option<String>,

    /// Playable rendition of the source video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcoded_video_url: Option<String>,

    /// Coarse amplitude envelope (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform_data: Option<Vec<f32>>,

    /// Downsampled envelope for compact rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform_peaks: Option<Vec<f32>>,

    /// Media duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Processing status
    #[serde(default)]
    pub processing_status: ProcessingStatus,

    /// Last processing failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Track {
    /// Create an audio track with no derived data.
    pub fn new(id: impl Into<TrackId>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            audio_url: audio_url.into(),
            original_video_url: None,
            processed_audio_url: None,
            transcoded_video_url: None,
            waveform_data: None,
            waveform_peaks: None,
            duration_seconds: None,
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the source video URL.
    pub fn with_original_video(mut self, url: impl Into<String>) -> Self {
        self.original_video_url = Some(url.into());
        self
    }

    /// Source audio URL, if non-empty.
    pub fn audio_source(&self) -> Option<&str> {
        Some(self.audio_url.as_str()).filter(|u| !u.trim().is_empty())
    }

    /// Source video URL, if set and non-empty.
    pub fn video_source(&self) -> Option<&str> {
        self.original_video_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
    }

    /// Status snapshot returned to polling clients.
    pub fn processing_snapshot(&self) -> TrackProcessingStatus {
        TrackProcessingStatus {
            status: self.processing_status,
            error: self.processing_error.clone(),
        }
    }

    /// Apply a partial update. Unset fields are left untouched.
    pub fn apply(&mut self, update: &TrackUpdate) {
        if let Some(status) = update.processing_status {
            self.processing_status = status;
        }
        if let Some(ref error) = update.processing_error {
            self.processing_error = error.clone();
        }
        if let Some(ref url) = update.processed_audio_url {
            self.processed_audio_url = Some(url.clone());
        }
        if let Some(ref url) = update.transcoded_video_url {
            self.transcoded_video_url = Some(url.clone());
        }
        if let Some(ref data) = update.waveform_data {
            self.waveform_data = Some(data.clone());
        }
        if let Some(ref peaks) = update.waveform_peaks {
            self.waveform_peaks = Some(peaks.clone());
        }
        if let Some(duration) = update.duration_seconds {
            self.duration_seconds = Some(duration);
        }
        self.updated_at = Utc::now();
    }
}

/// `{status, error?}` view of a track's processing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrackProcessingStatus {
    pub status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial update written through the track projection.
///
/// `processing_error` distinguishes "leave as is" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackUpdate {
    pub processing_status: Option<ProcessingStatus>,
    pub processing_error: Option<Option<String>>,
    pub processed_audio_url: Option<String>,
    pub transcoded_video_url: Option<String>,
    pub waveform_data: Option<Vec<f32>>,
    pub waveform_peaks: Option<Vec<f32>>,
    pub duration_seconds: Option<f64>,
}

impl TrackUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to `pending` with no error.
    pub fn pending() -> Self {
        Self::new().status(ProcessingStatus::Pending).clear_error()
    }

    /// Mark `failed` with the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new()
            .status(ProcessingStatus::Failed)
            .error(message)
    }

    pub fn status(mut self, status: ProcessingStatus) -> Self {
        self.processing_status = Some(status);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.processing_error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.processing_error = Some(None);
        self
    }

    pub fn processed_audio_url(mut self, url: impl Into<String>) -> Self {
        self.processed_audio_url = Some(url.into());
        self
    }

    pub fn transcoded_video_url(mut self, url: impl Into<String>) -> Self {
        self.transcoded_video_url = Some(url.into());
        self
    }

    pub fn waveform(mut self, data: Vec<f32>, peaks: Vec<f32>) -> Self {
        self.waveform_data = Some(data);
        self.waveform_peaks = Some(peaks);
        self
    }

    pub fn duration_seconds(mut self, duration: Option<f64>) -> Self {
        self.duration_seconds = duration;
        self
    }

    /// Drop the status change, keeping derived fields.
    pub fn without_status(mut self) -> Self {
        self.processing_status = None;
        self.processing_error = None;
        self
    }
}
