//! FFmpeg-based media processing for uploaded tracks.
//!
//! This crate provides:
//! - A command builder and runner with timeouts
//! - FFprobe metadata for audio and video files
//! - Waveform envelopes and peaks from decoded PCM
//! - MP3 extraction and H.264 transcoding
//! - The [`MediaProcessor`] seam used by the job queue

pub mod command;
pub mod config;
pub mod error;
pub mod probe;
pub mod processor;
pub mod progress;
pub mod transcode;
pub mod waveform;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use processor::{
    DerivedArtifacts, FfmpegMediaProcessor, MediaKind, MediaMetadata, MediaProcessor, ProcessPlan,
};
pub use waveform::{compute_envelope, downsample_peaks, Waveform};
