//! Media processing configuration.

use std::time::Duration;

/// Tunables for analysis and encoding.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Envelope resolution (points in `waveform_data`)
    pub waveform_points: usize,
    /// Compact peak resolution (points in `waveform_peaks`)
    pub peak_points: usize,
    /// Sample rate used when decoding audio for analysis (mono)
    pub analysis_sample_rate: u32,
    /// Upper bound for a single FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Bitrate of the extracted MP3 stream
    pub audio_bitrate: String,
    /// x264 quality for transcoded video
    pub video_crf: u8,
    /// x264 preset for transcoded video
    pub video_preset: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            waveform_points: 100,
            peak_points: 50,
            analysis_sample_rate: 8000,
            ffmpeg_timeout: Duration::from_secs(1800), // 30 minutes
            audio_bitrate: "192k".to_string(),
            video_crf: 23,
            video_preset: "veryfast".to_string(),
        }
    }
}

impl MediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            waveform_points: std::env::var("MEDIA_WAVEFORM_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.waveform_points),
            peak_points: std::env::var("MEDIA_PEAK_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.peak_points),
            analysis_sample_rate: std::env::var("MEDIA_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.analysis_sample_rate),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("MEDIA_FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.ffmpeg_timeout.as_secs()),
            ),
            audio_bitrate: std::env::var("MEDIA_AUDIO_BITRATE")
                .unwrap_or(defaults.audio_bitrate),
            video_crf: std::env::var("MEDIA_VIDEO_CRF")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.video_crf),
            video_preset: std::env::var("MEDIA_VIDEO_PRESET")
                .unwrap_or(defaults.video_preset),
        }
    }
}
