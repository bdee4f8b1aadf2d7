//! Media processor: local file in, derived artifacts out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::command::FfmpegRunner;
use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_media, MediaInfo};
use crate::transcode::{extract_audio, transcode_video};
use crate::waveform::generate_waveform;

/// How an input file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Classify a declared MIME type. Returns `None` for non-media types.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }
}

/// Which derived files to produce. Audio input ignores both flags.
#[derive(Debug, Clone)]
pub struct ProcessPlan {
    /// Directory derived files are written to
    pub output_dir: PathBuf,
    pub extract_audio: bool,
    pub transcode_video: bool,
}

impl ProcessPlan {
    /// Waveform and duration only.
    pub fn analysis_only(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extract_audio: false,
            transcode_video: false,
        }
    }

    /// Every derived file a video can yield.
    pub fn full(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extract_audio: true,
            transcode_video: true,
        }
    }

    pub fn with_extract_audio(mut self, extract: bool) -> Self {
        self.extract_audio = extract;
        self
    }

    pub fn with_transcode_video(mut self, transcode: bool) -> Self {
        self.transcode_video = transcode;
        self
    }
}

/// Output of [`MediaProcessor::process`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DerivedArtifacts {
    pub waveform_data: Vec<f32>,
    pub waveform_peaks: Vec<f32>,
    pub duration_seconds: Option<f64>,
    /// Local path of the extracted MP3 stream
    pub extracted_audio: Option<PathBuf>,
    /// Local path of the transcoded MP4
    pub transcoded_video: Option<PathBuf>,
}

/// Output of [`MediaProcessor::read_metadata`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaMetadata {
    pub duration_seconds: Option<f64>,
    pub has_audio: bool,
    pub has_video: bool,
}

impl From<&MediaInfo> for MediaMetadata {
    fn from(info: &MediaInfo) -> Self {
        Self {
            duration_seconds: info.duration,
            has_audio: info.has_audio(),
            has_video: info.has_video(),
        }
    }
}

/// Turns a local media file into derived artifacts.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    async fn process(
        &self,
        input: &Path,
        mime_type: &str,
        plan: &ProcessPlan,
    ) -> MediaResult<DerivedArtifacts>;

    async fn read_metadata(&self, path: &Path) -> MediaResult<MediaMetadata>;
}

/// [`MediaProcessor`] backed by the FFmpeg/FFprobe CLIs.
#[derive(Debug, Clone)]
pub struct FfmpegMediaProcessor {
    config: MediaConfig,
    runner: FfmpegRunner,
}

impl FfmpegMediaProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout);
        Self { config, runner }
    }

    pub fn from_env() -> Self {
        Self::new(MediaConfig::from_env())
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }
}

#[async_trait]
impl MediaProcessor for FfmpegMediaProcessor {
    async fn process(
        &self,
        input: &Path,
        mime_type: &str,
        plan: &ProcessPlan,
    ) -> MediaResult<DerivedArtifacts> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let info = match probe_media(input).await {
            Ok(info) => Some(info),
            Err(e) if e.is_tooling() => return Err(e),
            Err(e) => {
                warn!(input = %input.display(), error = %e, "Probe failed, continuing without metadata");
                None
            }
        };

        let kind = match (MediaKind::from_mime(mime_type), &info) {
            (Some(kind), _) => kind,
            (None, Some(info)) if info.has_video() => MediaKind::Video,
            (None, Some(_)) => MediaKind::Audio,
            (None, None) => return Err(MediaError::UnsupportedFormat(mime_type.to_string())),
        };

        if info.as_ref().is_some_and(|i| !i.has_audio()) {
            return Err(MediaError::NoAudio(input.to_path_buf()));
        }

        tokio::fs::create_dir_all(&plan.output_dir).await?;

        let waveform = generate_waveform(
            &self.runner,
            input,
            &plan.output_dir,
            self.config.analysis_sample_rate,
            self.config.waveform_points,
            self.config.peak_points,
        )
        .await?;

        let duration_seconds = info
            .as_ref()
            .and_then(|i| i.duration)
            .or_else(|| waveform.decoded_duration());

        let mut artifacts = DerivedArtifacts {
            waveform_data: waveform.data,
            waveform_peaks: waveform.peaks,
            duration_seconds,
            extracted_audio: None,
            transcoded_video: None,
        };

        if kind == MediaKind::Video {
            if plan.extract_audio {
                artifacts.extracted_audio = Some(
                    extract_audio(&self.runner, input, &plan.output_dir, &self.config.audio_bitrate)
                        .await?,
                );
            }
            if plan.transcode_video {
                artifacts.transcoded_video = Some(
                    transcode_video(
                        &self.runner,
                        input,
                        &plan.output_dir,
                        self.config.video_crf,
                        &self.config.video_preset,
                        duration_seconds,
                    )
                    .await?,
                );
            }
        }

        info!(
            input = %input.display(),
            kind = ?kind,
            duration_seconds = ?artifacts.duration_seconds,
            "Processed media"
        );

        Ok(artifacts)
    }

    async fn read_metadata(&self, path: &Path) -> MediaResult<MediaMetadata> {
        let info = probe_media(path).await?;
        Ok(MediaMetadata::from(&info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{check_ffmpeg, check_ffprobe};
    use std::process::Stdio;
    use tokio::process::Command;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("video/mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("Audio/MPEG"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime("application/octet-stream"), None);
    }

    #[test]
    fn test_plan_builders() {
        let plan = ProcessPlan::analysis_only("/tmp/x").with_transcode_video(true);
        assert!(!plan.extract_audio);
        assert!(plan.transcode_video);
        assert!(ProcessPlan::full("/tmp/x").extract_audio);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let processor = FfmpegMediaProcessor::new(MediaConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let err = processor
            .process(
                &dir.path().join("nope.mp3"),
                "audio/mpeg",
                &ProcessPlan::analysis_only(dir.path()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_audio_round_trip() {
        check_ffmpeg().unwrap();
        check_ffprobe().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let tone = dir.path().join("tone.wav");
        let status = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "lavfi", "-i", "sine=frequency=440:duration=3"])
            .arg(&tone)
            .stdin(Stdio::null())
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let processor = FfmpegMediaProcessor::new(MediaConfig::default());

        let metadata = processor.read_metadata(&tone).await.unwrap();
        assert!(metadata.has_audio);
        assert!(!metadata.has_video);
        assert!((metadata.duration_seconds.unwrap() - 3.0).abs() < 0.1);

        let out = dir.path().join("out");
        let artifacts = processor
            .process(&tone, "audio/wav", &ProcessPlan::full(&out))
            .await
            .unwrap();

        assert_eq!(artifacts.waveform_data.len(), 100);
        assert_eq!(artifacts.waveform_peaks.len(), 50);
        assert!(artifacts.waveform_data.iter().any(|v| *v == 1.0));
        assert!((artifacts.duration_seconds.unwrap() - 3.0).abs() < 0.1);
        // Audio input never yields derived streams.
        assert!(artifacts.extracted_audio.is_none());
        assert!(artifacts.transcoded_video.is_none());
    }
}
