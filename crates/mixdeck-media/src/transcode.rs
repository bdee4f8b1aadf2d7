//! Derived streams: extracted MP3 audio and web-playable H.264 video.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Extract the audio stream of `input` into `<output_dir>/audio.mp3`.
pub async fn extract_audio(
    runner: &FfmpegRunner,
    input: &Path,
    output_dir: &Path,
    bitrate: &str,
) -> MediaResult<PathBuf> {
    let output = output_dir.join("audio.mp3");

    let cmd = FfmpegCommand::new(input, &output)
        .no_video()
        .audio_codec("libmp3lame")
        .audio_bitrate(bitrate);
    runner.run(&cmd).await?;

    info!(input = %input.display(), output = %output.display(), "Extracted audio");
    Ok(output)
}

/// Transcode `input` into `<output_dir>/video.mp4` (H.264 + AAC, faststart).
pub async fn transcode_video(
    runner: &FfmpegRunner,
    input: &Path,
    output_dir: &Path,
    crf: u8,
    preset: &str,
    duration: Option<f64>,
) -> MediaResult<PathBuf> {
    let output = output_dir.join("video.mp4");

    let cmd = FfmpegCommand::new(input, &output)
        .video_codec("libx264")
        .crf(crf)
        .preset(preset)
        .output_args(["-pix_fmt", "yuv420p"])
        // Odd dimensions are rejected by yuv420p.
        .output_args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2"])
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_args(["-movflags", "+faststart"]);

    let total = duration.unwrap_or(0.0);
    runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = format!("{:.1}", progress.percentage(total)),
                speed = progress.speed,
                "Transcoding"
            );
        })
        .await?;

    info!(input = %input.display(), output = %output.display(), "Transcoded video");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::check_ffmpeg;
    use std::process::Stdio;
    use tokio::process::Command;

    async fn make_clip(dir: &Path) -> PathBuf {
        let clip = dir.join("clip.mkv");
        let status = Command::new("ffmpeg")
            .args([
                "-y", "-v", "error",
                "-f", "lavfi", "-i", "testsrc=size=64x48:rate=10:duration=1",
                "-f", "lavfi", "-i", "sine=frequency=440:duration=1",
                "-c:v", "mpeg4", "-c:a", "pcm_s16le", "-shortest",
            ])
            .arg(&clip)
            .stdin(Stdio::null())
            .status()
            .await
            .unwrap();
        assert!(status.success());
        clip
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_extract_and_transcode() {
        check_ffmpeg().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let clip = make_clip(dir.path()).await;
        let runner = FfmpegRunner::new();

        let audio = extract_audio(&runner, &clip, dir.path(), "128k").await.unwrap();
        assert!(audio.ends_with("audio.mp3"));
        assert!(tokio::fs::metadata(&audio).await.unwrap().len() > 0);

        let video = transcode_video(&runner, &clip, dir.path(), 28, "ultrafast", Some(1.0))
            .await
            .unwrap();
        assert!(video.ends_with("video.mp4"));
        assert!(tokio::fs::metadata(&video).await.unwrap().len() > 0);
    }
}
