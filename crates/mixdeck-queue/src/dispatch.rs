//! Per-job-type handlers.
//!
//! Jobs fail up front when storage is not configured. Otherwise each handler
//! downloads its source into a per-job scratch directory, runs
//! the media processor, uploads derived files and returns the track update
//! to write. The scratch directory is removed however the handler exits.

use std::path::{Path, PathBuf};

use mixdeck_media::{DerivedArtifacts, MediaProcessor, ProcessPlan};
use mixdeck_models::{Job, JobType, ProcessingStatus, Track, TrackUpdate};
use mixdeck_storage::{content_type_for_path, MediaStore, StorageError};
use tracing::warn;

use crate::config::QueueConfig;
use crate::error::{JobError, JobResult};
use crate::logging::JobLogger;
use crate::projection::TrackStatusProjection;

/// Collaborators a handler needs.
pub(crate) struct JobContext<'a> {
    pub config: &'a QueueConfig,
    pub projection: &'a dyn TrackStatusProjection,
    pub store: &'a dyn MediaStore,
    pub processor: &'a dyn MediaProcessor,
    pub logger: &'a JobLogger,
}

/// Run one job and return the update describing its result.
pub(crate) async fn run_job(ctx: &JobContext<'_>, job: &Job) -> JobResult<TrackUpdate> {
    let track = ctx
        .projection
        .read_track(&job.track_id)
        .await?
        .ok_or_else(|| JobError::TrackNotFound(job.track_id.clone()))?;

    if !ctx.store.is_configured() {
        let err = StorageError::not_configured("object storage credentials or bucket missing");
        return Err(err.into());
    }

    tokio::fs::create_dir_all(&ctx.config.work_dir).await?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("{}-", job.id))
        .tempdir_in(&ctx.config.work_dir)?;

    let result = match job.job_type {
        JobType::FullProcessing => full_processing(ctx, job, &track, scratch.path()).await,
        JobType::WaveformGeneration => waveform_generation(ctx, &track, scratch.path()).await,
        JobType::AudioExtraction => audio_extraction(ctx, job, &track, scratch.path()).await,
        JobType::VideoTranscode => video_transcode(ctx, job, &track, scratch.path()).await,
    };

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(path = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
    }

    result
}

async fn full_processing(
    ctx: &JobContext<'_>,
    job: &Job,
    track: &Track,
    scratch: &Path,
) -> JobResult<TrackUpdate> {
    let url = track
        .video_source()
        .ok_or_else(|| JobError::missing_source(&track.id, "original_video_url"))?;

    let input = download(ctx, url, scratch).await?;
    let artifacts = ctx
        .processor
        .process(
            &input,
            declared_mime(&input, "video/mp4"),
            &ProcessPlan::full(scratch.join("derived")),
        )
        .await?;

    let mut update =
        completed(&artifacts).waveform(artifacts.waveform_data, artifacts.waveform_peaks);
    if let Some(path) = &artifacts.extracted_audio {
        update = update.processed_audio_url(upload_derived(ctx, job, path).await?);
    }
    if let Some(path) = &artifacts.transcoded_video {
        update = update.transcoded_video_url(upload_derived(ctx, job, path).await?);
    }
    Ok(update)
}

async fn waveform_generation(
    ctx: &JobContext<'_>,
    track: &Track,
    scratch: &Path,
) -> JobResult<TrackUpdate> {
    let url = track
        .audio_source()
        .ok_or_else(|| JobError::missing_source(&track.id, "audio_url"))?;

    let input = download(ctx, url, scratch).await?;

    let probed_duration = match ctx.processor.read_metadata(&input).await {
        Ok(metadata) => metadata.duration_seconds,
        Err(e) => {
            ctx.logger
                .log_warning(&format!("could not read metadata: {}", e));
            None
        }
    };

    let artifacts = ctx
        .processor
        .process(
            &input,
            declared_mime(&input, "audio/mpeg"),
            &ProcessPlan::analysis_only(scratch.join("derived")),
        )
        .await?;

    let duration = probed_duration.or(artifacts.duration_seconds);
    Ok(completed(&artifacts)
        .waveform(artifacts.waveform_data, artifacts.waveform_peaks)
        .duration_seconds(duration))
}

async fn audio_extraction(
    ctx: &JobContext<'_>,
    job: &Job,
    track: &Track,
    scratch: &Path,
) -> JobResult<TrackUpdate> {
    let url = track
        .video_source()
        .ok_or_else(|| JobError::missing_source(&track.id, "original_video_url"))?;

    let input = download(ctx, url, scratch).await?;
    let artifacts = ctx
        .processor
        .process(
            &input,
            declared_mime(&input, "video/mp4"),
            &ProcessPlan::analysis_only(scratch.join("derived")).with_extract_audio(true),
        )
        .await?;

    let audio = artifacts
        .extracted_audio
        .as_deref()
        .ok_or(JobError::MissingArtifact("extracted audio"))?;
    let audio_url = upload_derived(ctx, job, audio).await?;

    Ok(completed(&artifacts)
        .processed_audio_url(audio_url)
        .waveform(artifacts.waveform_data, artifacts.waveform_peaks))
}

async fn video_transcode(
    ctx: &JobContext<'_>,
    job: &Job,
    track: &Track,
    scratch: &Path,
) -> JobResult<TrackUpdate> {
    let url = track
        .video_source()
        .ok_or_else(|| JobError::missing_source(&track.id, "original_video_url"))?;

    let input = download(ctx, url, scratch).await?;
    let artifacts = ctx
        .processor
        .process(
            &input,
            declared_mime(&input, "video/mp4"),
            &ProcessPlan::analysis_only(scratch.join("derived")).with_transcode_video(true),
        )
        .await?;

    let video = artifacts
        .transcoded_video
        .as_deref()
        .ok_or(JobError::MissingArtifact("transcoded video"))?;
    let video_url = upload_derived(ctx, job, video).await?;

    Ok(completed(&artifacts).transcoded_video_url(video_url))
}

async fn download(ctx: &JobContext<'_>, url: &str, scratch: &Path) -> JobResult<PathBuf> {
    ctx.logger.log_progress("downloading source");
    let path = ctx.store.download_to(url, &scratch.join("source")).await?;
    ctx.logger.log_progress("processing media");
    Ok(path)
}

async fn upload_derived(ctx: &JobContext<'_>, job: &Job, path: &Path) -> JobResult<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(JobError::MissingArtifact("derived file name"))?;
    let key = ctx
        .config
        .derived_key(job.track_id.as_str(), job.id.as_str(), file_name);

    ctx.logger.log_progress(&format!("uploading {}", key));
    let url = ctx
        .store
        .upload_path(path, &key, content_type_for_path(path))
        .await?;
    Ok(url)
}

/// Base update for a successful job: `completed`, error cleared, duration.
fn completed(artifacts: &DerivedArtifacts) -> TrackUpdate {
    TrackUpdate::new()
        .status(ProcessingStatus::Completed)
        .clear_error()
        .duration_seconds(artifacts.duration_seconds)
}

/// MIME type to hand the processor: the file's own type when it has the
/// expected top-level type, otherwise `fallback`.
fn declared_mime(path: &Path, fallback: &'static str) -> &'static str {
    let mime = content_type_for_path(path);
    if mime.split('/').next() == fallback.split('/').next() {
        mime
    } else {
        fallback
    }
}
