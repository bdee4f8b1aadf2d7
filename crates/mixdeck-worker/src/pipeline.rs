//! Wiring of the concrete storage client and FFmpeg processor into a queue.

use std::sync::Arc;

use mixdeck_media::{check_ffmpeg, check_ffprobe, FfmpegMediaProcessor};
use mixdeck_queue::{JobQueueManager, TrackStatusProjection};
use mixdeck_storage::ObjectStorageClient;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};

/// Build a queue backed by R2 storage and the FFmpeg CLI.
///
/// Missing storage credentials or FFmpeg binaries are logged, not fatal:
/// jobs then fail individually with a configuration or processing error.
pub fn build_pipeline(
    config: PipelineConfig,
    projection: Arc<dyn TrackStatusProjection>,
) -> WorkerResult<JobQueueManager> {
    if config.media.waveform_points == 0 || config.media.peak_points == 0 {
        return Err(WorkerError::config_error(
            "waveform and peak point counts must be positive",
        ));
    }

    let storage = ObjectStorageClient::new(config.storage)?;
    if !storage.is_configured() {
        warn!("Pipeline started without object storage; every job will fail until it is configured");
    }

    for check in [check_ffmpeg(), check_ffprobe()] {
        if let Err(e) = check {
            warn!(error = %e, "Media tooling unavailable");
        }
    }

    let processor = FfmpegMediaProcessor::new(config.media);

    info!(
        work_dir = %config.queue.work_dir.display(),
        max_retained_jobs = config.queue.max_retained_jobs,
        "Media pipeline ready"
    );

    Ok(JobQueueManager::new(
        config.queue,
        projection,
        Arc::new(storage),
        Arc::new(processor),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdeck_models::{JobStatus, JobType, ProcessingStatus, Track, TrackId};
    use mixdeck_queue::InMemoryTrackStore;

    #[tokio::test]
    async fn test_unconfigured_pipeline_fails_jobs_with_configuration_error() {
        let work_dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.queue = config.queue.with_work_dir(work_dir.path());

        let tracks = Arc::new(InMemoryTrackStore::new());
        tracks
            .insert(Track::new("t1", "https://cdn.example.com/a.mp3"))
            .await;

        let queue = build_pipeline(config, tracks.clone()).unwrap();
        let job = queue
            .enqueue(TrackId::from("t1"), JobType::WaveformGeneration)
            .await
            .unwrap();
        queue.wait_idle().await;

        let job = queue.get_job_status(&job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("not configured"));

        let track = tracks.get(&TrackId::from("t1")).await.unwrap();
        assert_eq!(track.processing_status, ProcessingStatus::Failed);
    }

    #[test]
    fn test_rejects_zero_points() {
        let mut config = PipelineConfig::default();
        config.media.peak_points = 0;
        let err = build_pipeline(config, Arc::new(InMemoryTrackStore::new())).unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }
}
