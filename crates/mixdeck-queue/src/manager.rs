//! Job queue manager and its single background worker.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use mixdeck_media::MediaProcessor;
use mixdeck_models::{
    Job, JobId, JobType, QueueStats, TrackId, TrackProcessingStatus, TrackUpdate,
};
use mixdeck_storage::MediaStore;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn, Instrument};

use crate::config::QueueConfig;
use crate::dispatch::{run_job, JobContext};
use crate::error::{JobError, QueueError, QueueResult};
use crate::job_store::JobStore;
use crate::logging::JobLogger;
use crate::metrics::{self, Outcome};
use crate::projection::{ProjectionError, TrackStatusProjection};

/// Handle to the processing queue. Clones share the same queue and worker.
#[derive(Clone)]
pub struct JobQueueManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: QueueConfig,
    projection: Arc<dyn TrackStatusProjection>,
    store: Arc<dyn MediaStore>,
    processor: Arc<dyn MediaProcessor>,
    state: Mutex<QueueState>,
    /// Serializes track status writes with the enqueue that makes them stale.
    track_writes: Mutex<()>,
    idle_tx: watch::Sender<bool>,
}

struct QueueState {
    jobs: JobStore,
    worker_running: bool,
}

impl JobQueueManager {
    pub fn new(
        config: QueueConfig,
        projection: Arc<dyn TrackStatusProjection>,
        store: Arc<dyn MediaStore>,
        processor: Arc<dyn MediaProcessor>,
    ) -> Self {
        let (idle_tx, _) = watch::channel(true);
        let state = QueueState {
            jobs: JobStore::new(config.max_retained_jobs),
            worker_running: false,
        };

        Self {
            inner: Arc::new(Inner {
                config,
                projection,
                store,
                processor,
                state: Mutex::new(state),
                track_writes: Mutex::new(()),
                idle_tx,
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Queue a job for a track and return it immediately as `pending`.
    ///
    /// The track is marked `pending` before this returns. Whether the track
    /// exists is only checked when the job runs.
    pub async fn enqueue(&self, track_id: TrackId, job_type: JobType) -> QueueResult<Job> {
        if track_id.is_empty() {
            return Err(QueueError::InvalidTrackId(track_id.to_string()));
        }

        let job = Job::new(track_id, job_type);

        let _writes = self.inner.track_writes.lock().await;
        self.inner
            .projection
            .write_processing_result(&job.track_id, TrackUpdate::pending())
            .await?;

        let start_worker = {
            let mut state = self.inner.state.lock().await;
            state.jobs.push(job.clone());
            metrics::set_pending(state.jobs.stats().pending);

            let start = !state.worker_running;
            state.worker_running = true;
            start
        };
        metrics::record_enqueued(job_type);

        info!(
            job_id = %job.id,
            track_id = %job.track_id,
            job_type = %job_type,
            "Enqueued job"
        );

        if start_worker {
            self.inner.idle_tx.send_replace(false);
            tokio::spawn(Arc::clone(&self.inner).run_worker());
        }

        Ok(job)
    }

    /// Snapshot of a retained job.
    pub async fn get_job_status(&self, job_id: &JobId) -> Option<Job> {
        self.inner.state.lock().await.jobs.get(job_id).cloned()
    }

    /// `{status, error?}` of a track, or `None` if the track does not exist.
    pub async fn get_track_processing_status(
        &self,
        track_id: &TrackId,
    ) -> QueueResult<Option<TrackProcessingStatus>> {
        let track = self.inner.projection.read_track(track_id).await?;
        Ok(track.map(|t| t.processing_snapshot()))
    }

    pub async fn get_queue_stats(&self) -> QueueStats {
        self.inner.state.lock().await.jobs.stats()
    }

    /// Queue a fresh job for an existing track: `full-processing` when it
    /// has an original video, `waveform-generation` otherwise.
    pub async fn reprocess_track(&self, track_id: &TrackId) -> QueueResult<Job> {
        let track = self
            .inner
            .projection
            .read_track(track_id)
            .await?
            .ok_or_else(|| QueueError::TrackNotFound(track_id.clone()))?;

        let job_type = if track.video_source().is_some() {
            JobType::FullProcessing
        } else {
            JobType::WaveformGeneration
        };

        info!(track_id = %track_id, job_type = %job_type, "Reprocessing track");
        self.enqueue(track.id, job_type).await
    }

    /// Retained jobs for a track, oldest first.
    pub async fn list_jobs_for_track(&self, track_id: &TrackId) -> Vec<Job> {
        self.inner.state.lock().await.jobs.list_for_track(track_id)
    }

    /// Resolves once the worker has no pending jobs left.
    pub async fn wait_idle(&self) {
        let mut idle_rx = self.inner.idle_tx.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = idle_rx.wait_for(|idle| *idle).await;
    }
}

impl Inner {
    /// Drain pending jobs one at a time, then stop.
    async fn run_worker(self: Arc<Self>) {
        debug!("Worker started");
        loop {
            let job = {
                let mut state = self.state.lock().await;
                match state.jobs.next_pending() {
                    Some(job) => {
                        job.start();
                        let job = job.clone();
                        metrics::set_pending(state.jobs.stats().pending);
                        job
                    }
                    None => {
                        state.worker_running = false;
                        self.idle_tx.send_replace(true);
                        break;
                    }
                }
            };

            let job_id = job.id.clone();
            let logger = JobLogger::new(&job);
            let span = logger.create_span();
            let guarded = AssertUnwindSafe(self.process_job(job, &logger).instrument(span))
                .catch_unwind()
                .await;

            // Failure bookkeeping itself panicked; settle the job so the loop
            // can move on.
            if let Err(payload) = guarded {
                let message = panic_message(payload.as_ref());
                error!(job_id = %job_id, panic_msg = %message, "Job handler panicked");
                self.finish(&job_id, |j| j.fail(format!("Job panicked: {}", message)))
                    .await;
            }
        }
        debug!("Worker idle");
    }

    async fn process_job(&self, job: Job, logger: &JobLogger) {
        logger.log_start(job.track_id.as_str());
        let started = Instant::now();

        let ctx = JobContext {
            config: &self.config,
            projection: self.projection.as_ref(),
            store: self.store.as_ref(),
            processor: self.processor.as_ref(),
            logger,
        };

        let attempt = async {
            let update = run_job(&ctx, &job).await?;
            self.write_track(&job, update).await?;
            Ok::<(), JobError>(())
        };
        let result = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
        };

        let outcome = match result {
            Ok(()) => {
                self.finish(&job.id, |j| j.complete()).await;
                logger.log_completion(&format!("{:.2}s", started.elapsed().as_secs_f64()));
                Outcome::Completed
            }
            Err(e) => {
                let message = e.to_string();
                logger.log_error(&format!("[{}] {}", e.kind().as_str(), message));

                if !matches!(e, JobError::TrackNotFound(_)) {
                    if let Err(write_err) = self.write_failure(&job, &message).await {
                        warn!(error = %write_err, "Failed to record job failure on track");
                    }
                }
                self.finish(&job.id, |j| j.fail(message)).await;
                Outcome::Failed
            }
        };

        metrics::record_finished(job.job_type, outcome, started.elapsed());
    }

    /// Write a successful result. A newer pending job for the same track
    /// keeps the track `pending`; derived fields are written regardless.
    async fn write_track(
        &self,
        job: &Job,
        update: TrackUpdate,
    ) -> Result<(), ProjectionError> {
        let _writes = self.track_writes.lock().await;
        let update = if self.superseded(job).await {
            debug!("Newer job pending for track, leaving status as pending");
            update.without_status()
        } else {
            update
        };
        self.projection
            .write_processing_result(&job.track_id, update)
            .await
    }

    async fn write_failure(
        &self,
        job: &Job,
        message: &str,
    ) -> Result<(), ProjectionError> {
        let _writes = self.track_writes.lock().await;
        if self.superseded(job).await {
            debug!("Newer job pending for track, not recording failure on track");
            return Ok(());
        }
        self.projection.write_failure(&job.track_id, message).await
    }

    async fn superseded(&self, job: &Job) -> bool {
        self.state
            .lock()
            .await
            .jobs
            .has_newer_pending(&job.track_id, &job.id)
    }

    async fn finish(&self, job_id: &JobId, transition: impl FnOnce(&mut Job) -> bool) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            if !transition(job) {
                warn!(job_id = %job_id, status = %job.status.as_str(), "Ignored illegal job transition");
            }
        }
    }
}

/// Text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for JobQueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueueManager")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
