//! Queue metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding binary.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use mixdeck_models::JobType;

/// Metric name constants.
pub mod names {
    /// Jobs accepted by `enqueue`, by job type.
    pub const JOBS_ENQUEUED_TOTAL: &str = "pipeline_jobs_enqueued_total";

    /// Jobs that reached a terminal state, by job type and outcome.
    pub const JOBS_FINISHED_TOTAL: &str = "pipeline_jobs_finished_total";

    /// Wall-clock time from `processing` to terminal, by job type.
    pub const JOB_DURATION_SECONDS: &str = "pipeline_job_duration_seconds";

    /// Jobs currently waiting.
    pub const JOBS_PENDING: &str = "pipeline_jobs_pending";
}

/// Terminal outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Failed => "failed",
        }
    }
}

pub fn record_enqueued(job_type: JobType) {
    counter!(names::JOBS_ENQUEUED_TOTAL, "job_type" => job_type.as_str()).increment(1);
}

pub fn record_finished(job_type: JobType, outcome: Outcome, elapsed: Duration) {
    counter!(
        names::JOBS_FINISHED_TOTAL,
        "job_type" => job_type.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(names::JOB_DURATION_SECONDS, "job_type" => job_type.as_str())
        .record(elapsed.as_secs_f64());
}

pub fn set_pending(pending: usize) {
    gauge!(names::JOBS_PENDING).set(pending as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::JOBS_ENQUEUED_TOTAL.starts_with("pipeline_"));
        assert!(names::JOB_DURATION_SECONDS.ends_with("_seconds"));
        assert_eq!(Outcome::Failed.as_str(), "failed");
    }

    #[test]
    fn test_recording_without_recorder() {
        record_enqueued(JobType::FullProcessing);
        record_finished(
            JobType::FullProcessing,
            Outcome::Completed,
            Duration::from_millis(5),
        );
        set_pending(0);
    }
}
