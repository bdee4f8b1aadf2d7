//! Queue configuration.

use std::path::PathBuf;

/// Job queue settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound on retained jobs; only terminal jobs are evicted
    pub max_retained_jobs: usize,
    /// Parent directory for per-job scratch directories
    pub work_dir: PathBuf,
    /// Key prefix for uploaded derived files
    pub derived_prefix: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retained_jobs: 1000,
            work_dir: PathBuf::from("/tmp/mixdeck/jobs"),
            derived_prefix: "processed".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retained_jobs: std::env::var("QUEUE_MAX_RETAINED_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_retained_jobs),
            work_dir: std::env::var("QUEUE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            derived_prefix: std::env::var("QUEUE_DERIVED_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .ok()
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.derived_prefix),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_max_retained_jobs(mut self, max: usize) -> Self {
        self.max_retained_jobs = max.max(1);
        self
    }

    /// Key for a derived file: `<prefix>/<track>/<job>/<file>`.
    pub fn derived_key(&self, track_id: &str, job_id: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.derived_prefix.trim_matches('/'),
            track_id,
            job_id,
            file_name
        )
    }
}
