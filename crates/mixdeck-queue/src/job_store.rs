//! Ordered, bounded job collection.

use std::collections::VecDeque;

use mixdeck_models::{Job, JobId, JobStatus, QueueStats, TrackId};

/// Jobs in insertion order.
///
/// Holds at most `max_retained` jobs once enough of them are terminal:
/// eviction removes the oldest completed/failed jobs and never touches
/// pending or processing ones.
#[derive(Debug)]
pub struct JobStore {
    jobs: VecDeque<Job>,
    max_retained: usize,
}

impl JobStore {
    pub fn new(max_retained: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            max_retained: max_retained.max(1),
        }
    }

    pub fn push(&mut self, job: Job) {
        self.jobs.push_back(job);
        self.evict();
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    pub fn get_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| &j.id == id)
    }

    /// First pending job in insertion order.
    pub fn next_pending(&mut self) -> Option<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|j| j.status == JobStatus::Pending)
    }

    pub fn stats(&self) -> QueueStats {
        self.jobs.iter().fold(QueueStats::default(), |mut stats, job| {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed | JobStatus::Failed => {}
            }
            stats
        })
    }

    /// Whether a pending job for the same track was enqueued after `job_id`.
    pub fn has_newer_pending(&self, track_id: &TrackId, job_id: &JobId) -> bool {
        self.jobs
            .iter()
            .skip_while(|j| &j.id != job_id)
            .skip(1)
            .any(|j| &j.track_id == track_id && j.status == JobStatus::Pending)
    }

    /// Retained jobs for one track, oldest first.
    pub fn list_for_track(&self, track_id: &TrackId) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|j| &j.track_id == track_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn evict(&mut self) {
        while self.jobs.len() > self.max_retained {
            match self.jobs.iter().position(Job::is_terminal) {
                Some(index) => {
                    self.jobs.remove(index);
                }
                None => break,
            }
        }
    }
}
