//! Manages the state of long-running, asynchronous bulk jobs.
//!
//! This module tracks the progress of work executed outside the request/response
//! cycle, such as the bulk suggestion import in
//! `backend/src/services/suggestions/create.rs`.
//!
//! The main components are:
//! - `JobsState`: A clonable, thread-safe struct that holds the status of every job.
//!   It is injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: A message used by background workers to report status changes.
//! - `start_job_updater`: A long-running task that drains `JobUpdate` messages from
//!   the MPSC channel and applies them to `JobsState`.

use common::jobs::JobStatus;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{mpsc, RwLock};

/// Which family of endpoints a job belongs to. A job is only visible under the
/// progress/result routes of its own kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    Create,
    Validate,
    Approve,
}

#[derive(Clone, Debug)]
pub struct JobRecord {
    pub kind: JobKind,
    pub status: JobStatus,
    /// Set when the job reaches `Completed` or `Failed`.
    pub finished_at: Option<Instant>,
}

/// A thread-safe, shareable container for the state of all background jobs.
#[derive(Clone)]
pub struct JobsState {
    /// A map from a job ID (UUID string) to its current record.
    ///
    /// Reads come from the progress and result endpoints; writes go through
    /// `start_job_updater`, except for the initial `Pending` entry.
    pub jobs: Arc<RwLock<HashMap<String, JobRecord>>>,

    /// Background workers push `JobUpdate` messages here. A single channel keeps
    /// updates for one job in the order they were sent, so a late progress
    /// report can never overwrite the final status.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// Represents a status update for a specific background job.
#[derive(Debug)]
pub struct JobUpdate {
    /// The unique identifier of the job being updated.
    pub(crate) job_id: String,
    /// The new status of the job.
    pub(crate) status: JobStatus,
}

impl JobsState {
    /// Creates an empty state and the receiving end for `start_job_updater`.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new `Pending` job and returns its ID.
    pub async fn register(&self, kind: JobKind) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs.write().await.insert(
            job_id.clone(),
            JobRecord {
                kind,
                status: JobStatus::Pending,
                finished_at: None,
            },
        );
        job_id
    }

    /// Current status of `job_id`, if it exists and is of the given kind.
    pub async fn status(&self, job_id: &str, kind: JobKind) -> Option<JobStatus> {
        let jobs = self.jobs.read().await;
        jobs.get(job_id)
            .filter(|record| record.kind == kind)
            .map(|record| record.status.clone())
    }

    /// Drops jobs that finished more than `ttl` before `now` and returns them.
    pub async fn prune_finished(&self, now: Instant, ttl: Duration) -> Vec<(String, JobKind)> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<(String, JobKind)> = jobs
            .iter()
            .filter(|(_, record)| {
                record
                    .finished_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= ttl)
            })
            .map(|(id, record)| (id.clone(), record.kind))
            .collect();
        for (id, _) in &expired {
            jobs.remove(id);
        }
        expired
    }
}

/// Starts the central job state updater task.
///
/// This function should be spawned as a long-running background task (as seen in `main.rs`).
/// Updates for unknown jobs are dropped, and a finished job keeps its final status.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        match jobs.get_mut(&update.job_id) {
            Some(record) if !record.status.is_finished() => {
                if update.status.is_finished() {
                    record.finished_at = Some(Instant::now());
                }
                record.status = update.status;
            }
            Some(_) => log::warn!("ignoring update for finished job {}", update.job_id),
            None => log::warn!("ignoring update for unknown job {}", update.job_id),
        }
    }
}

/// Periodically evicts finished jobs older than `ttl`, calling `on_evicted`
/// for each one so dependent data can go with it.
pub async fn start_job_sweeper(
    state: JobsState,
    ttl: Duration,
    on_evicted: impl Fn(&str, JobKind),
) {
    let period = ttl.clamp(Duration::from_secs(1), Duration::from_secs(60));
    let mut ticker = actix_web::rt::time::interval(period);
    loop {
        ticker.tick().await;
        for (job_id, kind) in state.prune_finished(Instant::now(), ttl).await {
            log::info!("evicting {:?} job {}", kind, job_id);
            on_evicted(&job_id, kind);
        }
    }
}
