use crate::job_controller::state::{JobKind, JobUpdate, JobsState};
use common::jobs::JobStatus;
use serde_json::Value;
use std::time::Instant;
use tokio::sync::mpsc;

/// Handed to a blocking job body so it can report progress without awaiting.
pub struct JobReporter {
    tx: mpsc::Sender<JobUpdate>,
    job_id: String,
}

impl JobReporter {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Reports `done` of `total` units finished.
    pub fn progress(&self, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            done.min(total) as f64 / total as f64
        };
        let update = JobUpdate {
            job_id: self.job_id.clone(),
            status: JobStatus::InProgress(fraction),
        };
        if self.tx.blocking_send(update).is_err() {
            log::warn!("job updater gone, dropping progress of {}", self.job_id);
        }
    }
}

/// Registers a `Pending` job of `kind` and runs `work` on the blocking pool.
///
/// Returns the job ID immediately. The value returned by `work` becomes the
/// `Completed` payload; an `Err` (or a panic) marks the job `Failed`. All status
/// changes go through the updater channel so they apply in order.
pub async fn schedule_job<F>(state: &JobsState, kind: JobKind, work: F) -> String
where
    F: FnOnce(&JobReporter) -> Result<Value, String> + Send + 'static,
{
    let job_id = state.register(kind).await;
    let reporter = JobReporter {
        tx: state.tx.clone(),
        job_id: job_id.clone(),
    };
    let tx = state.tx.clone();
    let value = job_id.clone();
    log::info!("{:?} job {} scheduled", kind, job_id);

    tokio::spawn(async move {
        let start = Instant::now();
        let handle = tokio::task::spawn_blocking(move || work(&reporter));

        let status = match handle.await {
            Ok(Ok(result)) => JobStatus::Completed(result),
            Ok(Err(e)) => JobStatus::Failed(e),
            Err(join_err) => JobStatus::Failed(format!("join error: {}", join_err)),
        };
        match &status {
            JobStatus::Failed(e) => log::warn!("{:?} job {} failed: {}", kind, value, e),
            _ => log::info!(
                "{:?} job {} finished in {:.2?}",
                kind,
                value,
                start.elapsed()
            ),
        }
        if tx
            .send(JobUpdate {
                job_id: value.clone(),
                status,
            })
            .await
            .is_err()
        {
            log::error!("job updater gone, {} keeps its last status", value);
        }
    });

    job_id
}
