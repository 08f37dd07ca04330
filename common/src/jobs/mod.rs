//! Wire types of the bulk job protocol.
//!
//! A bulk job is started with one request that answers a [`JobAccepted`], is
//! polled through `{base}/progress/{id}` answering a [`ProgressReport`] and is
//! finished by reading `{base}/result/{id}`. The backend keeps one
//! [`JobStatus`] per job and renders both documents from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque server-side job identifier.
///
/// Servers hand out either strings (UUIDs) or integers. Both decode into the
/// same textual form so the client can build URLs without caring which one it got.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawJobId", into = "String")]
pub struct JobId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobId {
    Text(String),
    Number(u64),
}

impl From<RawJobId> for JobId {
    fn from(raw: RawJobId) -> Self {
        match raw {
            RawJobId::Text(text) => JobId(text),
            RawJobId::Number(number) => JobId(number.to_string()),
        }
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        JobId(id.to_string())
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId(id.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body answered by every job-starting endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobAccepted {
    #[serde(alias = "job_id")]
    pub id: JobId,
}

/// Completion marker nested in a progress report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FutureState {
    #[serde(default)]
    pub done: bool,
}

/// Body answered by `{base}/progress/{id}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future: Option<FutureState>,
}

impl ProgressReport {
    pub fn is_done(&self) -> bool {
        self.future.as_ref().is_some_and(|future| future.done)
    }
}

/// Server-side lifecycle of a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Fraction of the work done, in `[0, 1]`.
    InProgress(f64),
    /// Final result payload served by `{base}/result/{id}`.
    Completed(Value),
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed(_) | JobStatus::Failed(_))
    }

    /// Renders the status as the document polled by clients.
    pub fn to_report(&self) -> ProgressReport {
        match self {
            JobStatus::Pending => ProgressReport {
                progress: Some(0.0),
                future: Some(FutureState { done: false }),
            },
            JobStatus::InProgress(fraction) => ProgressReport {
                progress: Some(fraction.clamp(0.0, 1.0)),
                future: Some(FutureState { done: false }),
            },
            JobStatus::Completed(_) | JobStatus::Failed(_) => ProgressReport {
                progress: Some(1.0),
                future: Some(FutureState { done: true }),
            },
        }
    }
}
