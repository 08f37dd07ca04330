//! Values published by the tracker.
//!
//! A [`TrackerState`] is an immutable snapshot. The tracker builds a new one
//! for every transition and hands clones to its listeners; nothing a listener
//! holds is ever changed behind its back.

use crate::error::TrackerError;
use common::jobs::JobId;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Submitting,
    Polling,
    FetchingResult,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    /// A job is in flight: submission, polling or result fetch.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Phase::Submitting | Phase::Polling | Phase::FetchingResult
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Key of a submitted job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
    /// Runtime clock reading taken when the server accepted the job.
    pub submitted_at: Duration,
}

/// One progress reading.
#[derive(Clone, Debug, PartialEq)]
pub struct JobProgress {
    /// Share of the work done, clamped to `[0, 1]`.
    pub fraction: f64,
    /// The poll response it was read from.
    pub raw: Value,
}

impl JobProgress {
    /// Returns `None` for a non-finite fraction.
    pub fn new(fraction: f64, raw: Value) -> Option<Self> {
        fraction.is_finite().then(|| Self {
            fraction: fraction.clamp(0.0, 1.0),
            raw,
        })
    }

    pub fn percent(&self) -> u32 {
        (self.fraction * 100.0).round() as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
    Success { result: Value },
    Failure { error: TrackerError },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerState {
    pub(crate) phase: Phase,
    pub(crate) handle: Option<JobHandle>,
    pub(crate) progress: Option<JobProgress>,
    pub(crate) outcome: Option<JobOutcome>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::idle()
    }
}

impl TrackerState {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            handle: None,
            progress: None,
            outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        self.handle.as_ref()
    }

    pub fn progress(&self) -> Option<&JobProgress> {
        self.progress.as_ref()
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    /// The result payload of a `Done` snapshot.
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Some(JobOutcome::Success { result }) => Some(result),
            _ => None,
        }
    }

    /// The error of a `Failed` snapshot.
    pub fn error(&self) -> Option<&TrackerError> {
        match &self.outcome {
            Some(JobOutcome::Failure { error }) => Some(error),
            _ => None,
        }
    }

    pub fn fraction(&self) -> f64 {
        self.progress.as_ref().map_or(0.0, |p| p.fraction)
    }
}
