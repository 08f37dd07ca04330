//! Transition table of the job tracker.
//!
//! ```text
//! Idle|Done|Failed --Start-----------> Submitting
//! Submitting --Submitted-------------> Polling
//! Submitting --SubmitFailed----------> Failed
//! Polling --Progress-----------------> Polling
//! Polling --PollCompleted------------> FetchingResult
//! Polling --InlineResult-------------> Done
//! Polling --PollFailed---------------> Failed
//! FetchingResult --ResultFetched-----> Done
//! FetchingResult --ResultFailed------> Failed
//! any but Idle --Cancel--------------> Idle
//! ```
//!
//! Pairs missing from the table are rejected with `None`, which the driver
//! treats as "no transition, no snapshot".

use crate::error::TrackerError;
use crate::state::{JobHandle, JobOutcome, JobProgress, Phase, TrackerState};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum TrackerEvent {
    Start,
    Submitted(JobHandle),
    SubmitFailed(TrackerError),
    Progress(JobProgress),
    PollCompleted,
    /// The poll response itself carried the final result.
    InlineResult(Value),
    PollFailed(TrackerError),
    ResultFetched(Value),
    ResultFailed(TrackerError),
    Cancel,
}

pub fn apply(state: &TrackerState, event: TrackerEvent) -> Option<TrackerState> {
    use Phase::*;
    use TrackerEvent::*;

    let next = match (state.phase, event) {
        (Idle | Done | Failed, Start) => TrackerState {
            phase: Submitting,
            handle: None,
            progress: None,
            outcome: None,
        },
        (Submitting, Submitted(handle)) => TrackerState {
            phase: Polling,
            handle: Some(handle),
            ..state.clone()
        },
        (Submitting, SubmitFailed(error)) => failed(state, error),
        (Polling, Progress(progress)) => TrackerState {
            progress: Some(progress),
            ..state.clone()
        },
        (Polling, PollCompleted) => TrackerState {
            phase: FetchingResult,
            ..state.clone()
        },
        (Polling, InlineResult(result)) | (FetchingResult, ResultFetched(result)) => {
            TrackerState {
                phase: Done,
                outcome: Some(JobOutcome::Success { result }),
                ..state.clone()
            }
        }
        (Polling, PollFailed(error)) | (FetchingResult, ResultFailed(error)) => {
            failed(state, error)
        }
        (Submitting | Polling | FetchingResult | Done | Failed, Cancel) => TrackerState::idle(),
        _ => return None,
    };
    Some(next)
}

fn failed(state: &TrackerState, error: TrackerError) -> TrackerState {
    TrackerState {
        phase: Phase::Failed,
        outcome: Some(JobOutcome::Failure { error }),
        ..state.clone()
    }
}
