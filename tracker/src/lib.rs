//! Client side of the bulk suggestion job protocol.
//!
//! Bulk validate, bulk create and bulk approve all follow the same shape: one
//! request starts a job on the server, the client polls its progress, and once
//! the server reports completion the result is fetched. This crate implements
//! that shape once:
//!
//! - [`submit`]: starts a job and returns its [`JobHandle`].
//! - [`poller`]: polls progress with a self-rescheduling timer and a
//!   [`CancelToken`].
//! - [`fetch`]: reads the final result.
//! - [`JobTracker`]: composes the three into the phase sequence
//!   Idle → Submitting → Polling → FetchingResult → Done | Failed and publishes
//!   a [`TrackerState`] snapshot per transition.
//!
//! HTTP and scheduling are injected through [`Transport`] and [`Runtime`], so
//! the same code runs in the browser and under tokio in tests.

pub mod config;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod fetch;
pub mod machine;
pub mod poller;
pub mod runtime;
pub mod state;
pub mod submit;
pub mod tracker;
pub mod transport;

pub use config::{JobEndpoint, TrackerConfig, BULK_SUGGESTION_PATH};
pub use error::TrackerError;
pub use poller::{CancelToken, PollEvent, PollSchedule};
pub use runtime::Runtime;
#[cfg(not(target_arch = "wasm32"))]
pub use runtime::TokioRuntime;
pub use state::{JobHandle, JobOutcome, JobProgress, Phase, TrackerState};
pub use tracker::{JobTracker, ListenerId};
pub use transport::{FormPart, HttpRequest, JobRequest, Method, Transport};

pub use common::jobs::JobId;
