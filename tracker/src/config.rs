//! Endpoint and timing configuration for one kind of bulk job.
//!
//! A [`JobEndpoint`] says where a job is started and where its progress and
//! result live; a [`TrackerConfig`] says how often to poll and for how long.
//! Both are plain values so the same tracker code serves bulk create, bulk
//! validate and bulk approve.

use crate::transport::Method;
use common::jobs::JobId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base path of the bulk suggestion API.
pub const BULK_SUGGESTION_PATH: &str = "/api/suggestion/bulk";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobEndpoint {
    pub submit_method: Method,
    pub submit_url: String,
    progress_base: String,
    result_base: String,
}

impl JobEndpoint {
    /// Jobs started with `POST {base}` and tracked under `{base}/progress`
    /// and `{base}/result`.
    pub fn bulk(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            submit_method: Method::Post,
            submit_url: base.to_string(),
            progress_base: format!("{base}/progress"),
            result_base: format!("{base}/result"),
        }
    }

    /// Row validation without storing anything: `POST {base}/validate`.
    pub fn validate(base: &str) -> Self {
        Self::bulk(&format!("{}/validate", base.trim_end_matches('/')))
    }

    /// Approval of every suggestion created by bulk job `id`:
    /// `PUT {base}/{id}/approve`, tracked under `{base}/approve/...`.
    pub fn approve(base: &str, id: &JobId) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            submit_method: Method::Put,
            submit_url: format!("{base}/{id}/approve"),
            progress_base: format!("{base}/approve/progress"),
            result_base: format!("{base}/approve/result"),
        }
    }

    pub fn progress_url(&self, id: &JobId) -> String {
        format!("{}/{}", self.progress_base, id)
    }

    pub fn result_url(&self, id: &JobId) -> String {
        format!("{}/{}", self.result_base, id)
    }
}

/// Polling cadence and budget.
///
/// Deserialises from `{"poll_interval_ms": 100, "max_poll_duration_ms": 60000}`;
/// both fields are optional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTrackerConfig", into = "RawTrackerConfig")]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// `None` polls until the server reports completion.
    pub max_poll_duration: Option<Duration>,
}

#[derive(Serialize, Deserialize)]
struct RawTrackerConfig {
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default)]
    max_poll_duration_ms: Option<u64>,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl From<RawTrackerConfig> for TrackerConfig {
    fn from(raw: RawTrackerConfig) -> Self {
        Self {
            // A zero interval would spin the event loop.
            poll_interval: Duration::from_millis(raw.poll_interval_ms.max(1)),
            max_poll_duration: raw.max_poll_duration_ms.map(Duration::from_millis),
        }
    }
}

impl From<TrackerConfig> for RawTrackerConfig {
    fn from(config: TrackerConfig) -> Self {
        Self {
            poll_interval_ms: config.poll_interval.as_millis() as u64,
            max_poll_duration_ms: config.max_poll_duration.map(|d| d.as_millis() as u64),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            max_poll_duration: None,
        }
    }
}

impl TrackerConfig {
    pub fn bulk_create() -> Self {
        Self::default()
    }

    pub fn bulk_validate() -> Self {
        Self::default()
    }

    pub fn bulk_approve() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            ..Self::default()
        }
    }

    pub fn with_max_poll_duration(mut self, max: Duration) -> Self {
        self.max_poll_duration = Some(max);
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
