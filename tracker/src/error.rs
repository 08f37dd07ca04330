//! Error taxonomy shared by submission, polling and result fetching.

use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TrackerError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP error with status {status}: {message}")]
    Server { status: u16, message: String },

    /// A success status whose body lacks the expected fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The client-side polling budget ran out before the job finished.
    #[error("Job still running after {} ms", waited.as_millis())]
    Timeout { waited: Duration },
}

impl TrackerError {
    pub fn malformed(what: impl Into<String>) -> Self {
        TrackerError::MalformedResponse(what.into())
    }

    /// Builds a `Server` error, falling back to a generic message when the
    /// body is empty.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            body
        };
        TrackerError::Server { status, message }
    }

    /// Whether re-starting the same request can reasonably succeed.
    ///
    /// A malformed answer means client and server disagree on the protocol;
    /// sending the same request again will not fix that.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TrackerError::MalformedResponse(_))
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::MalformedResponse(err.to_string())
    }
}
