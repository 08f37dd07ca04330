use crate::config::JobEndpoint;
use crate::error::TrackerError;
use crate::state::{JobHandle, JobOutcome};
use crate::transport::{HttpRequest, Transport};
use log::debug;
use serde_json::Value;

/// Reads the final payload of a completed job with one GET.
pub async fn fetch_result<T>(transport: &T, endpoint: &JobEndpoint, handle: &JobHandle) -> JobOutcome
where
    T: Transport + ?Sized,
{
    let url = endpoint.result_url(&handle.job_id);
    debug!("GET {url}");
    match transport.send(HttpRequest::get(url)).await {
        Ok(Value::Null) => JobOutcome::Failure {
            error: TrackerError::malformed("empty job result"),
        },
        Ok(result) => JobOutcome::Success { result },
        Err(error) => JobOutcome::Failure { error },
    }
}
