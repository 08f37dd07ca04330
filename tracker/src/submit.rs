use crate::config::JobEndpoint;
use crate::error::TrackerError;
use crate::state::JobHandle;
use crate::transport::{HttpRequest, JobRequest, Transport};
use common::jobs::JobAccepted;
use log::{debug, info};
use serde_json::Value;
use std::time::Duration;

/// Starts a server-side job with exactly one request. No retry: a failed
/// submission is final for this attempt.
pub async fn submit<T>(
    transport: &T,
    endpoint: &JobEndpoint,
    request: JobRequest,
    now: Duration,
) -> Result<JobHandle, TrackerError>
where
    T: Transport + ?Sized,
{
    debug!("{} {}", endpoint.submit_method, endpoint.submit_url);
    let body = transport
        .send(HttpRequest {
            method: endpoint.submit_method,
            url: endpoint.submit_url.clone(),
            body: request,
        })
        .await?;
    let job_id = decode_job_id(body)?;
    info!("job {} accepted by {}", job_id, endpoint.submit_url);
    Ok(JobHandle {
        job_id,
        submitted_at: now,
    })
}

fn decode_job_id(body: Value) -> Result<common::jobs::JobId, TrackerError> {
    if !body.is_object() {
        return Err(TrackerError::malformed(format!(
            "expected a job object, got {body}"
        )));
    }
    serde_json::from_value::<JobAccepted>(body)
        .map(|accepted| accepted.id)
        .map_err(|_| TrackerError::malformed("response has no job identifier"))
}
