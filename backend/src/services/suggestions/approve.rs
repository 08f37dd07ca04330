use super::store::SuggestionStore;
use crate::config::ServerConfig;
use crate::job_controller::runner::{schedule_job, JobReporter};
use crate::job_controller::state::{JobKind, JobsState};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::{JobAccepted, JobId, JobStatus};
use common::model::suggestion::BulkApprovalResult;
use serde_json::Value;
use std::sync::Arc;

/// `PUT /api/suggestion/bulk/{job_id}/approve`, where `job_id` is a finished
/// bulk create job. Starts an approve job over its pending suggestions.
pub(crate) async fn process(
    create_job_id: web::Path<String>,
    jobs: web::Data<JobsState>,
    store: web::Data<SuggestionStore>,
    config: web::Data<ServerConfig>,
) -> impl Responder {
    let create_job_id = create_job_id.into_inner();
    match jobs.status(&create_job_id, JobKind::Create).await {
        None => return HttpResponse::NotFound().body("Job ID not found"),
        Some(JobStatus::Completed(_)) => {}
        Some(_) => return HttpResponse::Conflict().body("Bulk create job has not completed"),
    }
    let ids = match store.pending_ids(&create_job_id) {
        Ok(Some(ids)) => ids,
        Ok(None) => return HttpResponse::NotFound().body("No suggestions for job"),
        Err(e) => return HttpResponse::InternalServerError().body(e),
    };

    let store = store.into_inner();
    let chunk_size = config.chunk_size;
    let job_id = schedule_job(&jobs, JobKind::Approve, move |reporter| {
        approve_blocking(reporter, &store, &create_job_id, &ids, chunk_size)
    })
    .await;
    HttpResponse::Ok().json(JobAccepted {
        id: JobId::new(job_id),
    })
}

fn approve_blocking(
    reporter: &JobReporter,
    store: &Arc<SuggestionStore>,
    create_job_id: &str,
    ids: &[u64],
    chunk_size: usize,
) -> Result<Value, String> {
    let mut approved = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(chunk_size.max(1)) {
        approved.extend(store.approve(create_job_id, chunk)?);
        reporter.progress(approved.len(), ids.len());
    }
    let result = BulkApprovalResult {
        id: JobId::new(reporter.job_id()),
        approved,
    };
    serde_json::to_value(result).map_err(|e| e.to_string())
}
