use crate::job_controller::state::{JobKind, JobsState};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;

/// Completed jobs answer their payload, failed ones a 500 with the reason and
/// running ones a 409.
async fn result(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
    kind: JobKind,
) -> HttpResponse {
    match state.status(&job_id.into_inner(), kind).await {
        Some(JobStatus::Completed(payload)) => HttpResponse::Ok().json(payload),
        Some(JobStatus::Failed(reason)) => HttpResponse::InternalServerError().body(reason),
        Some(_) => HttpResponse::Conflict().body("Job still running"),
        None => HttpResponse::NotFound().body("Job ID not found"),
    }
}

pub(crate) async fn create(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    result(job_id, state, JobKind::Create).await
}

pub(crate) async fn validate(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    result(job_id, state, JobKind::Validate).await
}

pub(crate) async fn approve(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    result(job_id, state, JobKind::Approve).await
}
