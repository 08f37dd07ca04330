use crate::job_controller::state::{JobKind, JobsState};
use actix_web::{web, HttpResponse, Responder};

async fn report(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
    kind: JobKind,
) -> HttpResponse {
    match state.status(&job_id.into_inner(), kind).await {
        Some(status) => HttpResponse::Ok().json(status.to_report()),
        None => HttpResponse::NotFound().body("Job ID not found"),
    }
}

pub(crate) async fn create(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    report(job_id, state, JobKind::Create).await
}

pub(crate) async fn validate(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    report(job_id, state, JobKind::Validate).await
}

pub(crate) async fn approve(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    report(job_id, state, JobKind::Approve).await
}
