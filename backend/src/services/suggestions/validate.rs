//! `POST /api/suggestion/bulk/validate`: dry run of the bulk create checks.
//! Nothing is stored.

use super::rows::{check_rows, read_table};
use super::upload::{read_bulk_upload, BulkUpload};
use crate::config::ServerConfig;
use crate::job_controller::runner::{schedule_job, JobReporter};
use crate::job_controller::state::{JobKind, JobsState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::{JobAccepted, JobId};
use common::model::suggestion::BulkValidationResult;
use serde_json::Value;

pub(crate) async fn process(
    jobs: web::Data<JobsState>,
    config: web::Data<ServerConfig>,
    payload: Multipart,
) -> impl Responder {
    match read_bulk_upload(payload, config.max_upload_bytes).await {
        Ok(upload) => {
            let chunk_size = config.chunk_size;
            let job_id = schedule_job(&jobs, JobKind::Validate, move |reporter| {
                validate_blocking(reporter, upload, chunk_size)
            })
            .await;
            HttpResponse::Ok().json(JobAccepted {
                id: JobId::new(job_id),
            })
        }
        Err(e) => e.to_response(),
    }
}

fn validate_blocking(
    reporter: &JobReporter,
    upload: BulkUpload,
    chunk_size: usize,
) -> Result<Value, String> {
    let table = read_table(&upload.bytes)?;
    let outcome = check_rows(&table, &upload.mapping, chunk_size, |done, total| {
        reporter.progress(done, total)
    })?;
    let result = BulkValidationResult {
        id: JobId::new(reporter.job_id()),
        valid_rows: outcome.accepted.len(),
        issues: outcome.issues,
    };
    serde_json::to_value(result).map_err(|e| e.to_string())
}
