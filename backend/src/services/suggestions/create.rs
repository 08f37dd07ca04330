//! `POST /api/suggestion/bulk`: turns every valid CSV row into a monument
//! create suggestion.
//!
//! The upload is read and its header checked synchronously; row checks and
//! storage run as a background job whose result is a `BulkCreateResult`.

use super::rows::{check_rows, read_table};
use super::store::SuggestionStore;
use super::upload::{read_bulk_upload, BulkUpload};
use crate::config::ServerConfig;
use crate::job_controller::runner::{schedule_job, JobReporter};
use crate::job_controller::state::{JobKind, JobsState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::{JobAccepted, JobId};
use common::model::suggestion::BulkCreateResult;
use serde_json::Value;
use std::sync::Arc;

pub(crate) async fn process(
    jobs: web::Data<JobsState>,
    store: web::Data<SuggestionStore>,
    config: web::Data<ServerConfig>,
    payload: Multipart,
) -> impl Responder {
    let upload = match read_bulk_upload(payload, config.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(e) => return e.to_response(),
    };
    log::info!(
        "bulk create upload {} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let store = store.into_inner();
    let chunk_size = config.chunk_size;
    let job_id = schedule_job(&jobs, JobKind::Create, move |reporter| {
        create_suggestions_blocking(reporter, &store, upload, chunk_size)
    })
    .await;
    HttpResponse::Ok().json(JobAccepted {
        id: JobId::new(job_id),
    })
}

fn create_suggestions_blocking(
    reporter: &JobReporter,
    store: &Arc<SuggestionStore>,
    upload: BulkUpload,
    chunk_size: usize,
) -> Result<Value, String> {
    let table = read_table(&upload.bytes)?;
    let outcome = check_rows(&table, &upload.mapping, chunk_size, |done, total| {
        reporter.progress(done, total)
    })?;

    let create_suggestions = store.insert_batch(reporter.job_id(), outcome.accepted)?;
    let result = BulkCreateResult {
        id: JobId::new(reporter.job_id()),
        create_suggestions,
        rejected_rows: outcome.issues,
    };
    serde_json::to_value(result).map_err(|e| e.to_string())
}
