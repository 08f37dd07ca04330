//! HTTP API of the monument bulk suggestion workflow.
//!
//! Every operation is a background job registered in `JobsState`. The
//! starting endpoint answers `{ "id": job_id }`, and the client then polls the
//! matching `progress` route until `future.done` and reads the `result` route.
//!
//! - `POST /api/suggestion/bulk`: multipart `mapping` (JSON) + `file` (CSV).
//!   Stores one suggestion per valid row.
//! - `POST /api/suggestion/bulk/validate`: same upload, checks only.
//! - `PUT /api/suggestion/bulk/{job_id}/approve`: approves the suggestions of a
//!   finished create job.
//! - `GET .../progress/{job_id}` and `GET .../result/{job_id}` for each of the
//!   three job kinds (`""`, `/validate`, `/approve` prefixes).

use actix_web::web::{get, post, put, scope};
use actix_web::Scope;

mod approve;
mod create;
mod progress;
mod result;
mod rows;
pub mod store;
mod upload;
mod validate;

const API_PATH: &str = "/api/suggestion/bulk";

/// Configures and returns the Actix scope for bulk suggestion routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("/progress/{job_id}", get().to(progress::create))
        .route("/result/{job_id}", get().to(result::create))
        .route("/validate", post().to(validate::process))
        .route("/validate/progress/{job_id}", get().to(progress::validate))
        .route("/validate/result/{job_id}", get().to(result::validate))
        .route("/{job_id}/approve", put().to(approve::process))
        .route("/approve/progress/{job_id}", get().to(progress::approve))
        .route("/approve/result/{job_id}", get().to(result::approve))
}
