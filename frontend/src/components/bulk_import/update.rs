//! Update function for the bulk import screen.
//!
//! Starting, retrying and cancelling a job only talk to its `JobTracker`; every
//! visible change arrives later as `Msg::StateChanged` from the tracker's
//! listener. User-facing messages are in Spanish.

use gloo_file::{futures::read_as_bytes, Blob};
use tracker::{JobEndpoint, JobRequest, Phase, TrackerConfig, TrackerState};
use yew::prelude::*;

use super::helpers::{default_mapping, job_title, parse_mapping, show_toast, summarize};
use super::messages::{BulkJob, Msg};
use super::state::{tracker_for, BulkImportComponent};

pub fn update(
    component: &mut BulkImportComponent,
    ctx: &Context<BulkImportComponent>,
    msg: Msg,
) -> bool {
    match msg {
        Msg::FileSelected(file) => {
            let name = file.name();
            let link = ctx.link().clone();
            wasm_bindgen_futures::spawn_local(async move {
                let blob = Blob::from(file);
                match read_as_bytes(&blob).await {
                    Ok(bytes) => link.send_message(Msg::FileLoaded { name, bytes }),
                    Err(err) => link.send_message(Msg::FileFailed(err.to_string())),
                }
            });
            false
        }
        Msg::FileLoaded { name, bytes } => {
            let mapping = default_mapping(&bytes);
            component.mapping_text =
                serde_json::to_string_pretty(&mapping).unwrap_or_default();
            component.file = Some(super::state::SelectedFile { name, bytes });
            true
        }
        Msg::FileFailed(err) => {
            gloo_console::error!(format!("could not read CSV: {}", err));
            show_toast("No se pudo leer el archivo CSV.");
            false
        }
        Msg::UpdateMapping(text) => {
            component.mapping_text = text;
            false
        }
        Msg::Start(BulkJob::Approve) => {
            start_approve(component, ctx);
            true
        }
        Msg::Start(job) => {
            let Some(file) = &component.file else {
                show_toast("Selecciona un archivo CSV primero.");
                return false;
            };
            let mapping = match parse_mapping(&component.mapping_text) {
                Ok(mapping) => mapping,
                Err(err) => {
                    show_toast(&err);
                    return false;
                }
            };
            let request = JobRequest::csv_upload(file.name.clone(), file.bytes.clone(), &mapping);
            start(component, job, request);
            true
        }
        Msg::Retry(job) => {
            let last = match job {
                BulkJob::Validate => component.last_validate.clone(),
                BulkJob::Create => component.last_create.clone(),
                BulkJob::Approve => Some(JobRequest::Empty),
            };
            match (last, component.tracker_of(job)) {
                (Some(request), Some(tracker)) => {
                    tracker.start(request);
                }
                _ => show_toast("No hay nada que reintentar."),
            }
            false
        }
        Msg::Cancel(job) => {
            if let Some(tracker) = component.tracker_of(job) {
                tracker.cancel();
            }
            false
        }
        Msg::StateChanged(job, state) => {
            notify(job, &state);
            if job == BulkJob::Create && state.phase() == Phase::Submitting {
                // A new create job invalidates the approval of the previous one.
                if let Some(approve) = component.approve.take() {
                    approve.cancel();
                }
                component.approve_state = TrackerState::idle();
            }
            match job {
                BulkJob::Validate => component.validate_state = state,
                BulkJob::Create => component.create_state = state,
                BulkJob::Approve => component.approve_state = state,
            }
            true
        }
    }
}

fn start(component: &mut BulkImportComponent, job: BulkJob, request: JobRequest) {
    let (tracker, last) = match job {
        BulkJob::Validate => (&component.validate, &mut component.last_validate),
        BulkJob::Create => (&component.create, &mut component.last_create),
        BulkJob::Approve => return,
    };
    if tracker.start(request.clone()) {
        *last = Some(request);
    } else {
        show_toast(&format!("{} ya está en curso.", job_title(job)));
    }
}

/// Approves the suggestions of the last finished create job.
fn start_approve(component: &mut BulkImportComponent, ctx: &Context<BulkImportComponent>) {
    let created = match (component.create_state.phase(), component.create_state.handle()) {
        (Phase::Done, Some(handle)) => handle.job_id.clone(),
        _ => {
            show_toast("Primero crea las sugerencias.");
            return;
        }
    };
    if component.approve.as_ref().is_some_and(|t| t.is_active()) {
        show_toast(&format!("{} ya está en curso.", job_title(BulkJob::Approve)));
        return;
    }
    let tracker = tracker_for(
        ctx.link(),
        BulkJob::Approve,
        JobEndpoint::approve(&component.api_base, &created),
        TrackerConfig::bulk_approve(),
    );
    tracker.start(JobRequest::Empty);
    component.approve = Some(tracker);
}

fn notify(job: BulkJob, state: &TrackerState) {
    match state.phase() {
        Phase::Done => {
            let summary = state
                .result()
                .map(|result| summarize(job, result))
                .unwrap_or_default();
            show_toast(&format!("{} terminada: {}", job_title(job), summary));
        }
        Phase::Failed => {
            if let Some(err) = state.error() {
                gloo_console::error!(format!("{:?} job failed: {}", job, err));
                show_toast(&format!("{} falló: {}", job_title(job), err));
            }
        }
        _ => {}
    }
}
