//! Runtime state of the bulk import screen.
//!
//! Each bulk job is driven by its own `JobTracker`; the component keeps the last
//! snapshot each tracker published so `view` can render without borrowing the
//! trackers.

use super::messages::{BulkJob, Msg};
use crate::runtime::BrowserRuntime;
use crate::transport::GlooTransport;
use std::rc::Rc;
use tracker::{JobEndpoint, JobRequest, JobTracker, TrackerConfig, TrackerState};
use yew::html::Scope;

pub type BrowserTracker = JobTracker<GlooTransport, BrowserRuntime>;

/// A CSV file read into memory.
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub struct BulkImportComponent {
    pub api_base: String,
    pub file: Option<SelectedFile>,
    /// JSON `BulkMapping` edited by the user.
    pub mapping_text: String,

    pub validate: BrowserTracker,
    pub create: BrowserTracker,
    /// Built once a create job has finished, since its URL embeds that job's ID.
    pub approve: Option<BrowserTracker>,

    pub validate_state: TrackerState,
    pub create_state: TrackerState,
    pub approve_state: TrackerState,

    /// Request each job was last started with, re-sent on retry.
    pub last_validate: Option<JobRequest>,
    pub last_create: Option<JobRequest>,
}

/// Builds a tracker whose snapshots come back as `Msg::StateChanged(job, _)`.
pub fn tracker_for(
    link: &Scope<BulkImportComponent>,
    job: BulkJob,
    endpoint: JobEndpoint,
    config: TrackerConfig,
) -> BrowserTracker {
    let tracker = JobTracker::new(
        Rc::new(GlooTransport),
        Rc::new(BrowserRuntime),
        endpoint,
        config,
    );
    let link = link.clone();
    tracker.on_state_change(move |state| link.send_message(Msg::StateChanged(job, state.clone())));
    tracker
}

impl BulkImportComponent {
    pub fn new(link: &Scope<BulkImportComponent>, api_base: &str) -> Self {
        BulkImportComponent {
            api_base: api_base.to_string(),
            file: None,
            mapping_text: String::new(),
            validate: tracker_for(
                link,
                BulkJob::Validate,
                JobEndpoint::validate(api_base),
                TrackerConfig::bulk_validate(),
            ),
            create: tracker_for(
                link,
                BulkJob::Create,
                JobEndpoint::bulk(api_base),
                TrackerConfig::bulk_create(),
            ),
            approve: None,
            validate_state: TrackerState::idle(),
            create_state: TrackerState::idle(),
            approve_state: TrackerState::idle(),
            last_validate: None,
            last_create: None,
        }
    }

    pub fn state_of(&self, job: BulkJob) -> &TrackerState {
        match job {
            BulkJob::Validate => &self.validate_state,
            BulkJob::Create => &self.create_state,
            BulkJob::Approve => &self.approve_state,
        }
    }

    pub fn tracker_of(&self, job: BulkJob) -> Option<&BrowserTracker> {
        match job {
            BulkJob::Validate => Some(&self.validate),
            BulkJob::Create => Some(&self.create),
            BulkJob::Approve => self.approve.as_ref(),
        }
    }

    /// Stops every job in flight; used when the screen goes away.
    pub fn cancel_all(&self) {
        self.validate.cancel();
        self.create.cancel();
        if let Some(approve) = &self.approve {
            approve.cancel();
        }
    }
}
