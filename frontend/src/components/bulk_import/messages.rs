use tracker::TrackerState;

/// The three bulk jobs shown on the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkJob {
    Validate,
    Create,
    Approve,
}

pub enum Msg {
    FileSelected(web_sys::File),
    FileLoaded { name: String, bytes: Vec<u8> },
    FileFailed(String),
    UpdateMapping(String),
    Start(BulkJob),
    Retry(BulkJob),
    Cancel(BulkJob),
    StateChanged(BulkJob, TrackerState),
}
