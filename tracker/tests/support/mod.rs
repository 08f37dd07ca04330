use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tracker::fake::FakeTransport;
use tracker::{JobEndpoint, JobTracker, Phase, TokioRuntime, TrackerConfig, TrackerState};

pub const BASE: &str = "/api/suggestion/bulk";

pub type TestTracker = JobTracker<FakeTransport, TokioRuntime>;

/// Runs `test` on a `LocalSet`, which the tracker needs for its `!Send` tasks.
pub async fn local<F: Future<Output = ()>>(test: F) {
    LocalSet::new().run_until(test).await;
}

/// Lets paused tokio time run far enough for any scripted job to finish.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(30)).await;
}

pub fn bulk_tracker(transport: &Rc<FakeTransport>, config: TrackerConfig) -> TestTracker {
    JobTracker::new(
        transport.clone(),
        Rc::new(TokioRuntime::new()),
        JobEndpoint::bulk(BASE),
        config,
    )
}

/// Every snapshot a tracker published, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    states: Rc<RefCell<Vec<TrackerState>>>,
}

impl Recorder {
    pub fn attach(tracker: &TestTracker) -> Self {
        let recorder = Recorder::default();
        let sink = recorder.states.clone();
        tracker.on_state_change(move |state| sink.borrow_mut().push(state.clone()));
        recorder
    }

    pub fn states(&self) -> Vec<TrackerState> {
        self.states.borrow().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.states.borrow().iter().map(TrackerState::phase).collect()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.states
            .borrow()
            .iter()
            .filter(|state| state.phase() == Phase::Polling)
            .filter_map(|state| state.progress().map(|p| p.fraction))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }
}
