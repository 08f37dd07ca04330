//! The job tracker: submit, poll, fetch, publish.
//!
//! A [`JobTracker`] owns one job at a time. `start` moves it through
//! Submitting, Polling and FetchingResult to Done or Failed, and every accepted
//! transition is delivered to the listeners as a fresh [`TrackerState`].
//!
//! Cancellation works through generations. Every asynchronous continuation
//! (submission response, poll event, result response) remembers the
//! generation it was started for, and `cancel` bumps the counter. A stale
//! continuation finds a different generation and is dropped without touching
//! the state. Spawned work is additionally aborted so timers and requests
//! don't outlive the job.

use crate::config::{JobEndpoint, TrackerConfig};
use crate::error::TrackerError;
use crate::fetch::fetch_result;
use crate::machine::{self, TrackerEvent};
use crate::poller::{self, CancelToken, PollEvent, PollSchedule};
use crate::runtime::Runtime;
use crate::state::{JobHandle, JobOutcome, TrackerState};
use crate::submit::submit;
use crate::transport::{JobRequest, Transport};
use futures_util::future::{AbortHandle, Abortable};
use futures_util::FutureExt;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&TrackerState)>;

/// Handle to a tracker. Clones share the same job and listeners; the job is
/// cancelled when the last clone is dropped.
pub struct JobTracker<T: ?Sized, R: ?Sized> {
    shared: Rc<Shared<T, R>>,
}

impl<T: ?Sized, R: ?Sized> Clone for JobTracker<T, R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

struct Shared<T: ?Sized, R: ?Sized> {
    endpoint: JobEndpoint,
    config: TrackerConfig,
    transport: Rc<T>,
    runtime: Rc<R>,
    inner: RefCell<Inner>,
}

struct Inner {
    state: TrackerState,
    generation: u64,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    poller: Option<CancelToken>,
    in_flight: Option<AbortHandle>,
}

impl<T, R> JobTracker<T, R>
where
    T: Transport + ?Sized + 'static,
    R: Runtime + ?Sized + 'static,
{
    pub fn new(
        transport: Rc<T>,
        runtime: Rc<R>,
        endpoint: JobEndpoint,
        config: TrackerConfig,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                endpoint,
                config,
                transport,
                runtime,
                inner: RefCell::new(Inner {
                    state: TrackerState::idle(),
                    generation: 0,
                    listeners: Vec::new(),
                    next_listener: 0,
                    poller: None,
                    in_flight: None,
                }),
            }),
        }
    }

    pub fn endpoint(&self) -> &JobEndpoint {
        &self.shared.endpoint
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    /// The latest snapshot.
    pub fn state(&self) -> TrackerState {
        self.shared.inner.borrow().state.clone()
    }

    pub fn is_active(&self) -> bool {
        self.shared.inner.borrow().state.phase().is_active()
    }

    /// Registers a listener called once per transition, in registration order.
    pub fn on_state_change(&self, listener: impl Fn(&TrackerState) + 'static) -> ListenerId {
        let mut inner = self.shared.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.shared.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    /// Submits `request` as a new job.
    ///
    /// Accepted from Idle, Done and Failed. Returns `false` and leaves the
    /// running job alone when one is already in flight.
    pub fn start(&self, request: JobRequest) -> bool {
        let generation = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.state.phase().is_active() {
                warn!(
                    "{} already has a job in phase {}",
                    self.shared.endpoint.submit_url,
                    inner.state.phase()
                );
                return false;
            }
            inner.generation += 1;
            inner.generation
        };
        if !self.shared.dispatch(generation, TrackerEvent::Start) {
            return false;
        }

        let weak = Rc::downgrade(&self.shared);
        let transport = self.shared.transport.clone();
        let endpoint = self.shared.endpoint.clone();
        let now = self.shared.runtime.now();
        Shared::spawn_tracked(&self.shared, generation, async move {
            let submitted = submit(&*transport, &endpoint, request, now).await;
            if let Some(shared) = weak.upgrade() {
                Shared::on_submitted(&shared, generation, submitted);
            }
        });
        true
    }

    /// Stops the current job and returns to Idle. Calling it again, or while
    /// idle, does nothing.
    pub fn cancel(&self) {
        self.shared.cancel();
    }
}

impl<T, R> Shared<T, R>
where
    T: Transport + ?Sized + 'static,
    R: Runtime + ?Sized + 'static,
{
    fn is_current(&self, generation: u64) -> bool {
        self.inner.borrow().generation == generation
    }

    /// Applies `event` if it belongs to the current job and is valid in the
    /// current phase, then notifies listeners outside the borrow so they may
    /// call back into the tracker.
    fn dispatch(&self, generation: u64, event: TrackerEvent) -> bool {
        let (snapshot, listeners) = {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation {
                debug!("dropping stale event for {}", self.endpoint.submit_url);
                return false;
            }
            let Some(next) = machine::apply(&inner.state, event) else {
                debug!(
                    "event ignored in phase {} for {}",
                    inner.state.phase(),
                    self.endpoint.submit_url
                );
                return false;
            };
            inner.state = next.clone();
            let listeners: Vec<Listener> =
                inner.listeners.iter().map(|(_, l)| l.clone()).collect();
            (next, listeners)
        };

        debug!("{} -> {}", self.endpoint.submit_url, snapshot.phase());
        for listener in listeners {
            listener(&snapshot);
        }
        true
    }

    fn spawn_tracked(this: &Rc<Self>, generation: u64, task: impl Future<Output = ()> + 'static) {
        let (abort, registration) = AbortHandle::new_pair();
        {
            let mut inner = this.inner.borrow_mut();
            if inner.generation != generation {
                return;
            }
            inner.in_flight = Some(abort);
        }
        this.runtime
            .spawn(Abortable::new(task, registration).map(|_| ()).boxed_local());
    }

    fn on_submitted(this: &Rc<Self>, generation: u64, submitted: Result<JobHandle, TrackerError>) {
        let handle = match submitted {
            Ok(handle) => handle,
            Err(error) => {
                warn!("submitting to {} failed: {error}", this.endpoint.submit_url);
                this.dispatch(generation, TrackerEvent::SubmitFailed(error));
                return;
            }
        };

        // A listener may have cancelled while being told about Polling.
        if !this.dispatch(generation, TrackerEvent::Submitted(handle.clone()))
            || !this.is_current(generation)
        {
            return;
        }

        let weak = Rc::downgrade(this);
        let token = poller::poll(
            this.transport.clone(),
            this.runtime.clone(),
            &this.endpoint,
            &handle,
            PollSchedule::from(&this.config),
            move |event| {
                if let Some(shared) = weak.upgrade() {
                    Shared::on_poll_event(&shared, generation, event);
                }
            },
        );

        let mut inner = this.inner.borrow_mut();
        if inner.generation == generation {
            inner.poller = Some(token);
        } else {
            token.cancel();
        }
    }

    fn on_poll_event(this: &Rc<Self>, generation: u64, event: PollEvent) {
        match event {
            PollEvent::Progress(progress) => {
                this.dispatch(generation, TrackerEvent::Progress(progress));
            }
            PollEvent::Completed => {
                this.release_poller(generation);
                if this.dispatch(generation, TrackerEvent::PollCompleted) {
                    Shared::fetch(this, generation);
                }
            }
            PollEvent::CompletedInline(result) => {
                this.release_poller(generation);
                info!("{} finished with an inline result", this.endpoint.submit_url);
                this.dispatch(generation, TrackerEvent::InlineResult(result));
            }
            PollEvent::Failed(error) => {
                this.release_poller(generation);
                this.dispatch(generation, TrackerEvent::PollFailed(error));
            }
        }
    }

    fn fetch(this: &Rc<Self>, generation: u64) {
        let handle = {
            let inner = this.inner.borrow();
            if inner.generation != generation {
                return;
            }
            match inner.state.handle() {
                Some(handle) => handle.clone(),
                None => return,
            }
        };

        let weak = Rc::downgrade(this);
        let transport = this.transport.clone();
        let endpoint = this.endpoint.clone();
        Shared::spawn_tracked(this, generation, async move {
            let outcome = fetch_result(&*transport, &endpoint, &handle).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let event = match outcome {
                JobOutcome::Success { result } => {
                    info!("job {} done", handle.job_id);
                    TrackerEvent::ResultFetched(result)
                }
                JobOutcome::Failure { error } => {
                    warn!("fetching result of job {} failed: {error}", handle.job_id);
                    TrackerEvent::ResultFailed(error)
                }
            };
            shared.dispatch(generation, event);
        });
    }

    /// The poller stops by itself after its last event; forget its token.
    fn release_poller(&self, generation: u64) {
        let mut inner = self.inner.borrow_mut();
        if inner.generation == generation {
            inner.poller = None;
        }
    }

    fn cancel(&self) {
        let (generation, poller, in_flight) = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            (inner.generation, inner.poller.take(), inner.in_flight.take())
        };
        if let Some(poller) = poller {
            poller.cancel();
        }
        if let Some(in_flight) = in_flight {
            in_flight.abort();
        }
        if self.dispatch(generation, TrackerEvent::Cancel) {
            info!("{} cancelled", self.endpoint.submit_url);
        }
    }
}

impl<T: ?Sized, R: ?Sized> Drop for Shared<T, R> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(poller) = inner.poller.take() {
            poller.cancel();
        }
        if let Some(in_flight) = inner.in_flight.take() {
            in_flight.abort();
        }
    }
}
