//! Job poller.
//!
//! Polls `{progress_base}/{id}` with a self-rescheduling timer: wait one
//! interval, issue one request, handle its answer, and only then wait again.
//! A slow server therefore never sees overlapping requests for the same job,
//! and completion can't be detected out of order.
//!
//! The loop ends on the first of:
//! - a response with `future.done == true` (emits `Completed`),
//! - a response that is a bare JSON array (emits `CompletedInline`),
//! - a failed or undecodable tick (emits `Failed`, no retry),
//! - the optional maximum polling duration, including a request still
//!   pending when it runs out (emits `Failed(Timeout)`),
//! - [`CancelToken::cancel`] (emits nothing, ever again).

use crate::config::{JobEndpoint, TrackerConfig};
use crate::error::TrackerError;
use crate::runtime::Runtime;
use crate::state::{JobHandle, JobProgress};
use crate::transport::{HttpRequest, Transport};
use common::jobs::ProgressReport;
use futures_util::future::{select, AbortHandle, Abortable, Either};
use futures_util::FutureExt;
use log::{debug, warn};
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum PollEvent {
    Progress(JobProgress),
    /// The server finished the job; the result must be fetched separately.
    Completed,
    /// The server finished the job and answered the poll with the result.
    CompletedInline(Value),
    Failed(TrackerError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_duration: Option<Duration>,
}

impl From<&TrackerConfig> for PollSchedule {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_duration: config.max_poll_duration,
        }
    }
}

/// Stops a running poller.
///
/// Cancelling is idempotent. Once `cancel` returns, the poller's callback is
/// never invoked again, even if a request it issued resolves later.
#[derive(Clone, Debug)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
    abort: AbortHandle,
}

impl CancelToken {
    pub fn cancel(&self) {
        if !self.cancelled.replace(true) {
            self.abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Spawns the polling loop for `handle` on `runtime`.
pub fn poll<T, R, F>(
    transport: Rc<T>,
    runtime: Rc<R>,
    endpoint: &JobEndpoint,
    handle: &JobHandle,
    schedule: PollSchedule,
    on_event: F,
) -> CancelToken
where
    T: Transport + ?Sized + 'static,
    R: Runtime + ?Sized + 'static,
    F: FnMut(PollEvent) + 'static,
{
    let url = endpoint.progress_url(&handle.job_id);
    let cancelled = Rc::new(Cell::new(false));
    let (abort, registration) = AbortHandle::new_pair();

    let task = poll_loop(
        transport,
        runtime.clone(),
        url,
        schedule,
        cancelled.clone(),
        on_event,
    );
    runtime.spawn(Abortable::new(task, registration).map(|_| ()).boxed_local());

    CancelToken { cancelled, abort }
}

async fn poll_loop<T, R, F>(
    transport: Rc<T>,
    runtime: Rc<R>,
    url: String,
    schedule: PollSchedule,
    cancelled: Rc<Cell<bool>>,
    mut on_event: F,
) where
    T: Transport + ?Sized,
    R: Runtime + ?Sized,
    F: FnMut(PollEvent),
{
    // A listener may cancel from inside a callback, so check before each one.
    let mut emit = |event: PollEvent| {
        if !cancelled.get() {
            on_event(event);
        }
    };
    let started = runtime.now();
    let mut tick: u64 = 0;

    loop {
        runtime.sleep(schedule.interval).await;
        if cancelled.get() {
            return;
        }

        let waited = runtime.now().saturating_sub(started);
        if let Some(max) = schedule.max_duration {
            if waited >= max {
                warn!("giving up on {url} after {} ms", waited.as_millis());
                emit(PollEvent::Failed(TrackerError::Timeout { waited }));
                return;
            }
        }

        tick += 1;
        debug!("poll tick {tick}: GET {url}");
        let request = transport.send(HttpRequest::get(url.clone()));
        let reply = match schedule.max_duration {
            None => request.await,
            // A request that never answers must not outlive the budget.
            Some(max) => {
                let budget = runtime.sleep(max.saturating_sub(waited));
                match select(request, budget).await {
                    Either::Left((reply, _)) => reply,
                    Either::Right(((), _)) => {
                        let waited = runtime.now().saturating_sub(started);
                        warn!("tick {tick} of {url} unanswered after {} ms", waited.as_millis());
                        emit(PollEvent::Failed(TrackerError::Timeout { waited }));
                        return;
                    }
                }
            }
        };
        if cancelled.get() {
            debug!("discarding tick {tick} of {url}: poller cancelled");
            return;
        }

        match reply.and_then(decode_tick) {
            Ok(Tick::Running(progress)) => emit(PollEvent::Progress(progress)),
            Ok(Tick::Done(progress)) => {
                if let Some(progress) = progress {
                    emit(PollEvent::Progress(progress));
                }
                emit(PollEvent::Completed);
                return;
            }
            Ok(Tick::Inline(result)) => {
                emit(PollEvent::CompletedInline(result));
                return;
            }
            Err(err) => {
                warn!("poll tick {tick} of {url} failed: {err}");
                emit(PollEvent::Failed(err));
                return;
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Tick {
    Running(JobProgress),
    Done(Option<JobProgress>),
    Inline(Value),
}

fn decode_tick(body: Value) -> Result<Tick, TrackerError> {
    if body.is_array() {
        return Ok(Tick::Inline(body));
    }
    if !body.is_object() {
        return Err(TrackerError::malformed(format!(
            "expected a progress object, got {body}"
        )));
    }

    let report: ProgressReport = serde_json::from_value(body.clone())?;
    let progress = match report.progress {
        Some(fraction) => Some(
            JobProgress::new(fraction, body)
                .ok_or_else(|| TrackerError::malformed("progress is not a finite number"))?,
        ),
        None => None,
    };

    match (report.is_done(), progress) {
        (true, progress) => Ok(Tick::Done(progress)),
        (false, Some(progress)) => Ok(Tick::Running(progress)),
        (false, None) => Err(TrackerError::malformed(
            "poll response has neither progress nor completion marker",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTransport;
    use crate::runtime::TokioRuntime;
    use crate::transport::Method;
    use common::jobs::JobId;
    use serde_json::json;
    use std::cell::RefCell;
    use tokio::task::LocalSet;

    const URL: &str = "/bulk/progress/42";

    fn handle() -> JobHandle {
        JobHandle {
            job_id: JobId::from(42),
            submitted_at: Duration::ZERO,
        }
    }

    fn schedule() -> PollSchedule {
        PollSchedule {
            interval: Duration::from_millis(100),
            max_duration: None,
        }
    }

    fn start(
        transport: &Rc<FakeTransport>,
        schedule: PollSchedule,
    ) -> (CancelToken, Rc<RefCell<Vec<PollEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let token = poll(
            transport.clone(),
            Rc::new(TokioRuntime::new()),
            &JobEndpoint::bulk("/bulk"),
            &handle(),
            schedule,
            move |event| sink.borrow_mut().push(event),
        );
        (token, events)
    }

    fn fractions(events: &[PollEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|event| match event {
                PollEvent::Progress(p) => Some(p.fraction),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn reports_progress_then_stops_on_done() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(FakeTransport::new());
                for fraction in [0.1, 0.4, 0.4] {
                    transport.reply_json(Method::Get, URL, json!({ "progress": fraction }));
                }
                transport.reply_json(
                    Method::Get,
                    URL,
                    json!({ "progress": 0.9, "future": { "done": true } }),
                );
                transport.reply_json(Method::Get, URL, json!({ "progress": 1.0 }));

                let (_token, events) = start(&transport, schedule());
                tokio::time::sleep(Duration::from_secs(5)).await;

                let events = events.borrow();
                assert_eq!(fractions(&events), vec![0.1, 0.4, 0.4, 0.9]);
                assert_eq!(events.last(), Some(&PollEvent::Completed));
                assert_eq!(transport.count(Method::Get, URL), 4);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_failed_tick_ends_polling() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(FakeTransport::new());
                transport.reply_json(Method::Get, URL, json!({ "progress": 0.2 }));
                transport.reply(Method::Get, URL, Err(TrackerError::Network("reset".into())));
                transport.reply_json(Method::Get, URL, json!({ "progress": 0.6 }));

                let (_token, events) = start(&transport, schedule());
                tokio::time::sleep(Duration::from_secs(5)).await;

                assert_eq!(
                    events.borrow().last(),
                    Some(&PollEvent::Failed(TrackerError::Network("reset".into())))
                );
                assert_eq!(transport.count(Method::Get, URL), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_silences_in_flight_tick() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(FakeTransport::new());
                transport.reply_json(Method::Get, URL, json!({ "progress": 0.3 }));
                let late = transport.gate(Method::Get, URL);

                let (token, events) = start(&transport, schedule());
                tokio::time::sleep(Duration::from_millis(250)).await;
                assert_eq!(transport.count(Method::Get, URL), 2);

                token.cancel();
                token.cancel();
                assert!(token.is_cancelled());
                let _ = late.send(Ok(json!({ "progress": 1, "future": { "done": true } })));
                tokio::time::sleep(Duration::from_secs(5)).await;

                assert_eq!(fractions(&events.borrow()), vec![0.3]);
                assert_eq!(events.borrow().len(), 1);
                assert_eq!(transport.count(Method::Get, URL), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_never_overlap() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(FakeTransport::new());
                let slow = transport.gate(Method::Get, URL);
                transport.reply_json(Method::Get, URL, json!({ "future": { "done": true } }));

                let (_token, events) = start(&transport, schedule());
                // Ten intervals go by while the first tick is still waiting.
                tokio::time::sleep(Duration::from_millis(1050)).await;
                assert_eq!(transport.count(Method::Get, URL), 1);

                let _ = slow.send(Ok(json!({ "progress": 0.5 })));
                tokio::time::sleep(Duration::from_secs(1)).await;

                assert_eq!(transport.count(Method::Get, URL), 2);
                assert_eq!(
                    *events.borrow(),
                    vec![
                        PollEvent::Progress(JobProgress::new(0.5, json!({ "progress": 0.5 })).unwrap()),
                        PollEvent::Completed
                    ]
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_duration() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(FakeTransport::new());
                for _ in 0..10 {
                    transport.reply_json(Method::Get, URL, json!({ "progress": 0.1 }));
                }
                let schedule = PollSchedule {
                    interval: Duration::from_millis(100),
                    max_duration: Some(Duration::from_millis(350)),
                };

                let (_token, events) = start(&transport, schedule);
                tokio::time::sleep(Duration::from_secs(5)).await;

                let events = events.borrow();
                assert_eq!(fractions(&events).len(), 3);
                assert!(matches!(
                    events.last(),
                    Some(PollEvent::Failed(TrackerError::Timeout { .. }))
                ));
                assert_eq!(transport.count(Method::Get, URL), 3);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_tick_times_out() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(FakeTransport::new());
                let _never = transport.gate(Method::Get, URL);
                let schedule = PollSchedule {
                    interval: Duration::from_millis(100),
                    max_duration: Some(Duration::from_secs(1)),
                };

                let (_token, events) = start(&transport, schedule);
                tokio::time::sleep(Duration::from_secs(600)).await;

                assert_eq!(transport.count(Method::Get, URL), 1);
                assert!(matches!(
                    events.borrow().as_slice(),
                    [PollEvent::Failed(TrackerError::Timeout { waited })]
                        if *waited >= Duration::from_secs(1) && *waited < Duration::from_secs(2)
                ));
            })
            .await;
    }

    #[test]
    fn decodes_completion_conventions() {
        assert_eq!(
            decode_tick(json!([{ "id": 1 }])).unwrap(),
            Tick::Inline(json!([{ "id": 1 }]))
        );
        assert_eq!(
            decode_tick(json!({ "future": { "done": true } })).unwrap(),
            Tick::Done(None)
        );
        assert!(matches!(
            decode_tick(json!({ "future": { "done": false } })),
            Err(TrackerError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_tick(json!({ "progress": "half" })),
            Err(TrackerError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_tick(json!("ok")),
            Err(TrackerError::MalformedResponse(_))
        ));
    }
}
