mod support;

use serde_json::json;
use std::rc::Rc;
use std::time::Duration;
use support::{bulk_tracker, local, settle, Recorder, BASE};
use tracker::fake::FakeTransport;
use tracker::{
    JobEndpoint, JobId, JobRequest, JobTracker, Method, Phase, TokioRuntime, TrackerConfig,
    TrackerError,
};

const SUBMIT: &str = "/api/suggestion/bulk";
const PROGRESS_42: &str = "/api/suggestion/bulk/progress/42";
const RESULT_42: &str = "/api/suggestion/bulk/result/42";

fn csv_request() -> JobRequest {
    JobRequest::csv_upload(
        "monuments.csv",
        b"Nombre,Lat\nTorre,40.4\n".to_vec(),
        &json!({ "columns": { "Nombre": { "field": "name", "required": true } } }),
    )
}

#[tokio::test(start_paused = true)]
async fn csv_import_ends_done_with_the_fetched_payload() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": 0.5 }));
        transport.reply_json(
            Method::Get,
            PROGRESS_42,
            json!({ "progress": 1, "future": { "done": true } }),
        );
        let payload = json!({ "id": 42, "createSuggestions": [{ "id": 1, "row": 1 }] });
        transport.reply_json(Method::Get, RESULT_42, payload.clone());

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        assert!(tracker.start(csv_request()));
        settle().await;

        assert_eq!(
            recorder.phases(),
            vec![
                Phase::Submitting,
                Phase::Polling,
                Phase::Polling,
                Phase::Polling,
                Phase::FetchingResult,
                Phase::Done
            ]
        );
        let state = tracker.state();
        assert_eq!(state.result(), Some(&payload));
        assert_eq!(state.handle().map(|h| h.job_id.clone()), Some(JobId::from(42)));
        assert_eq!(state.fraction(), 1.0);

        let submitted = &transport.calls()[0];
        assert_eq!(submitted.method, Method::Post);
        assert_eq!(submitted.body, csv_request());
        assert_eq!(transport.count(Method::Get, RESULT_42), 1);
        assert_eq!(transport.count(Method::Get, PROGRESS_42), 2);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn progress_is_published_exactly_as_reported() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        for fraction in [0.1, 0.4, 0.4] {
            transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": fraction }));
        }
        transport.reply_json(
            Method::Get,
            PROGRESS_42,
            json!({ "progress": 0.9, "future": { "done": true } }),
        );
        transport.reply_json(Method::Get, RESULT_42, json!({ "id": 42 }));

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        settle().await;

        assert_eq!(recorder.fractions(), vec![0.1, 0.4, 0.4, 0.9]);
        assert_eq!(tracker.state().phase(), Phase::Done);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn server_error_on_submit_fails_without_polling() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply(
            Method::Post,
            SUBMIT,
            Err(TrackerError::from_status(500, "Internal Server Error")),
        );

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        settle().await;

        assert_eq!(recorder.phases(), vec![Phase::Submitting, Phase::Failed]);
        assert!(matches!(
            tracker.state().error(),
            Some(TrackerError::Server { status: 500, .. })
        ));
        assert!(tracker.state().handle().is_none());
        assert_eq!(transport.calls().len(), 1);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn network_error_on_third_tick_stops_the_job() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": 0.2 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": 0.4 }));
        transport.reply(
            Method::Get,
            PROGRESS_42,
            Err(TrackerError::Network("connection reset".into())),
        );
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": 0.8 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "future": { "done": true } }));

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        settle().await;

        assert_eq!(recorder.phases().last(), Some(&Phase::Failed));
        assert_eq!(
            tracker.state().error(),
            Some(&TrackerError::Network("connection reset".into()))
        );
        assert_eq!(tracker.state().fraction(), 0.4);
        assert_eq!(transport.count(Method::Get, PROGRESS_42), 3);
        assert_eq!(transport.count(Method::Get, RESULT_42), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn cancel_while_polling_ignores_the_late_response() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": 0.3 }));
        let late = transport.gate(Method::Get, PROGRESS_42);

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(tracker.state().fraction(), 0.3);

        tracker.cancel();
        assert_eq!(tracker.state().phase(), Phase::Idle);
        let published = recorder.len();

        let _ = late.send(Ok(json!({ "progress": 1, "future": { "done": true } })));
        settle().await;

        assert_eq!(recorder.len(), published);
        assert_eq!(tracker.state().phase(), Phase::Idle);
        assert!(tracker.state().handle().is_none());
        assert_eq!(transport.count(Method::Get, RESULT_42), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn cancelling_twice_is_the_same_as_once() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        let _never = transport.gate(Method::Get, PROGRESS_42);

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        tokio::time::sleep(Duration::from_millis(150)).await;

        tracker.cancel();
        let after_first = recorder.phases();
        tracker.cancel();
        settle().await;

        assert_eq!(recorder.phases(), after_first);
        assert_eq!(after_first.last(), Some(&Phase::Idle));
        assert_eq!(
            after_first.iter().filter(|phase| **phase == Phase::Idle).count(),
            1
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn cancel_during_submission_discards_the_job_id() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        let accepted = transport.gate(Method::Post, SUBMIT);

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker.cancel();

        let _ = accepted.send(Ok(json!({ "id": 42 })));
        settle().await;

        assert_eq!(recorder.phases(), vec![Phase::Submitting, Phase::Idle]);
        assert_eq!(transport.count(Method::Get, PROGRESS_42), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn cancel_during_result_fetch_discards_the_result() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "future": { "done": true } }));
        let result = transport.gate(Method::Get, RESULT_42);

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(tracker.state().phase(), Phase::FetchingResult);

        tracker.cancel();
        let _ = result.send(Ok(json!({ "id": 42 })));
        settle().await;

        assert_eq!(recorder.phases().last(), Some(&Phase::Idle));
        assert!(tracker.state().outcome().is_none());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_trackers_stay_isolated() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        let validate_base = "/api/suggestion/bulk/validate";
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 1 }));
        transport.reply_json(Method::Post, validate_base, json!({ "id": 2 }));
        transport.reply_json(Method::Get, "/api/suggestion/bulk/progress/1", json!({ "progress": 0.5 }));
        transport.reply(
            Method::Get,
            "/api/suggestion/bulk/progress/1",
            Err(TrackerError::Network("offline".into())),
        );
        transport.reply_json(
            Method::Get,
            "/api/suggestion/bulk/validate/progress/2",
            json!({ "progress": 0.7 }),
        );
        transport.reply_json(
            Method::Get,
            "/api/suggestion/bulk/validate/progress/2",
            json!({ "future": { "done": true } }),
        );
        transport.reply_json(
            Method::Get,
            "/api/suggestion/bulk/validate/result/2",
            json!({ "id": 2, "validRows": 3, "issues": [] }),
        );

        let create = bulk_tracker(&transport, TrackerConfig::bulk_create());
        let validate = JobTracker::new(
            transport.clone(),
            Rc::new(TokioRuntime::new()),
            JobEndpoint::validate(BASE),
            TrackerConfig::bulk_validate(),
        );
        let create_log = Recorder::attach(&create);
        let validate_log = Recorder::attach(&validate);
        create.start(csv_request());
        validate.start(csv_request());
        settle().await;

        assert_eq!(create.state().phase(), Phase::Failed);
        assert_eq!(validate.state().phase(), Phase::Done);
        assert_eq!(create_log.fractions(), vec![0.5]);
        assert_eq!(validate_log.fractions(), vec![0.7]);
        assert!(create_log
            .states()
            .iter()
            .filter_map(|s| s.handle())
            .all(|h| h.job_id == JobId::from(1)));
        assert!(validate_log
            .states()
            .iter()
            .filter_map(|s| s.handle())
            .all(|h| h.job_id == JobId::from(2)));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn stuck_job_times_out() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        for _ in 0..50 {
            transport.reply_json(Method::Get, PROGRESS_42, json!({ "progress": 0.1 }));
        }
        let config = TrackerConfig::bulk_create().with_max_poll_duration(Duration::from_secs(1));

        let tracker = bulk_tracker(&transport, config);
        tracker.start(csv_request());
        settle().await;

        assert!(matches!(
            tracker.state().error(),
            Some(TrackerError::Timeout { waited }) if *waited >= Duration::from_secs(1)
        ));
        assert!(transport.count(Method::Get, PROGRESS_42) <= 10);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn hung_progress_request_still_times_out() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        let _never = transport.gate(Method::Get, PROGRESS_42);
        let config = TrackerConfig::bulk_create().with_max_poll_duration(Duration::from_secs(1));

        let tracker = bulk_tracker(&transport, config);
        let recorder = Recorder::attach(&tracker);
        tracker.start(csv_request());
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(
            recorder.phases(),
            vec![Phase::Submitting, Phase::Polling, Phase::Failed]
        );
        assert!(matches!(
            tracker.state().error(),
            Some(TrackerError::Timeout { waited }) if *waited >= Duration::from_secs(1)
        ));
        assert_eq!(transport.count(Method::Get, PROGRESS_42), 1);
        assert_eq!(transport.count(Method::Get, RESULT_42), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn approve_with_inline_result_skips_the_result_fetch() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply_json(Method::Put, "/api/suggestion/bulk/42/approve", json!({ "id": 7 }));
        transport.reply_json(
            Method::Get,
            "/api/suggestion/bulk/approve/progress/7",
            json!({ "progress": 0.5 }),
        );
        transport.reply_json(
            Method::Get,
            "/api/suggestion/bulk/approve/progress/7",
            json!([{ "id": 1 }, { "id": 2 }]),
        );

        let tracker = JobTracker::new(
            transport.clone(),
            Rc::new(TokioRuntime::new()),
            JobEndpoint::approve(BASE, &JobId::from(42)),
            TrackerConfig::bulk_approve(),
        );
        let recorder = Recorder::attach(&tracker);
        tracker.start(JobRequest::Empty);
        settle().await;

        assert_eq!(
            recorder.phases(),
            vec![Phase::Submitting, Phase::Polling, Phase::Polling, Phase::Done]
        );
        assert_eq!(tracker.state().result(), Some(&json!([{ "id": 1 }, { "id": 2 }])));
        assert_eq!(
            transport.count(Method::Get, "/api/suggestion/bulk/approve/result/7"),
            0
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn failed_tracker_can_be_started_again() {
    local(async {
        let transport = Rc::new(FakeTransport::new());
        transport.reply(Method::Post, SUBMIT, Err(TrackerError::Network("offline".into())));
        transport.reply_json(Method::Post, SUBMIT, json!({ "id": 42 }));
        transport.reply_json(Method::Get, PROGRESS_42, json!({ "future": { "done": true } }));
        transport.reply_json(Method::Get, RESULT_42, json!({ "id": 42 }));

        let tracker = bulk_tracker(&transport, TrackerConfig::bulk_create());
        tracker.start(csv_request());
        settle().await;
        assert_eq!(tracker.state().phase(), Phase::Failed);
        assert!(tracker.state().error().is_some_and(TrackerError::is_retryable));

        assert!(tracker.start(csv_request()));
        settle().await;
        assert_eq!(tracker.state().phase(), Phase::Done);
        assert_eq!(transport.count(Method::Post, SUBMIT), 2);
    })
    .await;
}
