//! Scripted in-memory [`Transport`] for tests and demos.
//!
//! Responses are queued per `(method, url)` and consumed in order. A gated
//! response stays pending until the test releases it, which is how races
//! between cancellation and a late answer are reproduced.

use crate::error::TrackerError;
use crate::transport::{HttpRequest, Method, Transport};
use async_trait::async_trait;
use futures_channel::oneshot;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

type Reply = Result<Value, TrackerError>;

enum Script {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

#[derive(Default)]
pub struct FakeTransport {
    scripts: RefCell<HashMap<(Method, String), VecDeque<Script>>>,
    calls: RefCell<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: Method, url: &str, reply: Reply) {
        self.push(method, url, Script::Ready(reply));
    }

    pub fn reply_json(&self, method: Method, url: &str, body: Value) {
        self.reply(method, url, Ok(body));
    }

    /// Queues a response that is only delivered once the returned sender fires.
    pub fn gate(&self, method: Method, url: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.push(method, url, Script::Gated(rx));
        tx
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.method == method && call.url == url)
            .count()
    }

    fn push(&self, method: Method, url: &str, script: Script) {
        self.scripts
            .borrow_mut()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(script);
    }
}

#[async_trait(?Send)]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TrackerError> {
        let key = (request.method, request.url.clone());
        self.calls.borrow_mut().push(request);
        let script = self
            .scripts
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        match script {
            Some(Script::Ready(reply)) => reply,
            Some(Script::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(TrackerError::Network("gate dropped".into()))),
            None => Err(TrackerError::Network(format!(
                "no scripted response for {} {}",
                key.0, key.1
            ))),
        }
    }
}
