//! The HTTP collaborator seam.
//!
//! The tracker never talks to a concrete HTTP stack. It hands an
//! [`HttpRequest`] to a [`Transport`] and expects the decoded JSON body back,
//! or a [`TrackerError`] classifying what went wrong.

use crate::error::TrackerError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// One field of a `multipart/form-data` body.
#[derive(Clone, Debug, PartialEq)]
pub enum FormPart {
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    Text {
        name: String,
        value: String,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::File { name, .. } | FormPart::Text { name, .. } => name,
        }
    }
}

/// Payload that starts a job. Owned by the caller until it is handed to
/// `JobTracker::start`, never touched afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum JobRequest {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

impl JobRequest {
    /// The usual bulk upload: a CSV file plus its JSON mapping document.
    pub fn csv_upload(filename: impl Into<String>, csv: Vec<u8>, mapping: &Value) -> Self {
        JobRequest::Multipart(vec![
            FormPart::Text {
                name: "mapping".into(),
                value: mapping.to_string(),
            },
            FormPart::File {
                name: "file".into(),
                filename: filename.into(),
                content_type: "text/csv".into(),
                bytes: csv,
            },
        ])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: JobRequest,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: JobRequest::Empty,
        }
    }
}

/// Sends one request and decodes the JSON answer.
///
/// Implementations map failures onto the taxonomy: no response at all is
/// `Network`, a non-2xx status is `Server`, an undecodable 2xx body is
/// `MalformedResponse`.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TrackerError>;
}

#[async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for Rc<T> {
    async fn send(&self, request: HttpRequest) -> Result<Value, TrackerError> {
        (**self).send(request).await
    }
}
