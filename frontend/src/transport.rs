//! `Transport` over the browser `fetch` API (gloo-net).
//!
//! Multipart bodies are built as a `FormData`, so the browser picks the
//! boundary and sets the `Content-Type` header itself.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde_json::Value;
use tracker::{FormPart, HttpRequest, JobRequest, Method, TrackerError, Transport};
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, FormData};

#[derive(Clone, Copy, Debug, Default)]
pub struct GlooTransport;

fn network(err: gloo_net::Error) -> TrackerError {
    TrackerError::Network(err.to_string())
}

fn js_error(err: JsValue) -> TrackerError {
    TrackerError::Network(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

fn builder(method: Method, url: &str) -> RequestBuilder {
    match method {
        Method::Get => Request::get(url),
        Method::Post => Request::post(url),
        Method::Put => Request::put(url),
    }
}

/// Builds the `FormData` of a multipart job request.
fn form_data(parts: &[FormPart]) -> Result<FormData, TrackerError> {
    let form = FormData::new().map_err(js_error)?;
    for part in parts {
        match part {
            FormPart::Text { name, value } => {
                form.append_with_str(name, value).map_err(js_error)?;
            }
            FormPart::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                let chunks = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
                let options = BlobPropertyBag::new();
                options.set_type(content_type);
                let blob = Blob::new_with_u8_array_sequence_and_options(&chunks, &options)
                    .map_err(js_error)?;
                form.append_with_blob_and_filename(name, &blob, filename)
                    .map_err(js_error)?;
            }
        }
    }
    Ok(form)
}

async fn decode(response: Response) -> Result<Value, TrackerError> {
    if !response.ok() {
        let body = response.text().await.unwrap_or_default();
        return Err(TrackerError::from_status(response.status(), body));
    }
    let text = response.text().await.map_err(network)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

#[async_trait(?Send)]
impl Transport for GlooTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TrackerError> {
        let builder = builder(request.method, &request.url);
        let response = match request.body {
            JobRequest::Empty => builder.send().await,
            JobRequest::Json(body) => builder.json(&body).map_err(network)?.send().await,
            JobRequest::Multipart(parts) => {
                builder
                    .body(form_data(&parts)?)
                    .map_err(network)?
                    .send()
                    .await
            }
        }
        .map_err(network)?;
        decode(response).await
    }
}
