use common::model::suggestion::{BulkApprovalResult, BulkCreateResult, BulkValidationResult};
use common::requests::{BulkMapping, ColumnMapping, FieldKind};
use serde_json::Value;
use tracker::Phase;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use super::messages::BulkJob;

/// Displays a temporary notification message at the bottom of the screen.
///
/// Used by `update.rs` to report finished and failed jobs. The toast removes
/// itself after a few seconds.
pub fn show_toast(message: &str) {
    if let Some(window) = web_sys::window() {
        if let Some(document) = window.document() {
            if let (Ok(toast), Some(body)) = (document.create_element("div"), document.body()) {
                toast.set_text_content(Some(message));
                let html_toast: HtmlElement = toast.unchecked_into();
                let style = html_toast.style();
                style.set_property("position", "fixed").ok();
                style.set_property("bottom", "20px").ok();
                style.set_property("left", "50%").ok();
                style.set_property("transform", "translateX(-50%)").ok();
                style.set_property("background", "rgba(0, 0, 0, 0.8)").ok();
                style.set_property("color", "#fff").ok();
                style.set_property("padding", "10px 20px").ok();
                style.set_property("border-radius", "4px").ok();
                style.set_property("z-index", "10000").ok();
                style.set_property("font-family", "Arial, sans-serif").ok();

                if body.append_child(&html_toast).is_ok() {
                    wasm_bindgen_futures::spawn_local(async move {
                        gloo_timers::future::TimeoutFuture::new(3000).await;
                        if let Some(parent) = html_toast.parent_node() {
                            parent.remove_child(&html_toast).ok();
                        }
                    });
                }
            }
        }
    }
}

pub fn job_title(job: BulkJob) -> &'static str {
    match job {
        BulkJob::Validate => "Validación",
        BulkJob::Create => "Creación de sugerencias",
        BulkJob::Approve => "Aprobación",
    }
}

pub fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Sin iniciar",
        Phase::Submitting => "Enviando…",
        Phase::Polling => "En proceso",
        Phase::FetchingResult => "Obteniendo resultado…",
        Phase::Done => "Terminado",
        Phase::Failed => "Error",
    }
}

/// One-line summary of a finished job's result payload.
pub fn summarize(job: BulkJob, result: &Value) -> String {
    let summary = match job {
        BulkJob::Validate => serde_json::from_value::<BulkValidationResult>(result.clone())
            .map(|r| format!("{} filas válidas, {} con errores", r.valid_rows, r.issues.len())),
        BulkJob::Create => serde_json::from_value::<BulkCreateResult>(result.clone()).map(|r| {
            format!(
                "{} sugerencias creadas, {} filas rechazadas",
                r.create_suggestions.len(),
                r.rejected_rows.len()
            )
        }),
        BulkJob::Approve => serde_json::from_value::<BulkApprovalResult>(result.clone())
            .map(|r| format!("{} sugerencias aprobadas", r.approved.len())),
    };
    // Inline array results carry no summary fields.
    summary.unwrap_or_else(|_| match result {
        Value::Array(items) => format!("{} elementos", items.len()),
        _ => "Resultado recibido".to_string(),
    })
}

/// Mapping with one optional text column per CSV header title.
pub fn default_mapping(csv: &[u8]) -> BulkMapping {
    let text = String::from_utf8_lossy(csv);
    let header = text
        .trim_start_matches('\u{feff}')
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    let delimiter = [',', ';', '\t', '|']
        .into_iter()
        .max_by_key(|&d| header.matches(d).count())
        .filter(|&d| header.contains(d))
        .unwrap_or(',');

    let columns = header
        .split(delimiter)
        .map(|title| title.trim().trim_matches('"').to_string())
        .filter(|title| !title.is_empty())
        .map(|title| {
            let field = title.to_lowercase().replace(' ', "_");
            let column = ColumnMapping {
                field,
                kind: FieldKind::Text,
                required: false,
            };
            (title, column)
        })
        .collect();
    BulkMapping { columns }
}

/// Parses the mapping editor content, rejecting an empty mapping.
pub fn parse_mapping(text: &str) -> Result<Value, String> {
    let mapping: BulkMapping =
        serde_json::from_str(text).map_err(|e| format!("Mapeo inválido: {}", e))?;
    if mapping.is_empty() {
        return Err("El mapeo no tiene columnas".to_string());
    }
    serde_json::to_value(&mapping).map_err(|e| e.to_string())
}
