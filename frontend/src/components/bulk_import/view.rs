//! View rendering for the bulk import screen: file picker, mapping editor and
//! one panel per bulk job with its progress bar.

use super::helpers::{job_title, phase_label, summarize};
use super::messages::{BulkJob, Msg};
use super::state::BulkImportComponent;
use tracker::{Phase, TrackerState};
use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use yew::html::Scope;
use yew::prelude::*;

pub fn view(component: &BulkImportComponent, ctx: &Context<BulkImportComponent>) -> Html {
    let link = ctx.link();
    html! {
        <div class="bulk-import-root">
            <h2>{"Importación masiva de monumentos"}</h2>
            { build_file_picker(component, link) }
            { build_mapping_editor(component, link) }
            <div class="bulk-jobs">
                { job_panel(component, link, BulkJob::Validate, "fact_check", "Validar") }
                { job_panel(component, link, BulkJob::Create, "upload_file", "Crear sugerencias") }
                { job_panel(component, link, BulkJob::Approve, "done_all", "Aprobar") }
            </div>
        </div>
    }
}

fn build_file_picker(component: &BulkImportComponent, link: &Scope<BulkImportComponent>) -> Html {
    let onchange = link.batch_callback(|e: Event| {
        let input = e.target_unchecked_into::<HtmlInputElement>();
        input
            .files()
            .and_then(|files| files.get(0))
            .map(Msg::FileSelected)
            .into_iter()
            .collect::<Vec<_>>()
    });
    let selected = component
        .file
        .as_ref()
        .map(|f| format!("{} ({} bytes)", f.name, f.bytes.len()))
        .unwrap_or_else(|| "Ningún archivo seleccionado".to_string());

    html! {
        <div class="bulk-file">
            <label class="icon-btn wide">
                <i class="material-icons">{"table_chart"}</i>
                <span class="icon-label">{"Archivo CSV"}</span>
                <input type="file" accept=".csv,text/csv" style="display: none;" {onchange} />
            </label>
            <span class="bulk-file-name">{selected}</span>
        </div>
    }
}

fn build_mapping_editor(component: &BulkImportComponent, link: &Scope<BulkImportComponent>) -> Html {
    html! {
        <div class="bulk-mapping">
            <label>{"Mapeo de columnas (JSON)"}</label>
            <textarea
                id="bulk-mapping"
                value={component.mapping_text.clone()}
                spellcheck="false"
                rows={10}
                style="width: 100%; font-family: monospace;"
                oninput={link.callback(|e: InputEvent| {
                    Msg::UpdateMapping(e.target_unchecked_into::<HtmlTextAreaElement>().value())
                })}
            />
        </div>
    }
}

fn job_panel(
    component: &BulkImportComponent,
    link: &Scope<BulkImportComponent>,
    job: BulkJob,
    icon: &str,
    label: &str,
) -> Html {
    let state = component.state_of(job);
    let active = state.phase().is_active();
    let can_start = match job {
        BulkJob::Approve => component.create_state.phase() == Phase::Done,
        _ => component.file.is_some(),
    };

    html! {
        <div class={classes!("bulk-job", phase_class(state.phase()))}>
            <div class="bulk-job-header">
                <strong>{job_title(job)}</strong>
                <span class="bulk-job-phase">{phase_label(state.phase())}</span>
            </div>
            { progress_bar(state) }
            { outcome(job, state, link) }
            <div class="bulk-job-actions">
                <button
                    class="icon-btn"
                    disabled={active || !can_start}
                    onclick={link.callback(move |_| Msg::Start(job))}
                >
                    <i class="material-icons">{icon}</i>
                    <span class="icon-label">{label}</span>
                </button>
                if active {
                    <button class="icon-btn" onclick={link.callback(move |_| Msg::Cancel(job))}>
                        <i class="material-icons">{"cancel"}</i>
                        <span class="icon-label">{"Cancelar"}</span>
                    </button>
                }
            </div>
        </div>
    }
}

fn phase_class(phase: Phase) -> &'static str {
    match phase {
        Phase::Done => "done",
        Phase::Failed => "failed",
        p if p.is_active() => "active",
        _ => "idle",
    }
}

fn progress_bar(state: &TrackerState) -> Html {
    if state.phase() == Phase::Idle {
        return html! {};
    }
    let percent = (state.fraction() * 100.0).round() as u32;
    html! {
        <div class="progress" title={format!("{}%", percent)}
             style="background: #eee; border-radius: 4px; height: 8px; overflow: hidden;">
            <div style={format!("width: {}%; height: 100%; background: #1e88e5; transition: width 0.2s;", percent)} />
        </div>
    }
}

fn outcome(job: BulkJob, state: &TrackerState, link: &Scope<BulkImportComponent>) -> Html {
    if let Some(result) = state.result() {
        return html! { <p class="bulk-job-result">{summarize(job, result)}</p> };
    }
    match state.error() {
        Some(err) => html! {
            <div class="bulk-job-error" style="color: #e53935;">
                <p>{err.to_string()}</p>
                if err.is_retryable() {
                    <button class="icon-btn" onclick={link.callback(move |_| Msg::Retry(job))}>
                        <i class="material-icons">{"refresh"}</i>
                        <span class="icon-label">{"Reintentar"}</span>
                    </button>
                }
            </div>
        },
        None => html! {},
    }
}
