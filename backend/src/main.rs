mod config;
mod job_controller;
mod services;

use crate::config::ServerConfig;
use crate::job_controller::state::{JobKind, JobsState};
use crate::services::suggestions::store::SuggestionStore;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use env_logger::Env;
use include_dir::{include_dir, Dir};
use log::info;
use mime_guess::from_path;
use std::thread;
use std::time::Duration;

static STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static/dist");

async fn serve_embedded(req: HttpRequest) -> HttpResponse {
    let path = req.path().trim_start_matches('/');
    let file_path = if path.is_empty() { "index.html" } else { path };

    match STATIC_DIR.get_file(file_path) {
        Some(file) => {
            let mime = from_path(file_path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.as_ref())
                .body(file.contents().to_vec())
        }
        None => match STATIC_DIR.get_file("index.html") {
            Some(index) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(index.contents().to_vec()),
            None => HttpResponse::NotFound().body("Not Found"),
        },
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = ServerConfig::from_env();
    let url = config.url();

    if config.open_browser {
        let url = url.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            if let Err(e) = webbrowser::open(&url) {
                log::warn!("could not open browser: {}", e);
            }
        });
    }

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(config.channel_capacity);

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let store = web::Data::new(SuggestionStore::default());

    // Finished jobs, and the batches of create jobs, expire after the TTL
    let swept_store = store.clone();
    tokio::spawn(job_controller::state::start_job_sweeper(
        jobs_state.clone(),
        config.job_ttl,
        move |job_id, kind| {
            if kind == JobKind::Create {
                if let Err(e) = swept_store.remove_batch(job_id) {
                    log::error!("could not drop batch of {}: {}", job_id, e);
                }
            }
        },
    ));
    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);

    info!("Server running at {}", url);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(store.clone())
            .app_data(config.clone())
            .service(services::suggestions::configure_routes())
            .default_service(web::route().to(serve_embedded))
    })
    .bind(bind)?
    .run()
    .await
}
