pub mod handlers;
pub mod multipart;
pub mod pages;

use crate::{
    config::Config,
    error::Result,
    models::{RenderFailure, RenderOutcome},
    pipeline::RenderService,
    validation::MAX_MOOD_BOARD_IMAGES,
};
use actix_web::{
    dev::Service,
    error::InternalError,
    http::header::{HeaderName, HeaderValue},
    web, App, HttpServer,
};
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared per-worker state.
pub struct AppState {
    pub service: RenderService,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: RenderService, max_upload_bytes: usize) -> Self {
        Self {
            service,
            max_upload_bytes,
        }
    }
}

/// JSON bodies carry a sketch plus mood board images as base64 text.
/// Unparseable bodies are answered with an `invalid` outcome.
pub fn json_config(max_upload_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(json_body_limit(max_upload_bytes))
        .error_handler(|err, _req| {
            let outcome = RenderOutcome::from(RenderFailure::Invalid(format!(
                "Invalid request body: {}",
                err
            )));
            let response = handlers::outcome_response(&outcome);
            InternalError::from_response(err, response).into()
        })
}

/// Room for a sketch, a full mood board and the text prompt, all encoded.
pub fn json_body_limit(max_upload_bytes: usize) -> usize {
    multipart::encoded_limit(max_upload_bytes)
        .saturating_mul(MAX_MOOD_BOARD_IMAGES + 1)
        .saturating_add(64 * 1024)
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::landing))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::resource("/dashboard")
                .route(web::get().to(handlers::dashboard))
                .route(web::post().to(handlers::submit_dashboard)),
        )
        .route("/dashboard/refine", web::post().to(handlers::refine_dashboard))
        .service(
            web::scope("/api/renders")
                .route("", web::post().to(handlers::create_render))
                .route("/form", web::post().to(handlers::create_render_from_form))
                .route("/refine", web::post().to(handlers::refine_render)),
        );
}

pub async fn run(config: &Config, service: RenderService) -> Result<()> {
    let max_upload_bytes = config.max_upload_bytes;
    let state = web::Data::new(AppState::new(service, max_upload_bytes));
    let addr = (config.host.clone(), config.port());

    log::info!("🌐 Listening on http://{}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config(max_upload_bytes))
            .wrap_fn(|req, srv| {
                let request_id = Uuid::new_v4().to_string();
                let method = req.method().clone();
                let path = req.path().to_string();
                let started = Instant::now();
                let fut = srv.call(req);
                async move {
                    let mut res = fut.await?;
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        res.headers_mut()
                            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }
                    log::info!(
                        "[{}] {} {} -> {} in {}ms",
                        request_id,
                        method,
                        path,
                        res.status().as_u16(),
                        started.elapsed().as_millis()
                    );
                    Ok(res)
                }
            })
            .configure(routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
