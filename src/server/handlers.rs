use super::{multipart::read_form, pages, AppState};
use crate::{
    error::Result,
    models::{RefineSubmission, RenderFailure, RenderOutcome, RenderState, RenderSubmission},
};
use actix_multipart::Multipart;
use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;

/// HTTP status for an outcome on the JSON API.
pub fn outcome_status(outcome: &RenderOutcome) -> StatusCode {
    match outcome.failure() {
        None => StatusCode::OK,
        Some(RenderFailure::Invalid(_)) => StatusCode::BAD_REQUEST,
        Some(RenderFailure::NotAPlan { .. }) | Some(RenderFailure::SafetyBlocked) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Some(RenderFailure::TimedOut) => StatusCode::GATEWAY_TIMEOUT,
        Some(RenderFailure::NoImage)
        | Some(RenderFailure::Service(_))
        | Some(RenderFailure::Unexpected) => StatusCode::BAD_GATEWAY,
    }
}

pub fn outcome_response(outcome: &RenderOutcome) -> HttpResponse {
    HttpResponse::build(outcome_status(outcome)).json(outcome)
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Runs one dashboard submission through Idle -> Submitting -> terminal.
fn settle(outcome: RenderOutcome) -> RenderState {
    RenderState::Idle
        .begin()
        .and_then(|submitting| submitting.finish(outcome))
        .unwrap_or_default()
}

pub async fn landing() -> Result<HttpResponse> {
    Ok(html(pages::landing()?))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn dashboard(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(html(pages::dashboard(&RenderState::Idle, &state.service)?))
}

pub async fn submit_dashboard(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let outcome = match read_form(payload, state.max_upload_bytes).await {
        Ok(form) => state.service.render(&form.into_submission()).await,
        Err(failure) => failure.into(),
    };
    Ok(html(pages::dashboard(&settle(outcome), &state.service)?))
}

pub async fn refine_dashboard(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let outcome = match read_form(payload, state.max_upload_bytes).await {
        Ok(form) => state.service.refine(&form.into_refinement()).await,
        Err(failure) => failure.into(),
    };
    Ok(html(pages::dashboard(&settle(outcome), &state.service)?))
}

pub async fn create_render(
    state: web::Data<AppState>,
    body: web::Json<RenderSubmission>,
) -> HttpResponse {
    outcome_response(&state.service.render(&body).await)
}

pub async fn create_render_from_form(
    state: web::Data<AppState>,
    payload: Multipart,
) -> HttpResponse {
    let outcome = match read_form(payload, state.max_upload_bytes).await {
        Ok(form) => state.service.render(&form.into_submission()).await,
        Err(failure) => failure.into(),
    };
    outcome_response(&outcome)
}

pub async fn refine_render(
    state: web::Data<AppState>,
    body: web::Json<RefineSubmission>,
) -> HttpResponse {
    outcome_response(&state.service.refine(&body).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerationRequest, RenderBackend};
    use crate::models::{DataUri, PlanVerdict};
    use crate::pipeline::RenderService;
    use crate::prompt::PromptTemplate;
    use crate::server::{json_config, routes};
    use actix_web::{http::header, test, App};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    const SKETCH: &str = "data:image/png;base64,iVBORw0KGgo=";
    const RENDER: &str = "data:image/png;base64,R0lGODlh";
    const BOUNDARY: &str = "graphite-test-boundary";

    struct ScriptedBackend {
        error: Option<&'static str>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                error: None,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: &'static str) -> Arc<Self> {
            Arc::new(Self {
                error: Some(error),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RenderBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn classify_sketch(&self, _sketch: &DataUri) -> crate::error::Result<PlanVerdict> {
            Ok(PlanVerdict::plan("looks like a plan"))
        }

        async fn generate_render(
            &self,
            request: GenerationRequest,
        ) -> crate::error::Result<Option<DataUri>> {
            self.seen.lock().unwrap().push(request);
            match self.error {
                Some(text) => Err(crate::error::GraphiteError::ServiceError(text.into())),
                None => Ok(Some(RENDER.parse().unwrap())),
            }
        }
    }

    fn state(backend: Arc<ScriptedBackend>, max_upload_bytes: usize) -> web::Data<AppState> {
        let service = RenderService::new(backend, PromptTemplate::default());
        web::Data::new(AppState::new(service, max_upload_bytes))
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, mime, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                            name, mime
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, parts: &[Part]) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(parts))
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedBackend::ok(), 1024))
                .configure(routes),
        )
        .await;
        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn json_render_success() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 1024 * 1024))
                .app_data(json_config(1024 * 1024))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/renders")
            .set_json(json!({ "sketchDataUri": SKETCH, "textPrompt": "brick facade" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["renderDataUri"], RENDER);
        assert!(backend.seen.lock().unwrap()[0].prompt.contains("brick facade"));
    }

    #[actix_web::test]
    async fn json_render_without_sketch_is_bad_request() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 1024 * 1024))
                .app_data(json_config(1024 * 1024))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/renders")
            .set_json(json!({ "textPrompt": "brick facade" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["kind"], "invalid");
        assert_eq!(body["error"], "Sketch is required.");
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn malformed_json_is_reported_as_invalid() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedBackend::ok(), 1024))
                .app_data(json_config(1024))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/renders")
            .insert_header(header::ContentType::json())
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "invalid");
    }

    #[actix_web::test]
    async fn service_failures_map_to_status_codes() {
        let cases = [
            ("SAFETY: blocked", StatusCode::UNPROCESSABLE_ENTITY, "safety_blocked"),
            ("DEADLINE_EXCEEDED: slow", StatusCode::GATEWAY_TIMEOUT, "timed_out"),
            ("UNAVAILABLE: overloaded", StatusCode::BAD_GATEWAY, "service"),
        ];
        for (error, status, kind) in cases {
            let app = test::init_service(
                App::new()
                    .app_data(state(ScriptedBackend::failing(error), 1024 * 1024))
                    .app_data(json_config(1024 * 1024))
                    .configure(routes),
            )
            .await;
            let req = test::TestRequest::post()
                .uri("/api/renders")
                .set_json(json!({ "sketchDataUri": SKETCH }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), status);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["kind"], kind);
        }
    }

    #[actix_web::test]
    async fn form_upload_converts_files_to_data_uris() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 1024))
                .configure(routes),
        )
        .await;

        let req = multipart_request(
            "/api/renders/form",
            &[
                Part::File("sketch", "image/png", b"\x89PNG\r\n\x1a\n"),
                Part::Text("textPrompt", "open plan kitchen"),
                Part::Text("moodBoardDataUri[]", "data:image/jpeg;base64,/9j/4AA="),
            ],
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].images.len(), 2);
        assert_eq!(seen[0].images[0].mime_type(), "image/png");
        assert_eq!(seen[0].images[0].decode().unwrap(), b"\x89PNG\r\n\x1a\n");
        assert_eq!(seen[0].images[1].mime_type(), "image/jpeg");
        assert!(seen[0].prompt.contains("open plan kitchen"));
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 4))
                .configure(routes),
        )
        .await;

        let req = multipart_request(
            "/api/renders/form",
            &[Part::File("sketch", "image/png", b"\x89PNG\r\n\x1a\n")],
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Sketch exceeds the 4 bytes upload limit.");
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn fifth_mood_board_image_stops_the_upload() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 1024))
                .configure(routes),
        )
        .await;

        let image: &[u8] = b"\x89PNG\r\n\x1a\n";
        let mut parts = vec![Part::File("sketch", "image/png", image)];
        for _ in 0..40 {
            parts.push(Part::File("moodBoard", "image/png", image));
        }
        let resp = test::call_service(&app, multipart_request("/api/renders/form", &parts).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "You can upload at most 4 mood board images.");
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn mixed_mood_board_sources_share_the_limit() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 1024))
                .configure(routes),
        )
        .await;

        let image: &[u8] = b"\x89PNG\r\n\x1a\n";
        let mood = "data:image/jpeg;base64,/9j/4AA=";
        let parts = [
            Part::Text("sketchDataUri", SKETCH),
            Part::File("moodBoard", "image/png", image),
            Part::File("moodBoard", "image/png", image),
            Part::Text("moodBoardDataUri[]", mood),
            Part::Text("moodBoardDataUri[]", ""),
            Part::Text("moodBoardDataUri[]", mood),
            Part::Text("moodBoardDataUri[]", mood),
        ];
        let resp = test::call_service(&app, multipart_request("/api/renders/form", &parts).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "You can upload at most 4 mood board images.");
    }

    #[actix_web::test]
    async fn unknown_fields_are_skipped_whatever_their_size() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 16))
                .configure(routes),
        )
        .await;

        let notes = "x".repeat(8 * 1024);
        let req = multipart_request(
            "/api/renders/form",
            &[
                Part::Text("notes", &notes),
                Part::File("sketch", "image/png", b"\x89PNG\r\n\x1a\n"),
            ],
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn dashboard_shows_render_or_error() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedBackend::ok(), 1024))
                .configure(routes),
        )
        .await;

        let req = multipart_request(
            "/dashboard",
            &[Part::File("sketch", "image/png", b"\x89PNG\r\n\x1a\n")],
        )
        .to_request();
        let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
        assert!(html.contains("alt=\"Generated 3D Render\""));

        let req = multipart_request("/dashboard", &[Part::Text("textPrompt", "no sketch")])
            .to_request();
        let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
        assert!(html.contains("Generation Failed"));
        assert!(html.contains("Sketch is required."));
    }

    #[actix_web::test]
    async fn refine_api_uses_the_existing_render() {
        let backend = ScriptedBackend::ok();
        let app = test::init_service(
            App::new()
                .app_data(state(backend.clone(), 1024 * 1024))
                .app_data(json_config(1024 * 1024))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/renders/refine")
            .set_json(json!({ "renderDataUri": RENDER, "textPrompt": "add a balcony" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].images[0].to_string(), RENDER);
        assert!(seen[0].prompt.contains("add a balcony"));
    }

    #[actix_web::test]
    async fn landing_and_dashboard_pages_render() {
        let app = test::init_service(
            App::new()
                .app_data(state(ScriptedBackend::ok(), 1024))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/dashboard").to_request();
        let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
        assert!(html.contains("Generate Render"));
    }
}
