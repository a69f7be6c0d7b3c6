//! HTTP endpoints
//!
//! The one-shot question path, the predefined catalog, health, and
//! metrics. The WebSocket upgrade lives on the same router.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use totem_config::predefined_questions;

use crate::metrics;
use crate::state::AppState;
use crate::ws::ws_handler;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.server.cors_origins);

    Router::new()
        // continuous-call transport
        .route("/ws", get(ws_handler))
        // one-shot question path
        .route("/api/totem/question", post(process_question))
        .route("/api/totem/questions", get(list_predefined_questions))
        .route("/api/totem/questions/:id", post(process_predefined_question))
        .route("/api/totem/health", get(totem_health))
        // liveness + metrics
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        // middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Kiosk deployments run on a closed network; with no origins configured
/// the layer is permissive, otherwise only the configured origins pass.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                warn!(%origin, "invalid CORS origin ignored");
                None
            })
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// One-shot question request
#[derive(Debug, Deserialize)]
struct QuestionRequest {
    #[serde(default)]
    question: String,
    /// Optional index filter override
    filter: Option<String>,
    /// Optional system-prompt override
    prompt: Option<String>,
}

/// `POST /api/totem/question`
async fn process_question(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> impl IntoResponse {
    if !totem_kiosk::QuestionService::is_valid_question(&request.question) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": "La pregunta es requerida",
            })),
        );
    }

    info!(question = %request.question, "question received");
    let started = Instant::now();

    let answer = state
        .questions
        .process_question(
            &request.question,
            request.filter.as_deref(),
            request.prompt.as_deref(),
        )
        .await;

    metrics::record_question(started.elapsed(), answer.success);

    let status = if answer.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::to_value(answer).unwrap_or_default()))
}

/// `GET /api/totem/questions`
async fn list_predefined_questions() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "questions": predefined_questions(),
    }))
}

/// `POST /api/totem/questions/:id`: run a catalog question with its
/// prompt override
async fn process_predefined_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();

    match state.questions.process_predefined(&id).await {
        Some(answer) => {
            metrics::record_question(started.elapsed(), answer.success);
            let status = if answer.success {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(serde_json::to_value(answer).unwrap_or_default()))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": "Pregunta predefinida no encontrada",
            })),
        ),
    }
}

/// `GET /api/totem/health`: configuration presence plus live provider
/// probes
async fn totem_health(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.settings.key_presence();
    let services = state.questions.validate_services().await;
    let overall = config.all_present() && services.all_ok();

    let status = if overall {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "success": overall,
            "health": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "config": config,
                "services": services,
                "overall": overall,
            },
        })),
    )
}

/// `GET /health`
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /metrics`
async fn metrics_handler() -> impl IntoResponse {
    metrics::render()
}
