//! HTTP endpoints.

use crate::error::{FeedbackError, TranslateError};
use crate::feedback::{FeedbackLoop, Issue};
use crate::gateway::TranslationGateway;
use crate::i18n::Language;
use crate::security::{check_api_key, AdminAccess, API_KEY_HEADER};
use crate::terminology::LegalDomain;
use crate::translation::TranslationRequest;
use anyhow::{Context, Result};
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<TranslationGateway>,
    pub feedback: Arc<FeedbackLoop>,
    pub api_key: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/translate", post(translate))
        .route("/feedback", post(submit_feedback))
        .route("/feedback/:id", get(get_feedback))
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .route("/admin/enhancements", get(list_enhancements))
        .route("/admin/enhancements/:id/rollback", post(rollback_enhancement))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on 0.0.0.0:{}", port);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    text: String,
    source_language: String,
    target_language: String,
    #[serde(default)]
    domain: Option<String>,
}

async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<impl IntoResponse, ApiError> {
    let domain = match body.domain.as_deref() {
        Some(name) => Some(
            LegalDomain::from_name(name)
                .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("unknown domain '{}'", name)))?,
        ),
        None => None,
    };

    let request = TranslationRequest::new(
        body.text,
        &body.source_language,
        &body.target_language,
        domain,
    )
    .map_err(translate_error)?;

    let result = state
        .gateway
        .translate(&request)
        .await
        .map_err(translate_error)?;
    Ok(Json(result))
}

fn translate_error(err: TranslateError) -> ApiError {
    match err {
        TranslateError::InvalidInput(_) => api_error(StatusCode::BAD_REQUEST, err.to_string()),
        TranslateError::Cancelled => api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    original_text: String,
    reported_text: String,
    issue: Issue,
    #[serde(default)]
    target_language: Option<String>,
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.reported_text.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "reported_text is empty"));
    }
    let target = match body.target_language.as_deref() {
        Some(code) => Some(
            Language::from_code(code).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        ),
        None => None,
    };

    let id = state.feedback.report_bad_translation(
        body.original_text,
        body.reported_text,
        body.issue,
        target,
    );
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .feedback
        .report(id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown report {}", id)))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = state.gateway.pipeline();
    Json(json!({
        "quality": state.gateway.monitor().snapshot(),
        "cache": pipeline.cache.stats(),
        "rules_version": pipeline.detector.version(),
        "dictionary_version": pipeline.terminology.version(),
        "purity_threshold": pipeline.validator.threshold(),
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    match check_api_key(state.api_key.as_deref(), provided) {
        AdminAccess::Granted => Ok(()),
        AdminAccess::Disabled => Err(api_error(StatusCode::FORBIDDEN, "admin API is disabled")),
        AdminAccess::Denied => {
            warn!("Rejected admin request with missing or invalid API key");
            Err(api_error(StatusCode::UNAUTHORIZED, "invalid API key"))
        }
    }
}

async fn list_enhancements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    Ok(Json(state.feedback.enhancements()))
}

async fn rollback_enhancement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    let enhancement = state.feedback.rollback(id).await.map_err(|e| {
        let status = match e {
            FeedbackError::UnknownEnhancement(_) => StatusCode::NOT_FOUND,
            FeedbackError::NotDeployed(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, e.to_string())
    })?;
    Ok(Json(enhancement))
}
