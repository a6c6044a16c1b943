//! HTTP handlers. `/chat` is the single conversational entry point; the
//! response body is always the envelope, status 200, with the error
//! taxonomy carried in its `code` field.

use crate::dtos::ChatRequest;
use crate::startup::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

/// Header carrying the caller's opaque session identifier. Minted and
/// echoed back when the caller sends none.
pub const SESSION_HEADER: &str = "x-session-id";

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "assistant-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}

#[tracing::instrument(skip_all, fields(session_id))]
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::Span::current().record("session_id", session_id.as_str());

    let envelope = state.orchestrator.handle(&session_id, &request.query).await;

    let header_value = HeaderValue::from_str(&session_id)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid session id: {}", e)))?;

    let mut response = Json(envelope).into_response();
    response.headers_mut().insert(SESSION_HEADER, header_value);
    Ok(response)
}
