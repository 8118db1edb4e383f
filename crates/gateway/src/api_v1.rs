//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `GET  /api/v1/health`            — Service health
//! - `POST /api/v1/prompts/enhance`   — Enhance a prompt with the user's memories
//! - `POST /api/v1/memories/search`   — Search the user's memories directly
//!
//! Validation failures answer 422 with `{"detail": ...}`; pipeline failures
//! answer 500 with a fixed detail string.

use std::sync::LazyLock;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use mastermind_core::error::Error;
use mastermind_enhance::{EnhanceRequest, EnhancementResult, MemoryResult, SearchMemoriesRequest};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::SharedState;

static APP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,50}$").expect("valid regex"));

const MAX_USER_ID_CHARS: usize = 255;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/api/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(crate::health_handler))
        .route("/prompts/enhance", post(enhance_handler))
        .route("/memories/search", post(search_memories_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EnhanceBody {
    pub prompt: String,
    pub user_id: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    pub user_id: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<MemoryResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

fn unprocessable(detail: impl Into<String>) -> ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, detail)
}

/// Malformed JSON keeps axum's status; the body follows our error shape.
fn rejected(rejection: JsonRejection) -> ApiError {
    api_error(rejection.status(), rejection.body_text())
}

// ── Validation ────────────────────────────────────────────────────────────

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(unprocessable(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    require_text("user_id", user_id)?;
    if user_id.chars().count() > MAX_USER_ID_CHARS {
        return Err(unprocessable(format!(
            "user_id must be at most {MAX_USER_ID_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_app_id(app_id: Option<&str>) -> Result<(), ApiError> {
    match app_id {
        Some(id) if !APP_ID.is_match(id) => Err(unprocessable(
            "app_id must be 3-50 characters of letters, digits, '_' or '-'",
        )),
        _ => Ok(()),
    }
}

fn resolve_limit(limit: Option<usize>, state: &SharedState) -> Result<usize, ApiError> {
    let limit = limit.unwrap_or(state.limits.default_limit);
    if limit == 0 || limit > state.limits.max_limit {
        return Err(unprocessable(format!(
            "limit must be between 1 and {}",
            state.limits.max_limit
        )));
    }
    Ok(limit)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn enhance_handler(
    State(state): State<SharedState>,
    body: Result<Json<EnhanceBody>, JsonRejection>,
) -> Result<Json<EnhancementResult>, ApiError> {
    let Json(body) = body.map_err(rejected)?;

    require_text("prompt", &body.prompt)?;
    validate_user_id(&body.user_id)?;
    validate_app_id(body.app_id.as_deref())?;
    let limit = resolve_limit(body.limit, &state)?;

    let request = EnhanceRequest {
        prompt: body.prompt,
        user_id: body.user_id,
        app_id: body.app_id,
        run_id: body.run_id,
        limit,
    };

    match state.enhancer.enhance(request).await {
        Ok(result) => Ok(Json(result)),
        Err(Error::InvalidRequest(detail)) => Err(unprocessable(detail)),
        Err(e) => {
            error!(error = %e, "Enhancement failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Enhancement failed",
            ))
        }
    }
}

async fn search_memories_handler(
    State(state): State<SharedState>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(body) = body.map_err(rejected)?;

    require_text("query", &body.query)?;
    validate_user_id(&body.user_id)?;
    validate_app_id(body.app_id.as_deref())?;
    let limit = resolve_limit(body.limit, &state)?;

    let request = SearchMemoriesRequest {
        query: body.query,
        user_id: body.user_id,
        limit,
        app_id: body.app_id,
        run_id: body.run_id,
    };

    match state.enhancer.search(request).await {
        Ok(results) => {
            info!(results = results.len(), "Memory search served");
            Ok(Json(SearchResponse { results }))
        }
        Err(e) => {
            error!(error = %e, "Memory search failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Memory search failed",
            ))
        }
    }
}
