//! HTTP API gateway for Master Mind.
//!
//! Exposes the enhancement pipeline and direct memory search under
//! `/api/v1`, plus health checks. Built on Axum.

pub mod api_v1;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header, request::Parts};
use axum::{Router, response::Json, routing::get};
use mastermind_config::{AppConfig, EnhancementConfig, GatewayConfig};
use mastermind_enhance::Enhancer;
use mastermind_memory::Mem0Client;
use mastermind_providers::OpenAiCompatProvider;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub enhancer: Enhancer,
    /// Request limit defaults and bounds
    pub limits: EnhancementConfig,
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router.
///
/// Layers applied:
/// - CORS for origins matching the configured prefixes
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes))
        .layer(cors_layer(gateway.allowed_origin_prefixes.clone()))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS allowing any origin that starts with one of `prefixes`.
fn cors_layer(prefixes: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|o| prefixes.iter().any(|p| o.starts_with(p.as_str())))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Builds the Mem0 client and the OpenAI provider from config; a missing
/// credential for either is fatal.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let memory = Mem0Client::from_config(&config.memory)?;
    let provider = OpenAiCompatProvider::from_config(&config.completion)?;

    let state = Arc::new(GatewayState {
        enhancer: Enhancer::new(
            Arc::new(memory),
            Arc::new(provider),
            config.completion.model.clone(),
        ),
        limits: config.enhancement.clone(),
    });

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.completion.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub(crate) async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: "mastermind".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: chrono::Utc::now(),
    })
}
