//! HTTP API gateway for taskling.
//!
//! Exposes the chat endpoint and conversation management as a versioned
//! `/v1` API, plus an unauthenticated health check.
//!
//! Built on Axum; everything request-scoped flows through [`GatewayState`].

pub mod api_v1;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use taskling_agent::Orchestrator;
use taskling_config::{AppConfig, AuthConfig};
use taskling_core::model::ModelClient;
use taskling_core::store::ConversationStore;
use taskling_core::task::UserId;
use taskling_model::OpenAiCompatClient;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub conversations: Arc<dyn ConversationStore>,
    pub auth: AuthConfig,
}

pub type SharedState = Arc<GatewayState>;

/// The user a bearer token resolved to, attached to the request by the
/// auth middleware and read back by every `/v1` handler.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub UserId);

/// Build the full router: open health check plus the authenticated v1 API.
///
/// Security layers applied:
/// - Bearer token authentication on all /v1 routes
/// - Request body size limit (1 MB)
/// - CORS locked to same-origin use
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let v1 = api_v1::v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    // CORS: same-origin only; there is no browser frontend to allow.
    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the store, model client, and orchestrator once from config and
/// shares them via `Arc` with every request.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let (tasks, conversations) = taskling_store::build_from_config(&config.store).await?;

    let model: Arc<dyn ModelClient> = Arc::new(OpenAiCompatClient::new(
        config.model.base_url.clone(),
        config.model.api_key.clone().unwrap_or_default(),
        config.model.request_timeout_secs,
    ));

    if config.auth.tokens.is_empty() {
        warn!("No [auth.tokens] configured; every /v1 request will be rejected");
    }

    let orchestrator = Arc::new(Orchestrator::new(
        model,
        tasks,
        conversations.clone(),
        &config,
    ));

    let state = Arc::new(GatewayState {
        orchestrator,
        conversations,
        auth: config.auth.clone(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Authentication middleware for the /v1 API.
///
/// Resolves `Authorization: Bearer <token>` against the static token table
/// and attaches the resulting [`AuthedUser`] to the request. An empty token
/// table fails closed: every request is rejected.
async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<api_v1::ErrorResponse>)> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.and_then(|t| state.auth.resolve(t)) {
        Some(user) => {
            let caller = AuthedUser(UserId::new(user));
            req.extensions_mut().insert(caller);
            Ok(next.run(req).await)
        }
        None => {
            warn!("Unauthorized request to /v1 API; missing or unknown bearer token");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(api_v1::ErrorResponse {
                    error: "unauthorized".into(),
                    message: "A valid bearer token is required".into(),
                }),
            ))
        }
    }
}
