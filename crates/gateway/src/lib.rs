//! HTTP transport for LoopClaw.
//!
//! Turns the agent's event stream into Server-Sent Events, one SSE event per
//! Stream Event, and manages sessions over REST. There is no
//! authentication; bind to loopback unless something in front provides it.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use loopclaw_agent::{AgentLoop, DEFAULT_SYSTEM_PROMPT, SessionRegistry};
use loopclaw_config::AppConfig;
use loopclaw_providers::OpenAiCompatProvider;
use loopclaw_tools::{ToolExecutor, builtin_registry};

pub use api_v1::{ApiState, SharedApiState};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub sessions: usize,
    pub uptime_secs: i64,
}

/// `GET /health`
async fn health_handler(State(state): State<SharedApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        model: state.agent.model().to_string(),
        sessions: state.sessions.len().await,
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit (1 MiB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire provider, tools, agent and sessions together from config.
pub fn build_state(config: &AppConfig) -> Result<SharedApiState, Box<dyn std::error::Error>> {
    let provider = Arc::new(OpenAiCompatProvider::from_config(&config.provider)?);
    let executor = Arc::new(ToolExecutor::new(builtin_registry(config.tools.clone())?));
    let agent = Arc::new(AgentLoop::from_config(provider, executor, config));

    let system_prompt = config
        .agent
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let sessions = SessionRegistry::new(system_prompt, config.gateway.max_sessions);

    Ok(Arc::new(ApiState::new(agent, sessions)))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config)?;
    let app = build_router(state);

    info!(
        addr = %addr,
        model = %config.provider.model,
        backend = %config.provider.base_url,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
