//! HTTP API v1: sessions and streamed turns.
//!
//! Endpoints:
//!
//! - `GET    /v1/tools`                - Tool catalog as advertised to the model
//! - `POST   /v1/sessions`             - Create a session
//! - `GET    /v1/sessions`             - List sessions
//! - `GET    /v1/sessions/{id}`        - Session transcript
//! - `POST   /v1/sessions/{id}/chat`   - Run a turn, SSE stream of events
//! - `POST   /v1/sessions/{id}/reset`  - Clear the transcript
//! - `DELETE /v1/sessions/{id}`        - Evict the session

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use loopclaw_agent::{AgentLoop, SessionInfo, SessionRegistry, stream_turn};
use loopclaw_core::message::{Message, SessionId};
use loopclaw_core::provider::ToolDefinition;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiState {
    pub agent: Arc<AgentLoop>,
    pub sessions: SessionRegistry,
    pub started_at: DateTime<Utc>,
}

pub type SharedApiState = Arc<ApiState>;

impl ApiState {
    pub fn new(agent: Arc<AgentLoop>, sessions: SessionRegistry) -> Self {
        Self {
            agent,
            sessions,
            started_at: Utc::now(),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/tools", get(list_tools_handler))
        .route("/sessions", get(list_sessions_handler).post(create_session_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/chat", post(chat_handler))
        .route("/sessions/{id}/reset", post(reset_handler))
        .with_state(state)
}

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session not found: {id}"),
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub count: usize,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Turn input: a message, or a reset flag that skips the turn.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub reset: bool,
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `GET /v1/tools`
async fn list_tools_handler(State(state): State<SharedApiState>) -> Json<ToolListResponse> {
    let tools = state.agent.executor().definitions();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

/// `POST /v1/sessions`
async fn create_session_handler(State(state): State<SharedApiState>) -> impl IntoResponse {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreatedSession {
            id: session.id().to_string(),
            created_at: session.created_at(),
        }),
    )
}

/// `GET /v1/sessions`
async fn list_sessions_handler(State(state): State<SharedApiState>) -> Json<SessionListResponse> {
    let sessions = state.sessions.list().await;
    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}

/// `GET /v1/sessions/{id}`
async fn get_session_handler(State(state): State<SharedApiState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.sessions.get(&SessionId::from(id.as_str())).await else {
        return not_found(&id);
    };
    let transcript = session.transcript().await;
    Json(SessionDetail {
        id,
        created_at: session.created_at(),
        messages: transcript.messages().to_vec(),
    })
    .into_response()
}

/// `DELETE /v1/sessions/{id}`
async fn delete_session_handler(State(state): State<SharedApiState>, Path(id): Path<String>) -> Response {
    if state.sessions.evict(&SessionId::from(id.as_str())).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(&id)
    }
}

/// `POST /v1/sessions/{id}/reset`
async fn reset_handler(State(state): State<SharedApiState>, Path(id): Path<String>) -> Response {
    if state.sessions.reset(&SessionId::from(id.as_str())).await {
        Json(ResetResponse { reset: true }).into_response()
    } else {
        not_found(&id)
    }
}

/// `POST /v1/sessions/{id}/chat` - run a turn and stream its events as SSE.
///
/// Each Stream Event becomes one SSE event named after its type, with the
/// event JSON as data. The stream ends after `done`.
async fn chat_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    let Some(session) = state.sessions.get(&SessionId::from(id.as_str())).await else {
        return not_found(&id);
    };

    if payload.reset {
        session.reset().await;
        return Json(ResetResponse { reset: true }).into_response();
    }

    let message = match payload.message {
        Some(message) if !message.trim().is_empty() => message,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Request needs a non-empty 'message' or 'reset: true'".into(),
                }),
            )
                .into_response();
        }
    };

    info!(session_id = %id, chars = message.len(), "Chat turn requested");
    let rx = stream_turn(state.agent.clone(), session, message);

    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(SseEvent::default().event(event_type).data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
