// src/api.rs
//! HTTP surface: chat turns, conversation reset, health and the disease list.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::dialogue::Resolver;
use crate::knowledge::KnowledgeBase;
use crate::logging::anon_hash;
use crate::metrics;
use crate::session::SessionStore;

/// Request/response header carrying the conversation id.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(kb: Arc<KnowledgeBase>, sessions: SessionStore) -> Self {
        Self {
            resolver: Arc::new(Resolver::new(kb)),
            sessions: Arc::new(sessions),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let kb = cfg.knowledge_base()?;
        info!(diseases = kb.len(), "knowledge base loaded");
        Ok(Self::new(kb, SessionStore::new(&cfg.session)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/chat", post(chat))
        .route("/chat/{session_id}", delete(reset_conversation))
        .route("/diseases", get(list_diseases))
        .layer(
            CorsLayer::very_permissive()
                .expose_headers([HeaderName::from_static(SESSION_HEADER)]),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct ChatReq {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResp {
    reply: String,
    session_id: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "Hello": "World" }))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatReq>,
) -> impl IntoResponse {
    // body field first, header as fallback
    let requested = body
        .session_id
        .as_deref()
        .or_else(|| headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()));

    let resolver = &state.resolver;
    let (session_id, reply) = state
        .sessions
        .with_state(requested, |conv| resolver.resolve(&body.message, conv));

    metrics::record_chat(reply.kind);
    info!(
        session = %session_id,
        msg = %anon_hash(&body.message),
        kind = reply.kind.as_str(),
        disease = reply.disease.as_deref().unwrap_or("-"),
        "chat turn"
    );

    let mut out_headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&session_id) {
        out_headers.insert(SESSION_HEADER, v);
    }

    (
        out_headers,
        Json(ChatResp {
            reply: reply.text,
            session_id,
        }),
    )
}

async fn reset_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    let existed = state.sessions.reset(&session_id);
    info!(session = %session_id, existed, "conversation reset");
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct DiseaseSummary<'a> {
    id: &'a str,
    title: &'a str,
}

async fn list_diseases(State(state): State<AppState>) -> impl IntoResponse {
    let kb = state.resolver.knowledge_base();
    let out: Vec<DiseaseSummary<'_>> = kb
        .iter()
        .map(|r| DiseaseSummary {
            id: &r.id,
            title: &r.title,
        })
        .collect();
    Json(serde_json::to_value(out).unwrap_or_default())
}
