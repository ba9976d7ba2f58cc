// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod dialogue;
pub mod knowledge;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod session;
pub mod similarity;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::dialogue::{ConversationState, Reply, ReplyKind, Resolver};
pub use crate::knowledge::{DiseaseRecord, InfoField, KnowledgeBase};
pub use crate::matcher::EntityMatcher;

use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;

/// `DEBUG_ROUTES=1` exposes `/metrics`.
pub const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";

fn debug_routes_enabled() -> bool {
    std::env::var(ENV_DEBUG_ROUTES).ok().as_deref() == Some("1")
}

/// Full application router (API + static UI + optional metrics) and its shared state.
pub fn build_app(cfg: &AppConfig) -> anyhow::Result<(Router, AppState)> {
    let state = AppState::from_config(cfg)?;

    let mut app = api::router(state.clone())
        .nest_service("/ui", ServeDir::new(&cfg.server.static_dir));

    // Counters accrue regardless; the scrape route is opt-in.
    let handle = metrics::init();
    if debug_routes_enabled() {
        if let Some(h) = handle {
            info!("debug routes enabled: /metrics");
            app = app.merge(metrics::router(h));
        }
    }

    Ok((app, state))
}

/// Build the app from `config/healthbot.toml` + env, as the binary does.
pub fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::from_env()?;
    Ok(build_app(&cfg)?.0)
}
