//! HealthBot — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, per-conversation sessions, and middleware.

use std::time::Duration;

use healthbot::{build_app, logging, session, AppConfig};
use shuttle_axum::ShuttleAxum;
use tracing::info;

#[shuttle_runtime::main]
async fn serve() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    logging::init_tracing();

    let cfg = AppConfig::from_env()?;
    let (router, state) = build_app(&cfg)?;

    session::spawn_sweeper(
        state.sessions.clone(),
        Duration::from_secs(cfg.session.sweep_interval_secs),
    );
    info!(
        idle_ttl_secs = cfg.session.idle_ttl_secs,
        max_sessions = cfg.session.max_sessions,
        static_dir = %cfg.server.static_dir.display(),
        "healthbot ready"
    );

    Ok(router.into())
}
