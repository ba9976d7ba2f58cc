// src/metrics.rs
//! Prometheus metrics. The recorder is process-global; installing it is idempotent so
//! tests can build the app many times.

use axum::{routing::get, Router};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::warn;

use crate::dialogue::ReplyKind;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the recorder (first call only) and return its handle.
/// `None` if another recorder was installed by someone else.
pub fn init() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error = %e, "prometheus recorder not installed");
                None
            }
        })
        .clone()
}

/// Router exposing `/metrics` in the Prometheus exposition format.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}

pub fn record_chat(kind: ReplyKind) {
    counter!("healthbot_chat_requests_total").increment(1);
    counter!("healthbot_replies_total", "kind" => kind.as_str()).increment(1);
}

pub fn set_active_sessions(n: usize) {
    gauge!("healthbot_active_sessions").set(n as f64);
}

pub fn record_evictions(n: usize) {
    counter!("healthbot_sessions_evicted_total").increment(n as u64);
}
