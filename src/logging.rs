// src/logging.rs
//! Tracing setup and privacy helpers.
//!
//! User messages are health questions: never log raw text, only `anon_hash` of it.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "HEALTHBOT_LOG_JSON";
const DEFAULT_FILTER: &str = "healthbot=info,session=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `HEALTHBOT_LOG_JSON=1` switches to JSON lines. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var(ENV_LOG_JSON).ok().as_deref() == Some("1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    // Already installed (tests, or the hosting runtime) is fine.
    let _ = res;
}

/// Short, stable, non-reversible id for a piece of text (first 6 bytes of SHA-256, hex).
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
