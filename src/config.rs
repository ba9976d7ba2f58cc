// src/config.rs
//! Service configuration: `config/healthbot.toml` plus environment overrides.
//!
//! Every key is optional; a missing file means "all defaults". Env overrides win over the
//! file, and malformed numeric overrides are ignored rather than failing startup.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};
use tracing::{info, warn};

use crate::knowledge::KnowledgeBase;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/healthbot.toml";

pub const ENV_CONFIG_PATH: &str = "HEALTHBOT_CONFIG_PATH";
pub const ENV_SESSION_TTL_SECS: &str = "HEALTHBOT_SESSION_TTL_SECS";
pub const ENV_MAX_SESSIONS: &str = "HEALTHBOT_MAX_SESSIONS";
pub const ENV_STATIC_DIR: &str = "HEALTHBOT_STATIC_DIR";
pub const ENV_KNOWLEDGE_BASE: &str = "HEALTHBOT_KNOWLEDGE_BASE";

const MIN_IDLE_TTL_SECS: u64 = 10;
const MAX_IDLE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const MIN_SWEEP_INTERVAL_SECS: u64 = 1;

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_idle_ttl_secs() -> u64 {
    30 * 60
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_max_sessions() -> usize {
    10_000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory served under `/ui`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// JSON file replacing the embedded dataset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Resolve the config path from `HEALTHBOT_CONFIG_PATH` (or the default), load it if it
    /// exists, then apply env overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            info!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        cfg.apply_overrides(|key| env::var(key).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: AppConfig = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Apply overrides from any key → value source (the process env in production).
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_env::<u64>(ENV_SESSION_TTL_SECS, get(ENV_SESSION_TTL_SECS)) {
            self.session.idle_ttl_secs = v;
        }
        if let Some(v) = parse_env::<usize>(ENV_MAX_SESSIONS, get(ENV_MAX_SESSIONS)) {
            self.session.max_sessions = v;
        }
        if let Some(v) = get(ENV_STATIC_DIR).filter(|s| !s.trim().is_empty()) {
            self.server.static_dir = PathBuf::from(v.trim());
        }
        if let Some(v) = get(ENV_KNOWLEDGE_BASE).filter(|s| !s.trim().is_empty()) {
            self.knowledge_base.path = Some(PathBuf::from(v.trim()));
        }
    }

    fn sanitize(&mut self) {
        self.session.idle_ttl_secs = self
            .session
            .idle_ttl_secs
            .clamp(MIN_IDLE_TTL_SECS, MAX_IDLE_TTL_SECS);
        self.session.sweep_interval_secs =
            self.session.sweep_interval_secs.max(MIN_SWEEP_INTERVAL_SECS);
        self.session.max_sessions = self.session.max_sessions.max(1);
    }

    /// The configured dataset, or the embedded one.
    pub fn knowledge_base(&self) -> anyhow::Result<Arc<KnowledgeBase>> {
        match &self.knowledge_base.path {
            Some(path) => Ok(Arc::new(KnowledgeBase::load_from_file(path)?)),
            None => Ok(KnowledgeBase::embedded()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring malformed env override");
            None
        }
    }
}
