use anyhow::Context;
use serde::{Deserialize, Serialize};
use simcity_engine::GameConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const API_URL_ENV: &str = "SIMCITY_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub listen: SocketAddr,
    /// Base url of the simulation server (`/reset`, `/step`, `/simulate`).
    pub api_url: String,
    pub request_timeout_ms: u64,
    pub game: GameConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 39333)),
            api_url: "http://127.0.0.1:5888".to_string(),
            request_timeout_ms: 30_000,
            game: GameConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".simcity-viewer")
            .join("config.yaml")
    }

    /// Read `path`; a missing file means defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        cfg.game.validate()?;
        Ok(cfg)
    }

    pub fn api_url_from_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = url.trim().to_string();
            }
        }
    }
}
