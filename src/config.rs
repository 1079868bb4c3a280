use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the HTTP API (login, signup, message list).
    pub api_url: String,
    /// WebSocket URL of the push server.
    pub push_url: String,
    /// SQLite file holding the logged-in identity.
    pub session_db: String,
    pub handshake_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    /// Bound on login and signup requests.
    pub auth_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            push_url: "ws://localhost:4000".to_string(),
            session_db: "data/session.db".to_string(),
            handshake_timeout_ms: 5_000,
            fetch_timeout_ms: 5_000,
            auth_timeout_ms: 10_000,
        }
    }
}

impl AppConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            handshake_timeout: self.handshake_timeout(),
            fetch_timeout: self.fetch_timeout(),
        }
    }

    /// Apply `MCHAT_*` overrides found through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MCHAT_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = lookup("MCHAT_PUSH_URL") {
            self.push_url = url;
        }
        if let Some(path) = lookup("MCHAT_SESSION_DB") {
            self.session_db = path;
        }
    }
}

/// Load the config file, falling back to defaults, then apply environment
/// overrides (including those from `.env`).
pub fn load_config(path: &str) -> AppConfig {
    let mut config = read_config_file(Path::new(path));
    config.apply_overrides(|key| std::env::var(key).ok().filter(|value| !value.is_empty()));
    config
}

fn read_config_file(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}
