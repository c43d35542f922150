//! Configuration for the Spark endpoint and credentials.
//!
//! Stored in ~/.config/sparkfx/config.json; environment variables take
//! precedence over the file so CI and one-off runs need no config on disk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Placeholder credentials shipped in examples/docs. Treated as "unconfigured".
const PLACEHOLDER_APP_ID: &str = "your-app-id";
const PLACEHOLDER_API_KEY: &str = "your-api-key";
const PLACEHOLDER_API_SECRET: &str = "your-api-secret";

fn default_endpoint() -> String {
    "https://spark-api.xf-yun.com/v1/x1".to_string()
}

fn default_domain() -> String {
    "spark-x".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
    /// Chat completion endpoint; the https scheme is swapped to wss at connect.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: PLACEHOLDER_APP_ID.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            api_secret: PLACEHOLDER_API_SECRET.to_string(),
            endpoint: default_endpoint(),
            domain: default_domain(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sparkfx"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, apply environment overrides, or return defaults.
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_default();
        config.apply_env();
        config
    }

    fn load_file() -> Option<Self> {
        let path = Self::config_path()?;
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                eprintln!(
                    "  Warning: Config file {} is invalid ({}). Using defaults.",
                    path.display(),
                    err
                );
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SPARKFX_APP_ID") {
            self.app_id = v;
        }
        if let Ok(v) = std::env::var("SPARKFX_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("SPARKFX_API_SECRET") {
            self.api_secret = v;
        }
        if let Ok(v) = std::env::var("SPARKFX_ENDPOINT") {
            self.endpoint = v;
        }
    }

    /// Save config to disk (used by `--setup` style flows and tests).
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        fs::create_dir_all(&dir)?;
        let path = dir.join("config.json");
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Startup credential check: plain field comparison against the shipped
    /// placeholders and empties. Returns the list of problems, empty if ok.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.app_id.is_empty() || self.app_id == PLACEHOLDER_APP_ID {
            problems.push("app_id is not configured".to_string());
        }
        if self.api_key.is_empty() || self.api_key == PLACEHOLDER_API_KEY {
            problems.push("api_key is not configured".to_string());
        }
        if self.api_secret.is_empty() || self.api_secret == PLACEHOLDER_API_SECRET {
            problems.push("api_secret is not configured".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            problems.push(format!("endpoint '{}' is not an http(s) URL", self.endpoint));
        }
        problems
    }

    pub fn is_configured(&self) -> bool {
        self.validate().is_empty()
    }
}
