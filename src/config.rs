use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub serpapi: SerpApiConfig,

    pub server: ServerConfig,

    pub scanner: ScannerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// 0 lets tokio pick the worker-thread count.
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,

    pub suppress_connection_errors: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/prospektor.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 0,
            max_db_connections: 5,
            min_db_connections: 1,
            suppress_connection_errors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerpApiConfig {
    /// SerpApi key; the SERPAPI_KEY environment variable takes precedence.
    pub api_key: String,

    pub location: String,

    pub language: String,

    pub country: String,

    pub page_size: u64,

    /// Provider calls allowed per search cycle. Kept at 1 so each inbound
    /// request stays fast; clients page by calling again.
    pub max_requests_per_cycle: u32,

    pub request_timeout_seconds: u64,

    /// Appended to every query sent upstream.
    pub query_suffix: String,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            location: "Poland".to_string(),
            language: "pl".to_string(),
            country: "pl".to_string(),
            page_size: 10,
            max_requests_per_cycle: 1,
            request_timeout_seconds: 10,
            query_suffix: "inurl:wp-content".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6780,
            cors_allowed_origins: vec![
                "http://localhost:6780".to_string(),
                "http://127.0.0.1:6780".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Shared secret the scan runner must present in X-Callback-Api-Key.
    pub callback_api_key: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            callback_api_key: "prospektor_default_callback_key_please_regenerate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "prospektor".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default().with_env_overrides())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("SERPAPI_KEY")
            && !key.is_empty()
        {
            self.serpapi.api_key = key;
        }
        if let Ok(key) = std::env::var("CALLBACK_API_KEY")
            && !key.is_empty()
        {
            self.scanner.callback_api_key = key;
        }
        self
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("prospektor").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".prospektor").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.serpapi.page_size == 0 {
            anyhow::bail!("serpapi.page_size must be > 0");
        }

        if self.serpapi.max_requests_per_cycle == 0 {
            anyhow::bail!("serpapi.max_requests_per_cycle must be >= 1");
        }

        if self.server.enabled && self.server.port == 0 {
            anyhow::bail!("server.port must be set when the server is enabled");
        }

        Ok(())
    }
}
