use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::CombinationMode;

/// Root application configuration, loaded from `~/.config/wonderbook/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout. Unset means requests wait until the transport gives up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub page_size: usize,
    /// Lowest year accepted as the start of a year range.
    pub min_year: u16,
    pub default_mode: CombinationMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            user_agent: "wonderbook/0.1".to_string(),
            timeout_secs: None,
            max_retries: 0,
            min_interval_ms: 0,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: crate::pagination::DEFAULT_PAGE_SIZE,
            min_year: 1000,
            default_mode: CombinationMode::And,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/wonderbook/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("WONDERBOOK_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("wonderbook")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    /// `WONDERBOOK_API_URL` overrides `api.base_url`.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = Self::load_from(&path)?;
        if let Ok(url) = std::env::var("WONDERBOOK_API_URL") {
            config.api.base_url = url;
        }
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Where the session token is persisted. `WONDERBOOK_SESSION` overrides it.
    pub fn session_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("WONDERBOOK_SESSION") {
            return PathBuf::from(path);
        }

        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("wonderbook")
            .join("session.json")
    }
}
