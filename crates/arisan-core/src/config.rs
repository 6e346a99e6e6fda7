use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

pub const DEFAULT_ADMIN_EMAIL: &str = "adminarisan@gmail.com";

/// Resolve the data directory: `$ARISAN_HOME`, else `~/.arisan/`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("ARISAN_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".arisan")
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Sign-ins with this email are admins.
    pub admin_email: String,
    /// Identity the MCP server acts as. Unset means read-only guest.
    pub operator_email: Option<String>,
    pub ai: AiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            operator_email: None,
            ai: AiSettings::default(),
        }
    }
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join("config.json")
}

pub fn read_config(dir: &Path) -> AppConfig {
    let path = config_path(dir);
    if !path.exists() {
        return AppConfig::default();
    }
    match fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
    {
        Some(cfg) => cfg,
        None => {
            tracing::warn!(path = %path.display(), "unreadable config, using defaults");
            AppConfig::default()
        }
    }
}

pub fn write_config(dir: &Path, config: &AppConfig) -> Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(config_path(dir), json)?;
    Ok(())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
