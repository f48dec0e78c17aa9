//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.ragdesk/config.json`) and environment.
//! Every section has defaults, so an empty `{}` file (or no file at all) is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Local user identity shown in team workspaces.
    #[serde(default)]
    pub user: UserConfig,

    /// Fixed workspace ids for the surfaces that have no create/join step.
    #[serde(default)]
    pub workspaces: WorkspacesConfig,
}

/// Where the RAG backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the backend (default "http://localhost:5000"). Overridden by RAGDESK_BACKEND_URL.
    #[serde(default = "default_backend_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Name used as sender and uploader in team workspaces. Overridden by RAGDESK_USER.
    pub display_name: Option<String>,
}

/// Workspace ids used by the solo and reader surfaces. The team surface gets its id from create/join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacesConfig {
    #[serde(default = "default_solo_workspace")]
    pub solo: String,
    #[serde(default = "default_reader_workspace")]
    pub reader: String,
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self {
            solo: default_solo_workspace(),
            reader: default_reader_workspace(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_solo_workspace() -> String {
    "solo-user-workspace".to_string()
}

fn default_reader_workspace() -> String {
    "universal-reader-workspace".to_string()
}

const DEFAULT_DISPLAY_NAME: &str = "User A";

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the backend base URL: env RAGDESK_BACKEND_URL overrides config. Trailing slashes are trimmed.
pub fn resolve_backend_url(config: &Config) -> String {
    let url = non_empty_env("RAGDESK_BACKEND_URL")
        .or_else(|| {
            let t = config.backend.base_url.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .unwrap_or_else(default_backend_url);
    url.trim_end_matches('/').to_string()
}

/// Resolve the local display name: env RAGDESK_USER overrides config; defaults to "User A".
pub fn resolve_display_name(config: &Config) -> String {
    non_empty_env("RAGDESK_USER")
        .or_else(|| {
            config
                .user
                .display_name
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RAGDESK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".ragdesk").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (RAGDESK_CONFIG_PATH / ~/.ragdesk/config.json).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
