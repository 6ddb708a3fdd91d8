//! Configuration management for Dawa CLI.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dawa::cache::MemoryCache;
use dawa::client::DEFAULT_BASE_URL;
use dawa::{ChatConfig, ChatSession, DawaClient};
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Authentication credentials.
    pub auth: Option<AuthConfig>,
    /// Backend base URL.
    pub base_url: Option<String>,
    /// Local message cleanup.
    #[serde(default)]
    pub chat: ChatSection,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Access token.
    pub token: String,
    /// User ID.
    pub uid: String,
}

/// `[chat]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSection {
    /// Drop local copies once the backend confirms them.
    #[serde(default)]
    pub prune_reconciled: bool,
    /// Failed local messages kept per item.
    #[serde(default)]
    pub max_failed_per_item: Option<usize>,
}

impl From<&ChatSection> for ChatConfig {
    fn from(section: &ChatSection) -> Self {
        ChatConfig {
            prune_reconciled: section.prune_reconciled,
            max_failed_per_item: section.max_failed_per_item,
        }
    }
}

/// Get the configuration file path.
pub fn config_path() -> Result<PathBuf> {
    let exe_path = env::current_exe().context("Could not determine executable path")?;
    let exe_dir = exe_path
        .parent()
        .context("Could not determine executable directory")?;

    Ok(exe_dir.join("dawa.toml"))
}

/// Load configuration from file.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path).context("Failed to read config file")?;

    toml::from_str(&content).context("Failed to parse config file")
}

/// Save configuration to file.
pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path()?;
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&path, content).context("Failed to write config file")?;

    Ok(())
}

/// Effective base URL: command line or environment first, then the file.
pub fn base_url(config: &Config, flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Build a Dawa client that requires authentication.
pub fn build_authed_client(base_url_flag: Option<&str>) -> Result<DawaClient> {
    let config = load_config()?;

    let auth = config
        .auth
        .clone()
        .context("Authentication required. Run 'dawa auth login' first.")?;

    DawaClient::builder()
        .auth(&auth.token, &auth.uid)
        .base_url(base_url(&config, base_url_flag))
        .cache(Arc::new(MemoryCache::new()))
        .build()
        .context("Failed to build Dawa client")
}

/// Connect a chat session for the logged in user and load conversations.
pub async fn connect_chat(base_url_flag: Option<&str>) -> Result<ChatSession> {
    let config = load_config()?;
    let client = build_authed_client(base_url_flag)?;

    let session = ChatSession::connect(&client, ChatConfig::from(&config.chat))
        .await
        .context("Failed to load conversations")?;

    if !session.is_authenticated() {
        anyhow::bail!("Session rejected by the backend. Run 'dawa auth login' again.");
    }

    Ok(session)
}
