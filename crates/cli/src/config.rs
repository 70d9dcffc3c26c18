//! Configuration loading and management

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub mastodon: MastodonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_scheduler_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_transport")]
    pub transport: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_slack_bot_token_env")]
    pub bot_token_env: String,

    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default = "default_slack_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_slack_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    #[serde(default = "default_mastodon_host_env")]
    pub host_env: String,

    #[serde(default = "default_mastodon_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_mastodon_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_backend() -> String {
    "json".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data.json")
}

fn default_true() -> bool {
    true
}

fn default_scheduler_interval() -> u64 {
    4 * 60 * 60
}

fn default_chat_transport() -> String {
    "slack".to_string()
}

fn default_slack_bot_token_env() -> String {
    "SLACK_BOT_TOKEN".to_string()
}

fn default_slack_poll_interval() -> u64 {
    5
}

fn default_slack_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_mastodon_host_env() -> String {
    "MASTODON_HOST".to_string()
}

fn default_mastodon_token_env() -> String {
    "MASTODON_TOKEN".to_string()
}

fn default_mastodon_timeout() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_scheduler_interval(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            transport: default_chat_transport(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_slack_bot_token_env(),
            channels: vec![],
            poll_interval_secs: default_slack_poll_interval(),
            base_url: default_slack_base_url(),
        }
    }
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            host_env: default_mastodon_host_env(),
            access_token_env: default_mastodon_token_env(),
            timeout_secs: default_mastodon_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("TOOTBRIDGE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("slack.channels")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# tootbridge configuration

[general]
log_level = "info"

[store]
backend = "json"  # json, sqlite
path = "./data.json"

[scheduler]
enabled = true
# Publish every ready post this often (4 hours)
interval_secs = 14400

[chat]
transport = "slack"  # slack, console

[slack]
bot_token_env = "SLACK_BOT_TOKEN"
channels = ["C0123456789"]
poll_interval_secs = 5
base_url = "https://slack.com/api"

[mastodon]
host_env = "MASTODON_HOST"
access_token_env = "MASTODON_TOKEN"
timeout_secs = 30
"#
        .to_string()
    }
}

/// Log level from `--log-level`, else from the config file, else `info`
///
/// A config that fails to load is ignored here; the command reports it.
pub(crate) fn effective_log_level(
    cli_level: Option<&str>,
    config_path: Option<&Path>,
) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }

    AppConfig::load(config_path)
        .map(|config| config.general.log_level)
        .unwrap_or_else(|_| default_log_level())
}

/// Read a required secret from the environment
///
/// A missing or blank variable is a startup error naming the variable.
pub(crate) fn load_secret(env_var: &str, purpose: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No env var configured for {}", purpose);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} ({} required)", env_var, purpose))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty ({} required)", env_var, purpose);
    }

    Ok(SecretString::new(value.trim().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_toml_parses_with_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        assert_eq!(parsed.store.backend, "json");
        assert_eq!(parsed.scheduler.interval_secs, 14400);
        assert_eq!(parsed.slack.channels, vec!["C0123456789".to_string()]);
        assert_eq!(parsed.mastodon.access_token_env, "MASTODON_TOKEN");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str("").unwrap();

        assert_eq!(parsed.store.path, PathBuf::from("./data.json"));
        assert!(parsed.scheduler.enabled);
        assert_eq!(parsed.chat.transport, "slack");
        assert_eq!(parsed.slack.bot_token_env, "SLACK_BOT_TOKEN");
        assert_eq!(parsed.mastodon.host_env, "MASTODON_HOST");
    }

    #[test]
    fn test_log_level_flag_wins_over_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();

        assert_eq!(effective_log_level(Some("warn"), Some(&path)), "warn");
    }

    #[test]
    fn test_log_level_falls_back_to_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();

        assert_eq!(effective_log_level(None, Some(&path)), "debug");
    }

    #[test]
    fn test_log_level_defaults_when_config_is_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        assert_eq!(effective_log_level(None, Some(&path)), "info");
    }

    #[test]
    fn test_load_secret_rejects_blank_env_name() {
        let result = load_secret("  ", "publish API token");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_secret_names_missing_variable() {
        let err = load_secret("TOOTBRIDGE_TEST_SURELY_UNSET_VAR", "publish API token")
            .unwrap_err()
            .to_string();
        assert!(err.contains("TOOTBRIDGE_TEST_SURELY_UNSET_VAR"));
    }
}
