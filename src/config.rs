use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GemiConfig {
    pub general: GeneralConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub chat: ChatConfig,
    pub memory: MemoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Connection and sampling settings for the local inference service.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub num_predict: u32,
    pub num_ctx: u32,
    pub connect_timeout_secs: u64,
    pub status_timeout_secs: u64,
    /// Prior user/assistant messages replayed with each request. 0 disables history.
    pub max_history_messages: usize,
    /// Character cap on the replayed history; oldest exchanges are dropped first.
    pub history_char_budget: usize,
}

/// Knobs for a single chat exchange: retrieval, prompt budget, and timeouts.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub memory_limit: usize,
    pub prompt_char_budget: usize,
    pub memory_char_limit: usize,
    pub response_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub conversation_importance: f64,
    pub conversation_char_limit: usize,
    pub decay_factor: f64,
    pub cleanup_importance_floor: f64,
    pub cleanup_no_access_days: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_gemi_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "gemma3n:latest".into(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            num_predict: 2048,
            num_ctx: 4096,
            connect_timeout_secs: 10,
            status_timeout_secs: 5,
            max_history_messages: 10,
            history_char_budget: 4000,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            memory_limit: 5,
            prompt_char_budget: 6000,
            memory_char_limit: 800,
            response_timeout_secs: 60,
            idle_timeout_secs: 120,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            conversation_importance: 0.5,
            conversation_char_limit: 2000,
            decay_factor: 0.98,
            cleanup_importance_floor: 0.05,
            cleanup_no_access_days: 90,
        }
    }
}

impl InferenceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

impl ChatConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Returns `~/.gemi/`, or `./.gemi` when no home directory can be resolved.
pub fn default_gemi_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gemi")
}

/// Returns the default config file path: `~/.gemi/config.toml`
pub fn default_config_path() -> PathBuf {
    default_gemi_dir().join("config.toml")
}

impl GemiConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            GemiConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (GEMI_DB, GEMI_LOG_LEVEL, GEMI_INFERENCE_URL, GEMI_MODEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GEMI_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("GEMI_LOG_LEVEL") {
            self.general.log_level = val;
        }
        if let Ok(val) = std::env::var("GEMI_INFERENCE_URL") {
            self.inference.base_url = val;
        }
        if let Ok(val) = std::env::var("GEMI_MODEL") {
            self.inference.model = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GemiConfig::default();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.inference.provider, "ollama");
        assert_eq!(config.inference.base_url, "http://localhost:11434");
        assert_eq!(config.chat.memory_limit, 5);
        assert!(config.storage.db_path.ends_with("memory.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[general]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[inference]
model = "llama3:8b"

[chat]
memory_limit = 3
"#;
        let config: GemiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.inference.model, "llama3:8b");
        assert_eq!(config.chat.memory_limit, 3);
        // defaults still apply for unset fields
        assert_eq!(config.chat.prompt_char_budget, 6000);
        assert_eq!(config.inference.num_ctx, 4096);
        assert_eq!(config.memory.decay_factor, 0.98);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = GemiConfig::default();
        std::env::set_var("GEMI_DB", "/tmp/override.db");
        std::env::set_var("GEMI_LOG_LEVEL", "trace");
        std::env::set_var("GEMI_INFERENCE_URL", "http://127.0.0.1:8080");
        std::env::set_var("GEMI_MODEL", "gemma3n:e2b");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.general.log_level, "trace");
        assert_eq!(config.inference.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.inference.model, "gemma3n:e2b");

        // Clean up
        std::env::remove_var("GEMI_DB");
        std::env::remove_var("GEMI_LOG_LEVEL");
        std::env::remove_var("GEMI_INFERENCE_URL");
        std::env::remove_var("GEMI_MODEL");
    }

    #[test]
    fn timeouts_convert_to_durations() {
        let config = GemiConfig::default();
        assert_eq!(config.chat.idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.inference.status_timeout(), Duration::from_secs(5));
    }
}
