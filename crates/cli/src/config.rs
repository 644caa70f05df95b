use proto::{ConfigError, ModelProfile, default_catalog, find_profile};
use serde::{Deserialize, Serialize};
use session::SessionConfiguration;
use session::controller::{DEFAULT_HISTORY_LIMIT, DEFAULT_SYSTEM_INSTRUCTION};
use session::feed::DEFAULT_TOLERANCE;
use session::reveal::DEFAULT_REVEAL_INTERVAL;
use session::llm::DEFAULT_ENDPOINT;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Inference endpoint configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat session behaviour.
    #[serde(default)]
    pub session: SessionSettings,

    /// Selectable model catalog.
    #[serde(default = "default_catalog")]
    pub models: Vec<ModelProfile>,

    /// Preference database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reachability probe configuration.
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionSettings::default(),
            models: default_catalog(),
            database: DatabaseConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

/// Inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Chat-completions URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token. Usually supplied through the environment.
    #[serde(default)]
    pub token: String,
    /// Seconds to wait before reporting an undecodable response.
    #[serde(default = "default_decode_grace_secs")]
    pub decode_grace_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_decode_grace_secs() -> u64 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: String::new(),
            decode_grace_secs: default_decode_grace_secs(),
        }
    }
}

/// Session behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Model id to start with. Empty restores the last used model.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    /// Prior messages sent with each request.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Milliseconds between revealed words.
    #[serde(default = "default_reveal_interval_ms")]
    pub reveal_interval_ms: u64,
    /// Rows from the bottom still treated as "at bottom".
    #[serde(default = "default_scroll_tolerance")]
    pub scroll_tolerance: f64,
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_reveal_interval_ms() -> u64 {
    DEFAULT_REVEAL_INTERVAL.as_millis() as u64
}

fn default_scroll_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_instruction: default_system_instruction(),
            history_limit: default_history_limit(),
            reveal_interval_ms: default_reveal_interval_ms(),
            scroll_tolerance: default_scroll_tolerance(),
        }
    }
}

/// Preference storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            url: format!("{home}/.incognito/preferences.db"),
        }
    }
}

/// Reachability probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// When disabled the session always assumes it is online.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between probes.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Milliseconds before a probe counts as failed.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_probe_interval_secs() -> u64 {
    10
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            // Look in current dir, then home dir
            let cwd = std::env::current_dir().ok()?.join("config.toml");
            if cwd.exists() {
                return Some(cwd);
            }
            let home_config = home_dir().join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        // Environment variable overrides
        if let Ok(token) = std::env::var("INCOGNITO_TOKEN") {
            config.api.token = token;
        } else if config.api.token.is_empty()
            && let Ok(token) = std::env::var("GITHUB_TOKEN")
        {
            config.api.token = token;
        }
        if let Ok(model) = std::env::var("INCOGNITO_MODEL") {
            config.session.model = model;
        }
        if let Ok(endpoint) = std::env::var("INCOGNITO_ENDPOINT") {
            config.api.endpoint = endpoint;
        }

        config.validate()?;
        debug!(
            endpoint = %config.api.endpoint,
            model = %config.session.model,
            models = config.models.len(),
            token_set = !config.api.token.is_empty(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Rejects configurations the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "models".to_string(),
                reason: "catalog must contain at least one model".to_string(),
            });
        }
        if let Some(model) = self.models.iter().find(|m| m.daily_limit == 0) {
            return Err(ConfigError::InvalidValue {
                field: "models.daily_limit".to_string(),
                reason: format!("{} must allow at least one request per day", model.id),
            });
        }
        if !self.session.model.is_empty() && self.active_profile().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "session.model".to_string(),
                reason: format!("{} is not in the model catalog", self.session.model),
            });
        }
        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("api.endpoint".to_string()));
        }
        if self.session.reveal_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.reveal_interval_ms".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Profile named by `session.model`, if set and known.
    pub fn active_profile(&self) -> Option<&ModelProfile> {
        if self.session.model.is_empty() {
            return None;
        }
        find_profile(&self.models, &self.session.model)
    }

    /// Builds the session configuration. An explicit `session.model` wins
    /// over the model persisted by an earlier run.
    pub fn session_configuration(
        &self,
        store: &dyn session::PreferenceStore,
    ) -> SessionConfiguration {
        let base = SessionConfiguration {
            system_instruction: self.session.system_instruction.clone(),
            active_model: self.models[0].clone(),
            catalog: self.models.clone(),
            reveal_interval: Duration::from_millis(self.session.reveal_interval_ms),
            scroll_tolerance: self.session.scroll_tolerance,
            history_limit: self.session.history_limit,
        };
        match self.active_profile() {
            Some(profile) => SessionConfiguration {
                active_model: profile.clone(),
                ..base
            },
            None => base.restore(store),
        }
    }

    /// Session configuration for a one-shot run. `model_id` overrides the
    /// active model for this run only; nothing is persisted.
    pub fn run_configuration(
        &self,
        store: &dyn session::PreferenceStore,
        model_id: Option<&str>,
    ) -> Result<SessionConfiguration, ConfigError> {
        let mut session = self.session_configuration(store);
        if let Some(id) = model_id {
            let profile = find_profile(&self.models, id).ok_or_else(|| ConfigError::InvalidValue {
                field: "run.model".to_string(),
                reason: format!("unknown model {id}"),
            })?;
            session.active_model = profile.clone();
        }
        Ok(session)
    }

    /// Delay before an undecodable response is reported.
    pub fn decode_grace(&self) -> Duration {
        Duration::from_secs(self.api.decode_grace_secs)
    }
}

/// `~/.incognito`
pub fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".incognito")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScopedEnv;
    use session::{MemoryStore, PreferenceStore};

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write config");
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(
            cfg.api.endpoint,
            "https://models.github.ai/inference/chat/completions"
        );
        assert_eq!(cfg.api.decode_grace_secs, 5);
        assert_eq!(cfg.models.len(), 5);
        assert_eq!(cfg.session.history_limit, 10);
        assert_eq!(cfg.session.reveal_interval_ms, 50);
        assert!(cfg.database.url.ends_with(".incognito/preferences.db"));
        assert!(cfg.connectivity.enabled);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn load_reads_toml_file_and_fills_missing_sections() {
        let _env = ScopedEnv::clean();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        write_file(
            &path,
            r#"
[session]
model = "xai/grok-3-mini"
history_limit = 0

[[models]]
id = "xai/grok-3-mini"
title = "Grok"
daily_limit = 30

[[models]]
id = "custom/model"
title = "Custom"
daily_limit = 5
"#,
        );

        let cfg = Config::load(Some(&path)).expect("config load");
        assert_eq!(cfg.models.len(), 2);
        assert_eq!(cfg.session.history_limit, 0);
        assert_eq!(cfg.session.reveal_interval_ms, 50);
        assert_eq!(cfg.api.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(
            cfg.active_profile().map(|p| p.daily_limit),
            Some(30)
        );
    }

    #[test]
    fn load_applies_env_overrides() {
        let env = ScopedEnv::clean();
        env.set("INCOGNITO_TOKEN", "env-token");
        env.set("GITHUB_TOKEN", "gh-token");
        env.set("INCOGNITO_MODEL", "deepseek/DeepSeek-V3-0324");
        env.set("INCOGNITO_ENDPOINT", "http://127.0.0.1:9/chat");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        write_file(&path, "");
        let cfg = Config::load(Some(&path)).expect("config load");
        assert_eq!(cfg.api.token, "env-token");
        assert_eq!(cfg.session.model, "deepseek/DeepSeek-V3-0324");
        assert_eq!(cfg.api.endpoint, "http://127.0.0.1:9/chat");
    }

    #[test]
    fn github_token_is_used_when_no_token_configured() {
        let env = ScopedEnv::clean();
        env.set("GITHUB_TOKEN", "gh-token");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        write_file(&path, "");
        let cfg = Config::load(Some(&path)).expect("config load");
        assert_eq!(cfg.api.token, "gh-token");

        write_file(&path, "[api]\ntoken = \"file-token\"\n");
        let cfg = Config::load(Some(&path)).expect("config load");
        assert_eq!(cfg.api.token, "file-token");
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let _env = ScopedEnv::clean();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        write_file(&path, "[session\nmodel = ");
        let err = Config::load(Some(&path)).expect_err("invalid toml");
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn validate_rejects_empty_catalog_zero_limits_and_unknown_model() {
        let mut cfg = Config::default();
        cfg.models.clear();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "models"
        ));

        let mut cfg = Config::default();
        cfg.models[1].daily_limit = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "models.daily_limit"
        ));

        let mut cfg = Config::default();
        cfg.session.model = "nobody/none".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "session.model"
        ));
    }

    #[test]
    fn session_configuration_prefers_explicit_model_over_persisted() {
        let store = MemoryStore::new();
        store.set("activeModelId", "xai/grok-3-mini".to_string());

        let cfg = Config::default();
        let restored = cfg.session_configuration(&store);
        assert_eq!(restored.active_model.id, "xai/grok-3-mini");

        let mut cfg = Config::default();
        cfg.session.model = "openai/gpt-4.1-mini".to_string();
        cfg.session.history_limit = 4;
        let explicit = cfg.session_configuration(&store);
        assert_eq!(explicit.active_model.id, "openai/gpt-4.1-mini");
        assert_eq!(explicit.history_limit, 4);
        assert_eq!(explicit.reveal_interval, Duration::from_millis(50));
    }

    #[test]
    fn run_configuration_overrides_model_without_persisting() {
        let store = MemoryStore::new();
        store.set("activeModelId", "openai/gpt-4.1-mini".to_string());
        let cfg = Config::default();

        let run = cfg
            .run_configuration(&store, Some("xai/grok-3-mini"))
            .expect("known model");
        assert_eq!(run.active_model.id, "xai/grok-3-mini");
        assert_eq!(store.get("activeModelId").as_deref(), Some("openai/gpt-4.1-mini"));

        let default_run = cfg.run_configuration(&store, None).expect("no override");
        assert_eq!(default_run.active_model.id, "openai/gpt-4.1-mini");

        assert!(matches!(
            cfg.run_configuration(&store, Some("nobody/none")),
            Err(ConfigError::InvalidValue { field, .. }) if field == "run.model"
        ));
    }
}
