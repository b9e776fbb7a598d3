//! Configuration loading, validation, and management for CalMate.
//!
//! Loads configuration from `~/.calmate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.calmate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature. Scheduling wants deterministic answers.
    #[serde(default)]
    pub default_temperature: f32,

    /// Max tokens per LLM response (unset = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub search: SearchConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("sessions", &self.sessions)
            .field("gateway", &self.gateway)
            .field("calendar", &self.calendar)
            .field("search", &self.search)
            .field("providers", &self.providers)
            .field("identity", &self.identity)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("backend", &self.backend)
            .field("calendar_id", &self.calendar_id)
            .field("access_token", &redact(&self.access_token))
            .field("client_id", &redact(&self.client_id))
            .field("client_secret", &redact(&self.client_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Agent loop limits and scheduling defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum THINKING→ACTING→OBSERVING cycles per user message
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Minimum gap between a new event and its neighbours
    #[serde(default = "default_conflict_buffer_minutes")]
    pub conflict_buffer_minutes: i64,

    /// IANA zone used when the user does not name one
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

fn default_max_cycles() -> u32 {
    10
}
fn default_model_timeout_secs() -> u64 {
    60
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_conflict_buffer_minutes() -> i64 {
    30
}
fn default_timezone() -> String {
    "America/New_York".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            conflict_buffer_minutes: default_conflict_buffer_minutes(),
            default_timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Turns kept per session (0 = unbounded)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Idle sessions are evicted after this many minutes (0 = never)
    #[serde(default = "default_idle_ttl_minutes")]
    pub idle_ttl_minutes: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_turns() -> usize {
    200
}
fn default_idle_ttl_minutes() -> u64 {
    1440
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            idle_ttl_minutes: default_idle_ttl_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
            max_body_bytes: default_body_limit(),
        }
    }
}

/// Which calendar to talk to and how to authenticate.
#[derive(Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// "google" or "memory"
    #[serde(default = "default_calendar_backend")]
    pub backend: String,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// A ready-to-use OAuth access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

fn default_calendar_backend() -> String {
    "google".into()
}
fn default_calendar_id() -> String {
    "primary".into()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            backend: default_calendar_backend(),
            calendar_id: default_calendar_id(),
            access_token: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
        }
    }
}

impl CalendarConfig {
    /// Whether enough credentials are present for the refresh-token grant.
    pub fn can_refresh(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }
}

/// Web search (Tavily).
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_results")]
    pub max_results: u32,
}

fn default_search_results() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: default_search_results(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Replaces the assistant's persona paragraph. Scheduling rules are
    /// still appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.calmate/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `CALMATE_API_KEY`, then `GEMINI_API_KEY`, then `OPENAI_API_KEY`
    /// - `CALMATE_PROVIDER`, `CALMATE_MODEL`
    /// - `TAVILY_API_KEY`
    /// - `GOOGLE_CALENDAR_TOKEN`, `GOOGLE_CLIENT_ID`,
    ///   `GOOGLE_CLIENT_SECRET`, `GOOGLE_REFRESH_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let key = lookup("CALMATE_API_KEY")
            .or_else(|| lookup("GEMINI_API_KEY"))
            .or_else(|| lookup("OPENAI_API_KEY"));
        if key.is_some() {
            self.api_key = key;
        }

        if let Some(provider) = lookup("CALMATE_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("CALMATE_MODEL") {
            self.default_model = model;
        }

        if let Some(key) = lookup("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }

        let calendar = &mut self.calendar;
        for (var, slot) in [
            ("GOOGLE_CALENDAR_TOKEN", &mut calendar.access_token),
            ("GOOGLE_CLIENT_ID", &mut calendar.client_id),
            ("GOOGLE_CLIENT_SECRET", &mut calendar.client_secret),
            ("GOOGLE_REFRESH_TOKEN", &mut calendar.refresh_token),
        ] {
            if let Some(value) = lookup(var) {
                *slot = Some(value);
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".calmate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_cycles == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_cycles must be at least 1".into(),
            ));
        }

        if self.agent.conflict_buffer_minutes < 0 {
            return Err(ConfigError::ValidationError(
                "agent.conflict_buffer_minutes must not be negative".into(),
            ));
        }

        if self
            .agent
            .default_timezone
            .parse::<chrono_tz::Tz>()
            .is_err()
        {
            return Err(ConfigError::ValidationError(format!(
                "agent.default_timezone '{}' is not an IANA time zone",
                self.agent.default_timezone
            )));
        }

        if !matches!(self.calendar.backend.as_str(), "google" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "calendar.backend must be \"google\" or \"memory\", got \"{}\"",
                self.calendar.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `config --init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: 0.0,
            default_max_tokens: None,
            agent: AgentConfig::default(),
            sessions: SessionsConfig::default(),
            gateway: GatewayConfig::default(),
            calendar: CalendarConfig::default(),
            search: SearchConfig::default(),
            providers: HashMap::new(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.default_model, "gemini-2.5-flash");
        assert_eq!(config.default_temperature, 0.0);
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.agent.max_cycles, 10);
        assert_eq!(config.agent.conflict_buffer_minutes, 30);
        assert_eq!(config.agent.default_timezone, "America/New_York");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.sessions.max_turns, config.sessions.max_turns);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_timezone_rejected() {
        let mut config = AppConfig::default();
        config.agent.default_timezone = "Mars/Olympus_Mons".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn unknown_calendar_backend_rejected() {
        let mut config = AppConfig::default();
        config.calendar.backend = "outlook".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cycle_cap_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_cycles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_model = "gemini-2.5-pro"

[agent]
max_cycles = 4

[calendar]
backend = "memory"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "gemini-2.5-pro");
        assert_eq!(config.agent.max_cycles, 4);
        assert_eq!(config.agent.tool_timeout_secs, 30);
        assert_eq!(config.calendar.backend, "memory");
        assert_eq!(config.calendar.calendar_id, "primary");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_model = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_take_priority() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "gem-key"),
            ("OPENAI_API_KEY", "oa-key"),
            ("CALMATE_MODEL", "gemini-2.0-flash"),
            ("TAVILY_API_KEY", "tvly-key"),
            ("GOOGLE_REFRESH_TOKEN", "refresh"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("gem-key"));
        assert_eq!(config.default_model, "gemini-2.0-flash");
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.search.api_key.as_deref(), Some("tvly-key"));
        assert_eq!(config.calendar.refresh_token.as_deref(), Some("refresh"));
        assert!(config.calendar.access_token.is_none());
    }

    #[test]
    fn absent_env_leaves_file_values() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|_| None);
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-very-secret".into()),
            ..AppConfig::default()
        };
        config.calendar.client_secret = Some("gcal-secret".into());
        config.search.api_key = Some("tvly-secret".into());

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("gcal-secret"));
        assert!(!debug.contains("tvly-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-2.5-flash"));
        assert!(toml_str.contains("8000"));
        assert!(toml_str.contains("America/New_York"));
    }

    #[test]
    fn api_key_from_provider_table_counts() {
        let mut config = AppConfig::default();
        assert!(!config.has_api_key());
        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: Some("k".into()),
                api_url: None,
            },
        );
        assert!(config.has_api_key());
    }
}
