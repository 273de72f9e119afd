//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{FirestoreConfig, IdentityConfig, SessionCache};
use crate::feed::FeedConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub firebase: FirebaseConfig,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_ms: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ApiConfig {
    /// Server settings for the router
    pub fn server(&self) -> crate::api::ApiConfig {
        crate::api::ApiConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout_ms: self.request_timeout_ms,
            max_body_size: self.max_body_size,
            cors_origins: self.cors_origins.clone(),
        }
    }
}

/// Which backend serves documents and identities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Firebase,
    /// In-process store, lost on restart
    #[default]
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firebase" => Ok(BackendKind::Firebase),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
}

/// Firebase project settings
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseConfig {
    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default)]
    pub api_key: String,

    /// OAuth bearer token the server uses for Firestore
    pub access_token: Option<String>,

    #[serde(default = "default_database_id")]
    pub database_id: String,

    /// `host:port` of the Auth emulator
    pub auth_emulator_host: Option<String>,

    /// `host:port` of the Firestore emulator
    pub firestore_emulator_host: Option<String>,

    #[serde(default = "default_backend_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_project_id() -> String {
    "bloodnet".to_string()
}

fn default_database_id() -> String {
    "(default)".to_string()
}

fn default_backend_timeout() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            api_key: String::new(),
            access_token: None,
            database_id: default_database_id(),
            auth_emulator_host: None,
            firestore_emulator_host: None,
            request_timeout_ms: default_backend_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl FirebaseConfig {
    /// Firestore connection, pointed at the emulator when one is configured
    pub fn firestore(&self) -> FirestoreConfig {
        let base = match &self.firestore_emulator_host {
            Some(host) => FirestoreConfig::emulator(host, self.project_id.clone()),
            None => FirestoreConfig {
                project_id: self.project_id.clone(),
                access_token: self.access_token.clone(),
                ..Default::default()
            },
        };

        FirestoreConfig {
            database_id: self.database_id.clone(),
            api_key: (!self.api_key.is_empty()).then(|| self.api_key.clone()),
            request_timeout_ms: self.request_timeout_ms,
            max_retries: self.max_retries,
            ..base
        }
    }

    /// Identity Toolkit connection, pointed at the emulator when one is configured
    pub fn identity(&self) -> IdentityConfig {
        match &self.auth_emulator_host {
            Some(host) => IdentityConfig {
                request_timeout_ms: self.request_timeout_ms,
                ..IdentityConfig::emulator(host)
            },
            None => IdentityConfig {
                api_key: self.api_key.clone(),
                request_timeout_ms: self.request_timeout_ms,
                ..Default::default()
            },
        }
    }
}

/// Real-time feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_feed_enabled")]
    pub enabled: bool,
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_feed_enabled() -> bool {
    true
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            enabled: default_feed_enabled(),
        }
    }
}

impl From<&FeedSettings> for FeedConfig {
    fn from(settings: &FeedSettings) -> Self {
        FeedConfig {
            poll_interval_ms: settings.poll_interval_ms,
            enabled: settings.enabled,
        }
    }
}

/// Verified-token cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_session_entries")]
    pub max_entries: usize,
}

fn default_session_ttl() -> u64 {
    300
}

fn default_session_entries() -> usize {
    10_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            max_entries: default_session_entries(),
        }
    }
}

impl SessionConfig {
    pub fn cache(&self) -> SessionCache {
        SessionCache::new(Duration::from_secs(self.ttl_secs), self.max_entries)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub fn default_directive(&self) -> String {
        format!("bloodnet={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("bloodnet").join("config.toml")),
            Some(PathBuf::from("/etc/bloodnet/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `BLOODNET_*` overrides read through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = lookup("BLOODNET_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("BLOODNET_API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }
        if let Some(origins) = lookup("BLOODNET_CORS_ORIGINS") {
            self.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        // Backend overrides
        match lookup("BLOODNET_BACKEND").map(|kind| kind.parse::<BackendKind>()) {
            Some(Ok(kind)) => self.backend.kind = kind,
            Some(Err(e)) => tracing::warn!("Ignoring BLOODNET_BACKEND: {}", e),
            None => {}
        }

        // Firebase overrides
        if let Some(project_id) = lookup("BLOODNET_FIREBASE_PROJECT_ID") {
            self.firebase.project_id = project_id;
        }
        if let Some(api_key) = lookup("BLOODNET_FIREBASE_API_KEY") {
            self.firebase.api_key = api_key;
        }
        if let Some(token) = lookup("BLOODNET_FIREBASE_ACCESS_TOKEN") {
            self.firebase.access_token = Some(token);
        }
        // Same names the Firebase tooling exports
        if let Some(host) = lookup("FIREBASE_AUTH_EMULATOR_HOST") {
            self.firebase.auth_emulator_host = Some(host);
        }
        if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST") {
            self.firebase.firestore_emulator_host = Some(host);
        }

        // Feed overrides
        if let Some(ms) = lookup("BLOODNET_FEED_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.feed.poll_interval_ms = ms;
        }

        // Logging overrides
        if let Some(level) = lookup("BLOODNET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("BLOODNET_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# BloodNet Configuration
#
# Environment variables override these settings:
# - BLOODNET_API_HOST
# - BLOODNET_API_PORT
# - BLOODNET_CORS_ORIGINS (comma separated)
# - BLOODNET_BACKEND
# - BLOODNET_FIREBASE_PROJECT_ID
# - BLOODNET_FIREBASE_API_KEY
# - BLOODNET_FIREBASE_ACCESS_TOKEN
# - FIREBASE_AUTH_EMULATOR_HOST
# - FIRESTORE_EMULATOR_HOST
# - BLOODNET_FEED_POLL_INTERVAL_MS
# - BLOODNET_LOG_LEVEL
# - BLOODNET_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8080

# Allowed CORS origins (empty allows any)
cors_origins = []

# Request timeout in milliseconds
request_timeout_ms = 30000

# Maximum request body size in bytes
max_body_size = 1048576

[backend]
# "firebase" for Firestore + Identity Toolkit, "memory" for a local in-process store
kind = "memory"

[firebase]
# Firebase project id
project_id = "bloodnet"

# Web API key of the project
api_key = ""

# Bearer token used for Firestore calls
# access_token = ""

# Firestore database id
database_id = "(default)"

# Local emulators (host:port)
# auth_emulator_host = "localhost:9099"
# firestore_emulator_host = "localhost:8085"

# Backend request timeout in milliseconds
request_timeout_ms = 5000

# Attempts for transient backend failures
max_retries = 3

[feed]
# How often the request list is re-read (ms)
poll_interval_ms = 2000

# Enable background polling
enabled = true

[session]
# How long a verified id token is trusted before re-checking (seconds)
ttl_secs = 300

# Maximum cached sessions
max_entries = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
