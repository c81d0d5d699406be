// src/config/mod.rs
// Layered service configuration.
// Resolution order: CLI flags > env vars (handled by clap) > config file > defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagnosis::gemini::{GeminiSettings, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::history::ValidationMode;
use crate::server::db::PoolSettings;

/// Request bodies carry base64 images, so the limit is generous
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    // ── Database
    pub database_url: String,
    pub sqlite_max_connections: u32,
    pub sqlite_busy_timeout_secs: u64,

    // ── Server
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub validation: ValidationMode,

    // ── Diagnosis provider
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub provider_timeout_secs: u64,

    // ── Logging
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://plantcare.db".to_string(),
            sqlite_max_connections: 10,
            sqlite_busy_timeout_secs: 5,
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            validation: ValidationMode::Strict,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            provider_timeout_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

/// Values accepted on the command line or from the environment
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    /// Config file (default: ~/.plantcare/config.toml)
    #[arg(long, global = true, env = "PLANTCARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database URL (sqlite)
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Bind host
    #[arg(long, global = true, env = "PLANTCARE_HOST")]
    pub host: Option<String>,

    /// Bind port
    #[arg(long, global = true, env = "PLANTCARE_PORT")]
    pub port: Option<u16>,

    /// Maximum request body size in bytes
    #[arg(long, global = true, env = "PLANTCARE_MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,

    /// SQLite pool size
    #[arg(long, global = true, env = "SQLITE_MAX_CONNECTIONS")]
    pub sqlite_max_connections: Option<u32>,

    /// Create-request validation: strict or lenient
    #[arg(long, global = true, env = "PLANTCARE_VALIDATION")]
    pub validation: Option<ValidationMode>,

    /// Gemini API key for the diagnosis provider
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, global = true, env = "GEMINI_MODEL")]
    pub gemini_model: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, env = "PLANTCARE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Contents of the TOML config file
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub sqlite_max_connections: Option<u32>,
    pub sqlite_busy_timeout_secs: Option<u64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_body_bytes: Option<usize>,
    pub validation: Option<ValidationMode>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub provider_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Load a config file. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Get the default config file path
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".plantcare")
        .join("config.toml")
}

impl ServiceConfig {
    /// Read the config file named by `args` (or the default one) and merge
    pub fn load(args: ConfigArgs) -> Self {
        let path = args.config.clone().unwrap_or_else(config_path);
        let file = FileConfig::load(&path);
        Self::resolve(args, file)
    }

    pub fn resolve(args: ConfigArgs, file: FileConfig) -> Self {
        let defaults = Self::default();

        Self {
            database_url: args.database_url.or(file.database_url).unwrap_or(defaults.database_url),
            sqlite_max_connections: args
                .sqlite_max_connections
                .or(file.sqlite_max_connections)
                .unwrap_or(defaults.sqlite_max_connections),
            sqlite_busy_timeout_secs: file
                .sqlite_busy_timeout_secs
                .unwrap_or(defaults.sqlite_busy_timeout_secs),
            host: args.host.or(file.host).unwrap_or(defaults.host),
            port: args.port.or(file.port).unwrap_or(defaults.port),
            max_body_bytes: args.max_body_bytes.or(file.max_body_bytes).unwrap_or(defaults.max_body_bytes),
            validation: args.validation.or(file.validation).unwrap_or(defaults.validation),
            gemini_api_key: args
                .gemini_api_key
                .or(file.gemini_api_key)
                .filter(|key| !key.trim().is_empty()),
            gemini_model: args.gemini_model.or(file.gemini_model).unwrap_or(defaults.gemini_model),
            gemini_base_url: file.gemini_base_url.unwrap_or(defaults.gemini_base_url),
            provider_timeout_secs: file
                .provider_timeout_secs
                .unwrap_or(defaults.provider_timeout_secs),
            log_level: args.log_level.or(file.log_level).unwrap_or(defaults.log_level),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.sqlite_max_connections,
            busy_timeout: Duration::from_secs(self.sqlite_busy_timeout_secs),
            ..PoolSettings::default()
        }
    }

    /// Provider settings, or `None` when no API key is configured
    pub fn gemini_settings(&self) -> Option<GeminiSettings> {
        self.gemini_api_key.as_ref().map(|api_key| GeminiSettings {
            api_key: api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.provider_timeout_secs),
        })
    }
}
