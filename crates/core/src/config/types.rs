use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    /// Identity used for the `:current` agent.
    pub application: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DatabaseConfig {
    /// Location of the resources database (defaults to the activity
    /// manager's database under the XDG data dir).
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_reload_ceiling")]
    pub reload_ceiling: usize,
    #[serde(default = "default_debounce_ms")]
    pub invalidation_debounce_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            reload_ceiling: default_reload_ceiling(),
            invalidation_debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_chunk_size() -> usize {
    50
}

fn default_reload_ceiling() -> usize {
    50
}

fn default_debounce_ms() -> u64 {
    200
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OrderingConfig {
    /// File holding user-defined orderings.
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Tuning of live result models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSettings {
    /// Rows requested per fetch and per fetch-more.
    pub chunk_size: usize,
    /// Above this many cached rows a reload becomes a full reset.
    pub reload_ceiling: usize,
    /// Coalescing window for bulk invalidations.
    pub invalidation_debounce: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelConfig::default().into()
    }
}

impl From<ModelConfig> for ModelSettings {
    fn from(cfg: ModelConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size.max(1),
            reload_ceiling: cfg.reload_ceiling,
            invalidation_debounce: Duration::from_millis(cfg.invalidation_debounce_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub application: String,
    pub database_path: PathBuf,
    pub ordering_file: PathBuf,
    pub model: ModelSettings,
    pub logging: LoggingConfig,
}
