use crate::config::types::{ConfigFile, LoggingConfig, ResolvedConfig};
use shellexpand::full;
use std::path::{Path, PathBuf};
use std::{env, fs};

use dirs::{data_dir, home_dir};
use thiserror::Error;

/// Application name used when neither the config nor the caller sets one.
pub const DEFAULT_APPLICATION: &str = "actstats";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("version {0} is unsupported (expected 1)")]
    BadVersion(u32),

    #[error("home directory not available to expand '~'")]
    NoHome,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and resolve the config file.
    ///
    /// `application_override` wins over the file's `application`.
    pub fn load(
        config_path: Option<&Path>,
        application_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let s = fs::read_to_string(&path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;

        let cf: ConfigFile = toml::from_str(&s)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e))?;

        if cf.version != 1 {
            return Err(ConfigError::BadVersion(cf.version));
        }

        Self::resolve(cf, application_override)
    }

    /// Like [`load`](Self::load), but falls back to the defaults when no
    /// path was given and the default config file does not exist.
    pub fn load_or_default(
        config_path: Option<&Path>,
        application_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        if config_path.is_none() && !default_config_path().exists() {
            let cf = ConfigFile {
                version: 1,
                application: None,
                database: Default::default(),
                model: Default::default(),
                ordering: Default::default(),
                logging: Default::default(),
            };
            return Self::resolve(cf, application_override);
        }
        Self::load(config_path, application_override)
    }

    fn resolve(
        cf: ConfigFile,
        application_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let application = application_override
            .map(ToOwned::to_owned)
            .or(cf.application)
            .unwrap_or_else(|| DEFAULT_APPLICATION.to_string());

        let database_path = match &cf.database.path {
            Some(p) => expand_path(p)?,
            None => default_database_path(),
        };

        let ordering_file = match &cf.ordering.file {
            Some(p) => expand_path(p)?,
            None => default_ordering_path(),
        };

        // Resolve log file path if present
        let logging = if let Some(ref file) = cf.logging.file {
            LoggingConfig {
                level: cf.logging.level.clone(),
                file_level: cf.logging.file_level.clone(),
                file: Some(expand_path(&file.to_string_lossy())?),
            }
        } else {
            cf.logging.clone()
        };

        Ok(ResolvedConfig {
            application,
            database_path,
            ordering_file,
            model: cf.model.into(),
            logging,
        })
    }
}

fn config_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("actstats");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("actstats")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default location of user-defined orderings.
pub fn default_ordering_path() -> PathBuf {
    config_dir().join("ordering.toml")
}

/// The activity manager's resources database.
pub fn default_database_path() -> PathBuf {
    let data = data_dir().unwrap_or_else(|| {
        home_dir().unwrap_or_else(|| PathBuf::from("~")).join(".local").join("share")
    });
    data.join("kactivitymanagerd").join("resources").join("database")
}

fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    let expanded = full(input).map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(expanded.to_string()))
}
