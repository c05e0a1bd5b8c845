//! Configuration file loading.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader};
pub use types::{LoggingConfig, ModelSettings, ResolvedConfig};
