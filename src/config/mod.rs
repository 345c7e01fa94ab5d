//! Engine configuration
//!
//! TOML schema for the health monitor, the dispatcher, and the targets
//! and group labels registered at startup. Loading happens once at
//! startup; keeping the registry in sync with external storage after
//! that is the embedding application's job.

mod schema;

pub use schema::*;

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Read and parse a TOML configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
