use std::{
    fs, io,
    path::{Path, PathBuf},
};

use mdnotes_markup::RenderConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    #[serde(flatten)]
    pub render: RenderConfig,
}

/// Error type for configuration loading operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading the file.
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// TOML parsing error.
    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads the render configuration from a TOML file.
///
/// Every key is optional; missing keys keep their defaults.
///
/// ```toml
/// font-family = "serif"
/// font-size = "16px"
/// document-color = "#000"
/// ```
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[inline]
fn parse_config(s: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(s)?;
    Ok(config)
}
