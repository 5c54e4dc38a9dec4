// config.rs - Layered configuration helpers
//
// Each node's config is built in the same order:
//
// 1. Defaults (compile-time)
// 2. TOML file passed with `--config`
// 3. Environment variables (`CONWAY_*`)
// 4. Command-line flags
//
// Each layer overrides the previous one.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },
}

/// Reads a TOML file into `T`; fields missing from the file keep their `serde(default)`.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Reads the file if one was given, otherwise starts from `T::default()`.
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, ConfigError> {
    match path {
        Some(path) => load_file(path),
        None => Ok(T::default()),
    }
}

/// Parses environment variable `name` when it is set.
pub fn env_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar {
                name: name.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Splits a comma-separated environment variable, skipping empty entries.
pub fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| split_list(&raw))
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
