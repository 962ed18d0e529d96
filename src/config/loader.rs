// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// A relative `project.root` is anchored at the directory holding the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let mut config = ConfigFile::try_from(raw_config)?;
    config.rebase(&config_base_dir(path));
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the default
/// configuration rooted at the current working directory.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }

    debug!(path = %path.display(), "config file not found; using defaults");
    let mut config = ConfigFile::try_from(RawConfigFile::default())?;
    config.rebase(&config_base_dir(path));
    Ok(config)
}

/// Default config location: `specrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("specrun.toml")
}

/// - "configs/specrun.toml" → "configs"
/// - bare "specrun.toml" (parent = "") → current working directory
fn config_base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
