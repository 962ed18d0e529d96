// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ControllerError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ControllerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runner(cfg)?;
    validate_project(cfg)?;
    validate_execution(cfg)?;
    Ok(())
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.program.trim().is_empty() {
        return Err(ControllerError::ConfigError(
            "[runner].program must not be empty".to_string(),
        ));
    }
    if cfg.runner.failed_flag.trim().is_empty() {
        return Err(ControllerError::ConfigError(
            "[runner].failed_flag must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.specs_dir.as_os_str().is_empty() {
        return Err(ControllerError::ConfigError(
            "[project].specs_dir must not be empty".to_string(),
        ));
    }
    if cfg.project.spec_patterns.is_empty() {
        return Err(ControllerError::ConfigError(
            "[project].spec_patterns must contain at least one glob".to_string(),
        ));
    }
    for pattern in cfg.project.spec_patterns.iter() {
        Glob::new(pattern).map_err(|e| {
            ControllerError::ConfigError(format!(
                "[project].spec_patterns contains invalid glob '{}': {}",
                pattern, e
            ))
        })?;
    }
    Ok(())
}

fn validate_execution(cfg: &RawConfigFile) -> Result<()> {
    if cfg.execution.abort_grace.is_zero() {
        return Err(ControllerError::ConfigError(
            "[execution].abort_grace must be greater than zero".to_string(),
        ));
    }
    if cfg.execution.max_output_bytes == 0 {
        return Err(ControllerError::ConfigError(
            "[execution].max_output_bytes must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
