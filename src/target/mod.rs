// src/target/mod.rs

//! Execution targets.
//!
//! A [`Target`] is what the user asked for. Some variants are lazy and only
//! become concrete once resolved against the editor state
//! ([`resolver::resolve`]), producing an immutable [`ResolvedTarget`] that the
//! runner understands.

pub mod editor;
pub mod resolver;

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::errors::{ControllerError, Result};

pub use editor::{EditorContext, EditorState};
pub use resolver::{ProjectScope, SpecMatcher, resolve};

/// An execution trigger, possibly still depending on editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    SpecificationFile(PathBuf),
    ScenarioAtLine { path: PathBuf, line: u32 },
    /// `None` means the project's configured specs directory.
    AllSpecsInDirectory(Option<PathBuf>),
    CurrentlyOpenSpecification,
    ScenarioAtCursor,
    PreviouslyFailed,
}

impl Target {
    /// Parse a command argument: `path` or `path:line`.
    ///
    /// Only a non-empty, all-digit suffix after the last `:` is treated as a
    /// line number, so drive-letter paths like `C:\specs\a.spec` stay paths.
    pub fn parse(raw: &str) -> Result<Target> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ControllerError::UnresolvedContext(
                "empty execution target".to_string(),
            ));
        }

        if let Some((path, line)) = raw.rsplit_once(':') {
            if !path.is_empty() && !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) {
                let line: u32 = line.parse().map_err(|_| {
                    ControllerError::UnresolvedContext(format!("line number out of range in '{raw}'"))
                })?;
                if line == 0 {
                    return Err(ControllerError::UnresolvedContext(format!(
                        "scenario lines are 1-based, got 0 in '{raw}'"
                    )));
                }
                return Ok(Target::ScenarioAtLine {
                    path: PathBuf::from(path),
                    line,
                });
            }
        }

        Ok(Target::SpecificationFile(PathBuf::from(raw)))
    }
}

/// A concrete, immutable target handed to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedTarget {
    SpecificationFile { path: PathBuf },
    ScenarioAtLine { path: PathBuf, line: u32 },
    AllSpecsInDirectory { dir: PathBuf },
    PreviouslyFailed,
}

impl ResolvedTarget {
    /// Descriptor passed to the runner, or `None` when the target is
    /// expressed purely through runner flags.
    pub fn descriptor(&self) -> Option<OsString> {
        match self {
            ResolvedTarget::SpecificationFile { path } => Some(path.clone().into_os_string()),
            ResolvedTarget::ScenarioAtLine { path, line } => {
                let mut s = path.clone().into_os_string();
                s.push(format!(":{line}"));
                Some(s)
            }
            ResolvedTarget::AllSpecsInDirectory { dir } => Some(dir.clone().into_os_string()),
            ResolvedTarget::PreviouslyFailed => None,
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedTarget::SpecificationFile { path } => write!(f, "{}", path.display()),
            ResolvedTarget::ScenarioAtLine { path, line } => {
                write!(f, "{}:{}", path.display(), line)
            }
            ResolvedTarget::AllSpecsInDirectory { dir } => write!(f, "{} (all specs)", dir.display()),
            ResolvedTarget::PreviouslyFailed => write!(f, "previously failed scenarios"),
        }
    }
}
