// src/target/resolver.rs

//! Target Resolver: turns a [`Target`] plus editor state into a
//! [`ResolvedTarget`].

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::errors::{ControllerError, Result};

use super::{EditorContext, ResolvedTarget, Target};

/// Decides whether a path names a specification file.
#[derive(Debug, Clone)]
pub struct SpecMatcher {
    set: GlobSet,
}

impl SpecMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                ControllerError::ConfigError(format!("invalid spec pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| ControllerError::ConfigError(format!("building spec patterns: {e}")))?;
        Ok(Self { set })
    }

    pub fn is_spec(&self, path: &Path) -> bool {
        self.set.is_match(path)
            || path
                .file_name()
                .is_some_and(|name| self.set.is_match(Path::new(name)))
    }
}

/// Project facts the resolver needs, derived once from the configuration.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    pub specs_dir: PathBuf,
    pub matcher: SpecMatcher,
}

impl ProjectScope {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Ok(Self {
            specs_dir: cfg.specs_dir(),
            matcher: SpecMatcher::new(&cfg.project.spec_patterns)?,
        })
    }
}

/// Resolve `target` to a concrete runner target.
///
/// Fails with [`ControllerError::UnresolvedContext`] when the target depends
/// on editor state that is not available.
pub fn resolve(
    target: &Target,
    editor: &dyn EditorContext,
    scope: &ProjectScope,
) -> Result<ResolvedTarget> {
    match target {
        Target::SpecificationFile(path) => Ok(ResolvedTarget::SpecificationFile {
            path: path.clone(),
        }),
        Target::ScenarioAtLine { path, line } => scenario_at(path.clone(), *line),
        Target::AllSpecsInDirectory(dir) => Ok(ResolvedTarget::AllSpecsInDirectory {
            dir: dir.clone().unwrap_or_else(|| scope.specs_dir.clone()),
        }),
        Target::CurrentlyOpenSpecification => {
            let path = open_specification(editor, scope)?;
            Ok(ResolvedTarget::SpecificationFile { path })
        }
        Target::ScenarioAtCursor => {
            let path = open_specification(editor, scope)?;
            let line = editor.cursor_line().ok_or_else(|| {
                ControllerError::UnresolvedContext("no cursor position available".to_string())
            })?;
            scenario_at(path, line)
        }
        Target::PreviouslyFailed => Ok(ResolvedTarget::PreviouslyFailed),
    }
}

fn scenario_at(path: PathBuf, line: u32) -> Result<ResolvedTarget> {
    if line == 0 {
        return Err(ControllerError::UnresolvedContext(
            "scenario lines are 1-based".to_string(),
        ));
    }
    Ok(ResolvedTarget::ScenarioAtLine { path, line })
}

fn open_specification(editor: &dyn EditorContext, scope: &ProjectScope) -> Result<PathBuf> {
    let path = editor.active_file().ok_or_else(|| {
        ControllerError::UnresolvedContext("no active specification file".to_string())
    })?;

    if !scope.matcher.is_spec(&path) {
        return Err(ControllerError::UnresolvedContext(format!(
            "{} is not a specification file",
            path.display()
        )));
    }

    Ok(path)
}
