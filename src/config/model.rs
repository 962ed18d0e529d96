// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [runner]
/// program = "gauge"
/// args = ["run", "--simple-console", "--hide-suggestion"]
///
/// [project]
/// specs_dir = "specs"
///
/// [execution]
/// abort_grace = "3s"
///
/// [report]
/// persist_path = "reports/last-run.txt"
/// ```
///
/// All sections are optional and have reasonable defaults. Convert into a
/// [`ConfigFile`] with `ConfigFile::try_from(raw)` to run validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub execution: ExecutionSection,

    #[serde(default)]
    pub report: ReportSection,
}

/// Validated configuration used by the rest of the crate.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub project: ProjectSection,
    pub execution: ExecutionSection,
    pub report: ReportSection,
}

impl ConfigFile {
    /// Only `validate.rs` should call this; everything else goes through `TryFrom`.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            runner: raw.runner,
            project: raw.project,
            execution: raw.execution,
            report: raw.report,
        }
    }

    /// Re-anchor a relative `project.root` at `base` (normally the directory
    /// holding the config file).
    pub fn rebase(&mut self, base: &Path) {
        if self.project.root.is_relative() {
            self.project.root = base.join(&self.project.root);
        }
    }

    /// Directory searched by "execute all specs".
    pub fn specs_dir(&self) -> PathBuf {
        self.project.resolve(&self.project.specs_dir)
    }

    /// Working directory for the runner process.
    pub fn runner_working_dir(&self) -> PathBuf {
        match self.runner.working_dir {
            Some(ref dir) => self.project.resolve(dir),
            None => self.project.root.clone(),
        }
    }

    pub fn report_persist_path(&self) -> Option<PathBuf> {
        self.report
            .persist_path
            .as_ref()
            .map(|p| self.project.resolve(p))
    }

    pub fn html_report_path(&self) -> Option<PathBuf> {
        self.report
            .html_report
            .as_ref()
            .map(|p| self.project.resolve(p))
    }
}

/// `[runner]` section: how to launch the external specification runner.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Executable name or path.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the target descriptor.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Working directory; relative paths are resolved against `project.root`.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for the runner.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Flag passed instead of a target when re-running failed scenarios.
    #[serde(default = "default_failed_flag")]
    pub failed_flag: String,
}

fn default_program() -> String {
    "gauge".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "run".to_string(),
        "--simple-console".to_string(),
        "--hide-suggestion".to_string(),
    ]
}

fn default_failed_flag() -> String {
    "--failed".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: None,
            env: BTreeMap::new(),
            failed_flag: default_failed_flag(),
        }
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_specs_dir")]
    pub specs_dir: PathBuf,

    /// Globs identifying specification files, matched against the file path.
    #[serde(default = "default_spec_patterns")]
    pub spec_patterns: Vec<String>,
}

impl ProjectSection {
    /// Resolve `path` against the project root unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from("specs")
}

fn default_spec_patterns() -> Vec<String> {
    vec![
        "**/*.spec".to_string(),
        "**/*.md".to_string(),
        "**/*.cpt".to_string(),
    ]
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            specs_dir: default_specs_dir(),
            spec_patterns: default_spec_patterns(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    /// How long a terminated runner may take to exit before it is killed.
    #[serde(default = "default_abort_grace", with = "humantime_serde")]
    pub abort_grace: Duration,

    /// Upper bound on buffered runner output per run.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_abort_grace() -> Duration {
    Duration::from_secs(3)
}

fn default_max_output_bytes() -> usize {
    4 * 1024 * 1024
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            abort_grace: default_abort_grace(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// `[report]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSection {
    /// Where to write the rendered report after every run. Unset: memory only.
    #[serde(default)]
    pub persist_path: Option<PathBuf>,

    /// HTML report produced by the runner; linked from the report if present.
    #[serde(default)]
    pub html_report: Option<PathBuf>,
}
