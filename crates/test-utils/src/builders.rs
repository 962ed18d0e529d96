#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use specrun::config::{ConfigFile, RawConfigFile};
use specrun::controller::ExecutionController;
use specrun::fs::mock::MockFileSystem;
use specrun::report::ReportPublisher;
use specrun::runner::RunnerBackend;
use specrun::target::{EditorContext, EditorState, ProjectScope};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn program(mut self, program: &str) -> Self {
        self.config.runner.program = program.to_string();
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.config.runner.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.runner.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.project.root = root.as_ref().to_path_buf();
        self
    }

    pub fn specs_dir(mut self, dir: &str) -> Self {
        self.config.project.specs_dir = PathBuf::from(dir);
        self
    }

    pub fn abort_grace(mut self, grace: Duration) -> Self {
        self.config.execution.abort_grace = grace;
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.config.execution.max_output_bytes = limit;
        self
    }

    pub fn persist_report(mut self, path: &str) -> Self {
        self.config.report.persist_path = Some(PathBuf::from(path));
        self
    }

    pub fn html_report(mut self, path: &str) -> Self {
        self.config.report.html_report = Some(PathBuf::from(path));
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pieces of a controller wired to a fake runner, kept so tests can poke them.
pub struct TestController {
    pub controller: Arc<ExecutionController>,
    pub editor: Arc<EditorState>,
    pub fs: MockFileSystem,
}

/// Controller over `runner` with default config, an empty editor and an
/// in-memory filesystem.
pub fn controller_with(runner: Arc<dyn RunnerBackend>) -> TestController {
    controller_with_publisher(runner, ReportPublisher::new(), &ConfigFileBuilder::new().build())
}

pub fn controller_with_publisher(
    runner: Arc<dyn RunnerBackend>,
    publisher: ReportPublisher,
    cfg: &ConfigFile,
) -> TestController {
    let editor = Arc::new(EditorState::new());
    let fs = MockFileSystem::new();
    let scope = ProjectScope::from_config(cfg).expect("valid spec patterns");
    let editor_ctx: Arc<dyn EditorContext> = editor.clone();

    let controller = ExecutionController::new(scope, runner, publisher, editor_ctx, Arc::new(fs.clone()))
        .with_html_report(cfg.html_report_path());

    TestController {
        controller: Arc::new(controller),
        editor,
        fs,
    }
}
