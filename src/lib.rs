// src/lib.rs

pub mod cli;
pub mod config;
pub mod controller;
pub mod errors;
pub mod fs;
pub mod gate;
pub mod logging;
pub mod report;
pub mod result;
pub mod runner;
pub mod session;
pub mod target;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, CliCommand};
use crate::config::ConfigFile;
use crate::config::loader::load_or_default;
use crate::controller::ExecutionController;
use crate::result::ExecutionResult;
use crate::target::{EditorState, Target};

pub use crate::controller::{Command, CommandOutcome, RunHandle};
pub use crate::errors::{ADMISSION_REJECTED_MESSAGE, ControllerError};
pub use crate::report::REPORT_URI;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the execution controller (gate, runner, report publisher)
/// - Ctrl-C → stop execution
///
/// Returns the run's status for one-shot commands, `true` otherwise.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let editor = Arc::new(EditorState::new());
    let controller = Arc::new(ExecutionController::from_config(&cfg, editor.clone())?);

    // Ctrl-C → cooperative stop of the in-flight run.
    {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl+C; runs can only be stopped from a session");
                    return;
                }
                info!("Ctrl+C received; stopping execution");
                controller.stop_execution();
            }
        });
    }

    let target = match args.command {
        CliCommand::Run { target } => Target::parse(&target)?,
        CliCommand::Spec { file } => {
            editor.open(file);
            Target::CurrentlyOpenSpecification
        }
        CliCommand::Scenario { file, line } => {
            editor.open(file);
            editor.set_cursor(line);
            Target::ScenarioAtCursor
        }
        CliCommand::All { dir } => Target::AllSpecsInDirectory(dir),
        CliCommand::Failed => Target::PreviouslyFailed,
        CliCommand::Session => {
            session::run_session(controller, editor, args.json).await?;
            return Ok(true);
        }
        CliCommand::ShowConfig => {
            print_config(&cfg);
            return Ok(true);
        }
    };

    let result = controller.execute_and_wait(target).await?;
    print_result(&result, args.json)?;
    Ok(result.status)
}

/// Print a result to stdout: raw runner output followed by a status line,
/// or the whole result as JSON.
pub fn print_result(result: &ExecutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    print!("{}", result.raw_output);
    if !result.raw_output.is_empty() && !result.raw_output.ends_with('\n') {
        println!();
    }
    let verdict = if result.status { "PASSED" } else { "FAILED" };
    match result.exit.exit_code {
        Some(code) => println!(
            "specrun: {verdict} ({:?}, exit code {code})",
            result.exit.disposition
        ),
        None => println!("specrun: {verdict} ({:?})", result.exit.disposition),
    }
    Ok(())
}

/// Show-config output: print the resolved configuration.
fn print_config(cfg: &ConfigFile) {
    println!("specrun configuration");
    println!("  runner.program = {}", cfg.runner.program);
    println!("  runner.args = {:?}", cfg.runner.args);
    println!("  runner.working_dir = {}", cfg.runner_working_dir().display());
    println!("  runner.failed_flag = {}", cfg.runner.failed_flag);
    for (key, value) in cfg.runner.env.iter() {
        println!("  runner.env.{key} = {value}");
    }
    println!("  project.root = {}", cfg.project.root.display());
    println!("  project.specs_dir = {}", cfg.specs_dir().display());
    println!("  project.spec_patterns = {:?}", cfg.project.spec_patterns);
    println!(
        "  execution.abort_grace = {}",
        humantime::format_duration(cfg.execution.abort_grace)
    );
    println!(
        "  execution.max_output_bytes = {}",
        cfg.execution.max_output_bytes
    );
    if let Some(path) = cfg.report_persist_path() {
        println!("  report.persist_path = {}", path.display());
    }
    if let Some(path) = cfg.html_report_path() {
        println!("  report.html_report = {}", path.display());
    }

    debug!("show-config complete (no execution)");
}
