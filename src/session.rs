// src/session.rs

//! Line-oriented command session on stdin.
//!
//! Plays the part of the editor: `open`/`cursor`/`close` change the editor
//! state, everything else is an execution [`Command`]. Runs complete in the
//! background so `stop` can be typed while one is in flight.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::controller::{Command, CommandOutcome, ExecutionController};
use crate::print_result;
use crate::target::EditorState;

/// What a single input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Open { file: String, line: Option<u32> },
    Cursor(u32),
    Close,
    State,
    Quit,
    Command(Command),
}

impl SessionInput {
    pub fn parse(line: &str) -> std::result::Result<Option<SessionInput>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default().to_lowercase();
        let input = match head.as_str() {
            "open" => {
                let file = words.next().ok_or("usage: open <file> [line]")?;
                let line = words
                    .next()
                    .map(|l| l.parse::<u32>().map_err(|e| format!("bad line '{l}': {e}")))
                    .transpose()?;
                SessionInput::Open {
                    file: file.to_string(),
                    line,
                }
            }
            "cursor" => {
                let l = words.next().ok_or("usage: cursor <line>")?;
                SessionInput::Cursor(l.parse().map_err(|e| format!("bad line '{l}': {e}"))?)
            }
            "close" => SessionInput::Close,
            "state" => SessionInput::State,
            "quit" | "exit" => SessionInput::Quit,
            _ => SessionInput::Command(line.parse::<Command>().map_err(|e| e.to_string())?),
        };
        Ok(Some(input))
    }
}

/// Read commands until EOF or `quit`. In-flight runs are stopped and awaited
/// before returning.
pub async fn run_session(
    controller: Arc<ExecutionController>,
    editor: Arc<EditorState>,
    json: bool,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut runs: JoinSet<()> = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        // Reap finished runs so the set doesn't grow.
        while runs.try_join_next().is_some() {}

        let input = match SessionInput::parse(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        debug!(?input, "session input");

        match input {
            SessionInput::Open { file, line } => {
                editor.open(file);
                if let Some(line) = line {
                    editor.set_cursor(line);
                }
            }
            SessionInput::Cursor(line) => editor.set_cursor(line),
            SessionInput::Close => editor.close_all(),
            SessionInput::State => println!("{}", controller.state()),
            SessionInput::Quit => break,
            SessionInput::Command(command) => match controller.dispatch(command) {
                Ok(CommandOutcome::Started(handle)) => {
                    println!("run #{} started: {}", handle.run_id(), handle.target());
                    runs.spawn(async move {
                        let result = handle.wait().await;
                        if let Err(e) = print_result(&result, json) {
                            warn!(error = %e, "printing result failed");
                        }
                    });
                }
                Ok(CommandOutcome::StopRequested(true)) => println!("stopping current run"),
                Ok(CommandOutcome::StopRequested(false)) => println!("nothing to stop"),
                Ok(CommandOutcome::Report(Some(report))) => print!("{}", report.render()),
                Ok(CommandOutcome::Report(None)) => println!("no report yet"),
                Err(e) => eprintln!("{e}"),
            },
        }
    }

    if !runs.is_empty() {
        controller.stop_execution();
        while runs.join_next().await.is_some() {}
    }
    Ok(())
}
