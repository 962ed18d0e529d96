// src/runner/process.rs

//! Runner process lifecycle.

use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;

use super::command::RunnerCommand;
use super::lines::{PipeLine, spawn_line_reader};
use super::output::{OutputBuffer, Stream};
use super::{AdapterOutcome, FinalState};

/// Knobs for one process run.
#[derive(Debug, Clone)]
pub struct ProcessSettings {
    /// Wait after the terminate signal before force-killing.
    pub abort_grace: Duration,
    pub max_output_bytes: usize,
    /// Upper bound on reading leftover output once the process is gone.
    /// Grandchildren that inherited the pipes can otherwise keep them open.
    pub drain_timeout: Duration,
}

impl ProcessSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            abort_grace: cfg.execution.abort_grace,
            max_output_bytes: cfg.execution.max_output_bytes,
            drain_timeout: Duration::from_secs(2),
        }
    }
}

/// Run `command` to completion or until `cancel` fires.
///
/// Never returns while the spawned process is still alive.
pub async fn run_process(
    command: &RunnerCommand,
    cancel: CancellationToken,
    settings: &ProcessSettings,
) -> AdapterOutcome {
    let started = Instant::now();
    let mut output = OutputBuffer::new(settings.max_output_bytes);

    // Checkpoint: an abort that arrived before we spawned anything.
    if cancel.is_cancelled() {
        info!(cmd = %command, "abort requested before spawn; runner not started");
        return AdapterOutcome {
            state: FinalState::Aborted { forced_kill: false },
            output,
            elapsed: started.elapsed(),
        };
    }

    info!(cmd = %command, "starting runner process");

    let mut child = match command.to_command().spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(cmd = %command, error = %e, "failed to spawn runner");
            return AdapterOutcome {
                state: FinalState::SpawnFailed {
                    diagnostic: format!(
                        "failed to start runner `{}`: {}",
                        command.program.to_string_lossy(),
                        e
                    ),
                },
                output,
                elapsed: started.elapsed(),
            };
        }
    };

    let pid = child.id();
    debug!(?pid, "runner process spawned");

    // One reader per pipe: order is exact within a stream, but lines from
    // stdout and stderr are interleaved in arrival order, not write order.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<PipeLine>();
    let line_cap = settings.max_output_bytes;
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, Stream::Stdout, line_cap, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, Stream::Stderr, line_cap, line_tx.clone());
    }
    drop(line_tx);

    let state = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(?pid, "cancellation requested; terminating runner");
                let forced_kill = terminate(&mut child, pid, settings.abort_grace).await;
                break FinalState::Aborted { forced_kill };
            }

            status = child.wait() => {
                match status {
                    Ok(status) => {
                        let (exit_code, signal) = exit_parts(&status);
                        info!(?pid, ?exit_code, ?signal, success = status.success(), "runner process exited");
                        break FinalState::Completed { exit_code, signal };
                    }
                    Err(e) => {
                        warn!(?pid, error = %e, "waiting for runner failed; killing it");
                        output.push(Stream::Stderr, format!("failed to wait for runner: {e}"));
                        force_kill(&mut child, pid);
                        if let Err(e) = child.wait().await {
                            warn!(?pid, error = %e, "waiting for killed runner failed");
                        }
                        break FinalState::Completed { exit_code: None, signal: None };
                    }
                }
            }

            Some(line) = line_rx.recv() => {
                output.push_line(line);
            }
        }
    };

    drain_lines(&mut line_rx, &mut output, settings.drain_timeout).await;

    let outcome = AdapterOutcome {
        state,
        output,
        elapsed: started.elapsed(),
    };

    // A cancel that landed after the exit but before we got here still counts.
    if cancel.is_cancelled() {
        outcome.into_aborted()
    } else {
        outcome
    }
}

async fn drain_lines(
    rx: &mut mpsc::UnboundedReceiver<PipeLine>,
    output: &mut OutputBuffer,
    limit: Duration,
) {
    let drained = timeout(limit, async {
        while let Some(line) = rx.recv().await {
            output.push_line(line);
        }
    })
    .await;

    if drained.is_err() {
        warn!("runner output pipes still open after exit; dropping the rest");
    }
}

/// Ask the runner to stop, escalate to a kill after `grace`.
///
/// Returns `true` when the kill was needed.
async fn terminate(child: &mut Child, pid: Option<u32>, grace: Duration) -> bool {
    send_terminate(child, pid);

    match timeout(grace, child.wait()).await {
        Ok(_) => {
            kill_group_leftovers(pid);
            false
        }
        Err(_) => {
            warn!(?pid, grace_ms = grace.as_millis() as u64, "runner ignored terminate signal; killing");
            force_kill(child, pid);
            if let Err(e) = child.wait().await {
                warn!(?pid, error = %e, "waiting for killed runner failed");
            }
            true
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child, pid: Option<u32>) {
    match pid {
        Some(pid) => signal_group(pid, libc::SIGTERM),
        None => {
            start_kill(child, pid);
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, pid: Option<u32>) {
    start_kill(child, pid);
}

#[cfg(unix)]
fn force_kill(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        signal_group(pid, libc::SIGKILL);
    }
    start_kill(child, pid);
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child, pid: Option<u32>) {
    start_kill(child, pid);
}

fn start_kill(child: &mut Child, pid: Option<u32>) {
    // Fails with InvalidInput once the child has already been reaped.
    if let Err(e) = child.start_kill() {
        debug!(?pid, error = %e, "kill of runner process failed");
    }
}

/// The group leader is gone; make sure nothing it spawned lingers.
#[cfg(unix)]
fn kill_group_leftovers(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let Ok(pgid) = i32::try_from(pid) else { return };
    // SAFETY: signal 0 only probes for existence of the process group.
    let alive = unsafe { libc::kill(-pgid, 0) } == 0;
    if alive {
        debug!(pgid, "killing leftover processes in runner group");
        signal_group(pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group_leftovers(_pid: Option<u32>) {}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = i32::try_from(pid) else { return };
    if pgid <= 0 {
        return;
    }
    // SAFETY: the runner was spawned with `process_group(0)`, so its pid is
    // also the id of a process group containing only the runner's tree.
    unsafe {
        let _ = libc::kill(-pgid, signal);
    }
}

#[cfg(unix)]
fn exit_parts(status: &ExitStatus) -> (Option<i32>, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;
    (status.code(), status.signal())
}

#[cfg(not(unix))]
fn exit_parts(status: &ExitStatus) -> (Option<i32>, Option<i32>) {
    (status.code(), None)
}
