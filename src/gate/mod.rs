// src/gate/mod.rs

//! Admission Gate: single-flight execution control.
//!
//! The gate exclusively owns [`ExecutionState`]. `Idle -> Running` happens
//! atomically inside [`AdmissionGate::try_acquire`], which never waits: a
//! request that finds the gate busy is rejected on the spot. The returned
//! [`RunPermit`] is the only way back to `Idle`; it releases on drop, so the
//! gate cannot get stuck even if the run panics.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ControllerError, Result};

/// Identifier assigned to each admitted run, strictly increasing per gate.
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Idle,
    Running,
    Aborting,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionState::Idle => "idle",
            ExecutionState::Running => "running",
            ExecutionState::Aborting => "aborting",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct GateInner {
    state: ExecutionState,
    /// Token of the run holding the gate; `None` while idle.
    cancel: Option<CancellationToken>,
    current: Option<RunId>,
    next_run_id: RunId,
}

#[derive(Debug)]
pub struct AdmissionGate {
    inner: Mutex<GateInner>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGate {
    /// A fresh gate starts `Idle`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: ExecutionState::Idle,
                cancel: None,
                current: None,
                next_run_id: 1,
            }),
        }
    }

    // The critical sections never panic, but recover from poisoning anyway so
    // one bad run can't wedge the gate forever.
    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ExecutionState {
        self.lock().state
    }

    /// Try to move `Idle -> Running`.
    pub fn try_acquire(self: &Arc<Self>) -> Result<RunPermit> {
        let mut inner = self.lock();
        if inner.state != ExecutionState::Idle {
            debug!(state = %inner.state, "admission rejected; a run is in flight");
            return Err(ControllerError::AdmissionRejected);
        }

        let run_id = inner.next_run_id;
        inner.next_run_id += 1;

        let cancel = CancellationToken::new();
        inner.state = ExecutionState::Running;
        inner.cancel = Some(cancel.clone());
        inner.current = Some(run_id);
        drop(inner);

        debug!(run_id, "admission granted");
        Ok(RunPermit {
            gate: Arc::clone(self),
            run_id,
            cancel,
            released: false,
        })
    }

    /// Move `Running -> Aborting` and signal the run's cancellation token.
    ///
    /// Returns `false` (and does nothing) when idle or already aborting.
    pub fn request_abort(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            ExecutionState::Running => {
                inner.state = ExecutionState::Aborting;
                if let Some(ref token) = inner.cancel {
                    token.cancel();
                }
                info!(run_id = inner.current, "abort requested");
                true
            }
            ExecutionState::Aborting => {
                debug!(run_id = inner.current, "abort already in progress");
                false
            }
            ExecutionState::Idle => {
                debug!("abort requested while idle; nothing to do");
                false
            }
        }
    }

    fn release(&self, run_id: RunId) -> Release {
        let mut inner = self.lock();
        if inner.current != Some(run_id) {
            // Unreachable with a single permit per run; keep state untouched.
            warn!(run_id, current = inner.current, "release for a run that does not hold the gate");
            return Release {
                abort_requested: false,
            };
        }

        let abort_requested = inner.state == ExecutionState::Aborting;
        inner.state = ExecutionState::Idle;
        inner.cancel = None;
        inner.current = None;

        debug!(run_id, abort_requested, "gate released");
        Release { abort_requested }
    }
}

/// What the gate knew about the run at the moment it was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    /// An abort was requested at any point while the permit was held.
    pub abort_requested: bool,
}

/// Proof of admission. Exactly one exists per admitted run.
#[derive(Debug)]
pub struct RunPermit {
    gate: Arc<AdmissionGate>,
    run_id: RunId,
    cancel: CancellationToken,
    released: bool,
}

impl RunPermit {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Token observed by the runner; cancelled by [`AdmissionGate::request_abort`].
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Return the gate to `Idle`.
    pub fn release(mut self) -> Release {
        self.released = true;
        self.gate.release(self.run_id)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        if !self.released {
            warn!(run_id = self.run_id, "run permit dropped without explicit release");
            self.gate.release(self.run_id);
        }
    }
}
