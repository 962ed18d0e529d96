use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use specrun::runner::{AdapterOutcome, FinalState, OutputBuffer, RunnerBackend, Stream};
use specrun::target::ResolvedTarget;

/// What the fake runner does for a target.
#[derive(Debug, Clone)]
pub enum Script {
    /// Print a passing summary and exit 0.
    Pass,
    /// Print a failing summary and exit with this code.
    Fail(i32),
    /// Behave like a runner binary that could not be started.
    SpawnFail,
    /// Panic inside the backend.
    Panic,
}

/// A fake runner backend that:
/// - records which targets were started
/// - completes according to a per-target [`Script`] (default `Pass`)
/// - optionally holds every run until `complete_one()` or cancellation,
///   so tests control exactly when a run finishes.
#[derive(Clone, Default)]
pub struct FakeRunner {
    started: Arc<Mutex<Vec<ResolvedTarget>>>,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    hold: Arc<AtomicBool>,
    ignore_cancel: Arc<AtomicBool>,
    release: Arc<Notify>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every run until `complete_one()` is called or the run is cancelled.
    pub fn holding(self) -> Self {
        self.hold.store(true, Ordering::SeqCst);
        self
    }

    /// While holding, don't react to cancellation (simulates a run that
    /// finishes naturally right as an abort comes in).
    pub fn ignoring_cancel(self) -> Self {
        self.ignore_cancel.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_holding(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    /// Script the outcome for the target whose display form is `target`.
    pub fn script(&self, target: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(target.to_string(), script);
    }

    /// Let one held run finish.
    pub fn complete_one(&self) {
        self.release.notify_one();
    }

    pub fn started(&self) -> Vec<ResolvedTarget> {
        self.started.lock().unwrap().clone()
    }

    /// Poll until at least `count` runs have started.
    pub async fn wait_for_started(&self, count: usize) {
        for _ in 0..500 {
            if self.started.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("fewer than {count} runs started");
    }

    fn script_for(&self, target: &ResolvedTarget) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get(&target.to_string())
            .cloned()
            .unwrap_or(Script::Pass)
    }
}

impl RunnerBackend for FakeRunner {
    fn run(
        &self,
        target: ResolvedTarget,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = AdapterOutcome> + Send + '_>> {
        Box::pin(async move {
            self.started.lock().unwrap().push(target.clone());
            let script = self.script_for(&target);
            let mut output = OutputBuffer::new(64 * 1024);

            if self.hold.load(Ordering::SeqCst) {
                if self.ignore_cancel.load(Ordering::SeqCst) {
                    self.release.notified().await;
                } else {
                    tokio::select! {
                        _ = self.release.notified() => {}
                        _ = cancel.cancelled() => {
                            output.push(Stream::Stdout, format!("# {target}"));
                            return AdapterOutcome {
                                state: FinalState::Aborted { forced_kill: false },
                                output,
                                elapsed: Duration::from_millis(1),
                            };
                        }
                    }
                }
            }

            let state = match script {
                Script::Pass => {
                    output.push(Stream::Stdout, format!("# {target}"));
                    output.push(
                        Stream::Stdout,
                        "Specifications:\t1 executed\t1 passed\t0 failed\t0 skipped",
                    );
                    output.push(
                        Stream::Stdout,
                        "Scenarios:\t2 executed\t2 passed\t0 failed\t0 skipped",
                    );
                    FinalState::Completed {
                        exit_code: Some(0),
                        signal: None,
                    }
                }
                Script::Fail(code) => {
                    output.push(Stream::Stdout, format!("# {target}"));
                    output.push(Stream::Stderr, "Failed Step: Vowel count is 3");
                    output.push(
                        Stream::Stdout,
                        "Scenarios:\t2 executed\t1 passed\t1 failed\t0 skipped",
                    );
                    FinalState::Completed {
                        exit_code: Some(code),
                        signal: None,
                    }
                }
                Script::SpawnFail => FinalState::SpawnFailed {
                    diagnostic: "failed to start runner `gauge`: No such file or directory"
                        .to_string(),
                },
                Script::Panic => panic!("fake runner exploded"),
            };

            AdapterOutcome {
                state,
                output,
                elapsed: Duration::from_millis(1),
            }
        })
    }
}
