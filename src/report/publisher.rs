// src/report/publisher.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;

use super::Report;

/// Somewhere a published report is delivered to, besides memory.
pub trait ReportSink: Send + Sync {
    fn deliver(&self, report: &Report) -> Result<()>;
}

/// Writes the rendered report to a file, replacing it atomically.
#[derive(Debug)]
pub struct FileReportSink {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileReportSink {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl ReportSink for FileReportSink {
    fn deliver(&self, report: &Report) -> Result<()> {
        self.fs
            .write_atomic(&self.path, report.render().as_bytes())?;
        debug!(path = %self.path.display(), run_id = report.run_id, "report written");
        Ok(())
    }
}

/// Holds the single current [`Report`].
///
/// Readers get an `Arc<Report>` snapshot, so a reader never observes a
/// partially replaced report.
#[derive(Default)]
pub struct ReportPublisher {
    current: RwLock<Option<Arc<Report>>>,
    sinks: Vec<Box<dyn ReportSink>>,
    // Serialises sink delivery so a stale report can't overwrite a newer file.
    delivery: Mutex<()>,
}

impl fmt::Debug for ReportPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportPublisher")
            .field("current_run", &self.current_run_id())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl ReportPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Make `report` the current report and deliver it to every sink.
    ///
    /// A report older than the current one is ignored. Sink failures are
    /// logged and swallowed. Returns whether `report` became current.
    pub fn publish(&self, report: Report) -> bool {
        let report = Arc::new(report);
        let run_id = report.run_id;

        {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            if let Some(ref existing) = *current {
                if existing.run_id > run_id {
                    debug!(run_id, current = existing.run_id, "ignoring stale report");
                    return false;
                }
            }
            *current = Some(Arc::clone(&report));
        }
        info!(run_id, status = report.status_label(), "report published");

        let _guard = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
        if self.current_run_id() != Some(run_id) {
            debug!(run_id, "newer report arrived before delivery; skipping sinks");
            return true;
        }
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(&report) {
                warn!(run_id, error = %e, "report delivery failed");
            }
        }
        true
    }

    /// The last published report; `None` before the first run.
    pub fn current_report(&self) -> Option<Arc<Report>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn current_run_id(&self) -> Option<u64> {
        self.current_report().map(|r| r.run_id)
    }
}
