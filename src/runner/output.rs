// src/runner/output.rs

use serde::Serialize;

use super::lines::PipeLine;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// Runner output in arrival order, bounded to `limit` bytes.
///
/// Once the limit is hit further lines are dropped and `truncated` is set.
/// Lines clipped by the pipe reader also set `truncated`.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: Vec<OutputLine>,
    bytes: usize,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: Vec::new(),
            bytes: 0,
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, stream: Stream, text: impl Into<String>) {
        let text = text.into();
        // +1 for the newline added when the buffer is joined.
        let cost = text.len() + 1;
        if self.truncated || self.bytes + cost > self.limit {
            self.truncated = true;
            return;
        }
        self.bytes += cost;
        self.lines.push(OutputLine { stream, text });
    }

    pub(crate) fn push_line(&mut self, line: PipeLine) {
        let clipped = line.clipped;
        self.push(line.stream, line.text);
        if clipped {
            self.truncated = true;
        }
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
