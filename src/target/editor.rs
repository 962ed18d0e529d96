// src/target/editor.rs

use std::path::PathBuf;
use std::sync::RwLock;

/// Read-only view of the editor state the resolver needs.
pub trait EditorContext: Send + Sync {
    /// Path of the document in the active editor, if any.
    fn active_file(&self) -> Option<PathBuf>;

    /// 1-based cursor line in the active editor, if any.
    fn cursor_line(&self) -> Option<u32>;
}

/// Simple mutable editor state, shared by the CLI session and tests.
#[derive(Debug, Default)]
pub struct EditorState {
    inner: RwLock<EditorSnapshot>,
}

#[derive(Debug, Default, Clone)]
struct EditorSnapshot {
    file: Option<PathBuf>,
    line: Option<u32>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `file` with the cursor on the first line.
    pub fn open(&self, file: impl Into<PathBuf>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.file = Some(file.into());
        guard.line = Some(1);
    }

    /// Move the cursor to a 1-based line. Ignored when no file is open.
    pub fn set_cursor(&self, line: u32) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if guard.file.is_some() {
            guard.line = Some(line);
        }
    }

    /// Move the cursor `lines` down from where it is.
    pub fn move_down(&self, lines: u32) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(line) = guard.line {
            guard.line = Some(line.saturating_add(lines));
        }
    }

    pub fn close_all(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = EditorSnapshot::default();
    }
}

impl EditorContext for EditorState {
    fn active_file(&self) -> Option<PathBuf> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.file.clone()
    }

    fn cursor_line(&self) -> Option<u32> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.line
    }
}
