//! Diagnostic path stack.
//!
//! Tracks which page and which nested partials are being rendered so that
//! warnings and errors can name the whole chain (`pl/index.html → _nav.html
//! → _lang_switch.html`). The stack is never persisted.

use std::fmt;

/// Ordered chain of template identifiers, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticStack {
    frames: Vec<String>,
}

impl DiagnosticStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: impl Into<String>) {
        self.frames.push(frame.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop frames until at most `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Copy of the frames, outermost first.
    pub fn snapshot(&self) -> Vec<String> {
        self.frames.clone()
    }
}

impl From<Vec<String>> for DiagnosticStack {
    fn from(frames: Vec<String>) -> Self {
        Self { frames }
    }
}

impl fmt::Display for DiagnosticStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return write!(f, "<site>");
        }
        write!(f, "{}", format_trace(&self.frames))
    }
}

/// Join a captured trace with arrows, outermost first.
pub fn format_trace(frames: &[String]) -> String {
    frames.join(" → ")
}
