//! Run log.
//!
//! Every build appends to a plain-text log in the project root so that
//! warnings about skipped targets survive after the terminal scrolls away:
//!
//! ```text
//! [2026-10-17 21:14:03] Info during processing <site>: build started (incremental: 0 stale page(s))
//! [2026-10-17 21:14:03] Warning during processing fr/birds/robin.html: missing page data _main/birds/robin.fr.json
//! ```
//!
//! Each entry is also forwarded to `tracing`, so `-v` on the command line
//! shows the same events on stderr.

use crate::diagnostics::DiagnosticStack;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "Info"),
            Level::Warning => write!(f, "Warning"),
            Level::Error => write!(f, "Error"),
        }
    }
}

/// Sink for run-level messages, tagged with the diagnostic stack.
pub trait Logger {
    /// Prepare the sink. Called once at the start of a run.
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn log(&mut self, level: Level, stack: &DiagnosticStack, message: &str);

    fn info(&mut self, stack: &DiagnosticStack, message: &str) {
        self.log(Level::Info, stack, message);
    }

    fn warning(&mut self, stack: &DiagnosticStack, message: &str) {
        self.log(Level::Warning, stack, message);
    }

    fn error(&mut self, stack: &DiagnosticStack, message: &str) {
        self.log(Level::Error, stack, message);
    }

    /// Flush and release the sink. Called once on every exit path of a run.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Format one log line (without the trailing newline).
pub fn format_entry(timestamp: &str, level: Level, stack: &DiagnosticStack, message: &str) -> String {
    format!("[{timestamp}] {level} during processing {stack}: {message}")
}

fn forward_to_tracing(level: Level, stack: &DiagnosticStack, message: &str) {
    match level {
        Level::Info => tracing::info!(target: "lingosite::run", %stack, "{message}"),
        Level::Warning => tracing::warn!(target: "lingosite::run", %stack, "{message}"),
        Level::Error => tracing::error!(target: "lingosite::run", %stack, "{message}"),
    }
}

/// Appends entries to a file, one line each.
///
/// Entries logged while the file is not open only reach `tracing`.
#[derive(Debug)]
pub struct FileLogger {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }
}

impl Logger for FileLogger {
    fn open(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn log(&mut self, level: Level, stack: &DiagnosticStack, message: &str) {
        forward_to_tracing(level, stack, message);
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format_entry(&timestamp, level, stack, message);
        if let Err(e) = writeln!(writer, "{line}") {
            tracing::error!(path = %self.path.display(), error = %e, "cannot write run log");
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for FileLogger {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// One entry captured by [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub trace: Vec<String>,
    pub message: String,
}

/// Keeps entries in memory. Useful for tests and for embedding the
/// generator in another program.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    pub entries: Vec<LogEntry>,
    pub opened: usize,
    pub closed: usize,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_level(&self, level: Level) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.level == level)
    }

    pub fn warnings(&self) -> Vec<&LogEntry> {
        self.at_level(Level::Warning).collect()
    }
}

impl Logger for RecordingLogger {
    fn open(&mut self) -> io::Result<()> {
        self.opened += 1;
        Ok(())
    }

    fn log(&mut self, level: Level, stack: &DiagnosticStack, message: &str) {
        forward_to_tracing(level, stack, message);
        self.entries.push(LogEntry {
            level,
            trace: stack.snapshot(),
            message: message.to_string(),
        });
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed += 1;
        Ok(())
    }
}
