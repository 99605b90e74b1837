//! The boundary between the generator and a template engine.
//!
//! The generator knows nothing about template syntax. For every target it
//! hands a [`RenderRequest`] and a fresh [`RenderContext`] to a
//! [`TemplateEngine`] and gets back either the finished page or a
//! [`RenderError`].
//!
//! Every file the engine reads goes through the context, which buffers it
//! as a dependency of the target. The generator commits the buffer to the
//! build cache only when the target rendered successfully, so a failed or
//! skipped target never leaves half-recorded dependencies behind.

use crate::config::{ProjectLayout, TemplatesConfig};
use crate::diagnostics::DiagnosticStack;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// The page has no data file for the requested language. The target is
    /// skipped with a warning; the build goes on.
    #[error("missing page data {}", .path.display())]
    MissingData { path: PathBuf },
    /// Malformed template, unknown variable, missing partial.
    #[error("{message}")]
    Template { message: String, trace: Vec<String> },
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
        trace: Vec<String>,
    },
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
        trace: Vec<String>,
    },
}

impl RenderError {
    /// Whether the build may continue with the next target.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::MissingData { .. })
    }

    /// Diagnostic chain captured when the error was raised.
    pub fn trace(&self) -> &[String] {
        match self {
            RenderError::MissingData { .. } => &[],
            RenderError::Template { trace, .. }
            | RenderError::Io { trace, .. }
            | RenderError::Json { trace, .. } => trace,
        }
    }
}

/// What to render: one page in one language.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Full path of the page template.
    pub page_path: &'a Path,
    /// Output key of the target (`pl/blog/post.html`).
    pub output_key: &'a str,
    /// Skeleton template text, wrapped around the rendered page.
    pub skeleton: &'a str,
    /// Parsed global data for `language`.
    pub global_data: &'a Value,
    pub language: &'a str,
    /// Languages the page has data for, sorted.
    pub available_languages: &'a [String],
}

/// A file read while rendering, with the exact bytes that were used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Per-target rendering state handed to the engine.
pub struct RenderContext<'a> {
    layout: &'a ProjectLayout,
    templates: &'a TemplatesConfig,
    stack: &'a mut DiagnosticStack,
    dependencies: Vec<Dependency>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        layout: &'a ProjectLayout,
        templates: &'a TemplatesConfig,
        stack: &'a mut DiagnosticStack,
    ) -> Self {
        Self {
            layout,
            templates,
            stack,
            dependencies: Vec::new(),
        }
    }

    pub fn layout(&self) -> &'a ProjectLayout {
        self.layout
    }

    pub fn templates(&self) -> &'a TemplatesConfig {
        self.templates
    }

    pub fn stack(&self) -> &DiagnosticStack {
        &*self.stack
    }

    /// Push `frame` onto the diagnostic stack for the duration of `f`.
    pub fn within<T>(&mut self, frame: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.stack.depth();
        self.stack.push(frame);
        let result = f(self);
        self.stack.truncate(depth);
        result
    }

    pub fn record_dependency(&mut self, path: &Path, content: impl Into<Vec<u8>>) {
        self.dependencies.push(Dependency {
            path: path.to_path_buf(),
            content: content.into(),
        });
    }

    /// Read a template file and record it as a dependency.
    pub fn read_template(&mut self, path: &Path) -> Result<String, RenderError> {
        let text = fs::read_to_string(path).map_err(|source| self.io_error(path, source))?;
        self.record_dependency(path, text.as_bytes());
        Ok(text)
    }

    /// Read and parse a JSON data file, recording it as a dependency.
    ///
    /// A missing file is [`RenderError::MissingData`] when `required`, and
    /// `Ok(None)` otherwise.
    pub fn read_data(&mut self, path: &Path, required: bool) -> Result<Option<Value>, RenderError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if required {
                    return Err(RenderError::MissingData {
                        path: path.to_path_buf(),
                    });
                }
                return Ok(None);
            }
            Err(source) => return Err(self.io_error(path, source)),
        };
        let value = serde_json::from_slice(&bytes).map_err(|source| RenderError::Json {
            path: path.to_path_buf(),
            source,
            trace: self.stack.snapshot(),
        })?;
        self.record_dependency(path, bytes);
        Ok(Some(value))
    }

    /// A [`RenderError::Template`] carrying the current diagnostic chain.
    pub fn template_error(&self, message: impl Into<String>) -> RenderError {
        RenderError::Template {
            message: message.into(),
            trace: self.stack.snapshot(),
        }
    }

    fn io_error(&self, path: &Path, source: io::Error) -> RenderError {
        RenderError::Io {
            path: path.to_path_buf(),
            source,
            trace: self.stack.snapshot(),
        }
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn into_dependencies(self) -> Vec<Dependency> {
        self.dependencies
    }
}

/// A template engine the generator can drive.
///
/// Implementations must read every input through the [`RenderContext`] so
/// that it is tracked for incremental rebuilds.
pub trait TemplateEngine {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        request: &RenderRequest<'_>,
    ) -> Result<String, RenderError>;
}
