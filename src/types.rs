//! Shared types for the generate stage and the CLI output.

use crate::cache::CacheState;
use std::fmt;
use std::path::PathBuf;

/// One (page, language) combination considered for generation.
///
/// Created by the generator per run and discarded after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Full path of the page template.
    pub page: PathBuf,
    pub language: String,
    /// Languages the page has per-language data for.
    pub available_languages: Vec<String>,
    /// Normalized destination relative to the output root; also the cache key.
    pub output_key: String,
    /// Full path of the destination file.
    pub output_path: PathBuf,
}

/// What happened to a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Rendered,
    /// Nothing it depends on changed since the last build.
    UpToDate,
    /// The page has no data for this language; the run goes on.
    SkippedMissingData(String),
    /// The engine failed; the run stops after saving the cache.
    Fatal { message: String, trace: Vec<String> },
}

/// A target skipped for missing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTarget {
    pub output_key: String,
    pub reason: String,
}

/// Summary of a completed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    /// How the cache was restored at the start of the run.
    pub state: CacheState,
    pub targets: usize,
    pub rendered: usize,
    pub up_to_date: usize,
    pub skipped: Vec<SkippedTarget>,
    pub assets_copied: usize,
    /// Whether the build cache file was rewritten.
    pub cache_written: bool,
}

impl GenerateSummary {
    pub fn new(state: CacheState, targets: usize) -> Self {
        Self {
            state,
            targets,
            rendered: 0,
            up_to_date: 0,
            skipped: Vec::new(),
            assets_copied: 0,
            cache_written: false,
        }
    }
}

impl fmt::Display for GenerateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} up to date, {} skipped ({} targets)",
            self.rendered,
            self.up_to_date,
            self.skipped.len(),
            self.targets
        )
    }
}
