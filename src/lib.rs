//! # lingosite
//!
//! An incremental static site generator for multilingual sites. One skeleton
//! template wraps every page; each skeleton data file declares a language,
//! and every page is rendered once per language it has data for.
//!
//! # Architecture: Scan, Then Generate
//!
//! ```text
//! 1. Scan      skeleton + _main/  →  SourceTree    (languages, pages, assets)
//! 2. Generate  SourceTree         →  output/       (language × page targets)
//! ```
//!
//! Generation is incremental. Every rendered target records the files it
//! read (page template, data files, partials, global data) with their
//! content fingerprints. The next run loads that record from the build cache
//! and renders only targets whose recorded inputs changed, whose output is
//! gone, or that were never registered. A changed skeleton invalidates
//! everything.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Finds the language data files, pages and assets of a project |
//! | [`generate`] | Drives a build: cache load, render loop, asset copy, cache save |
//! | [`cache`] | Fingerprints, the modification checker and its binary cache file |
//! | [`render`] | The template engine boundary and the built-in placeholder engine |
//! | [`diagnostics`] | Stack of pages and partials being processed, for error traces |
//! | [`logger`] | Run log sinks: appended log file, in-memory recorder |
//! | [`config`] | Optional `config.toml` loading, stock defaults, validation |
//! | [`types`] | Build targets, per-target outcomes, the build summary |
//! | [`naming`] | Filename conventions: language codes, partials, output destinations |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Dependencies Are Recorded, Not Declared
//!
//! Nobody lists what a page depends on. The engine reads every file through
//! [`render::RenderContext`], which fingerprints it on the way in. The set is
//! therefore exact for the last successful render, including partials pulled
//! in conditionally. Dependencies are committed to the checker only after the
//! output file has been written, so a failed render leaves the target pending.
//!
//! ## The Cache Survives Failures
//!
//! A fatal render error stops the run, but the cache is still written. Every
//! target rendered before the failure is recorded, and the next run resumes
//! where this one stopped instead of starting over. Pages that were stale
//! but never reached are unregistered first, so a shared input refreshed by
//! an earlier page cannot hide their change.
//!
//! ## Missing Data Is Not an Error
//!
//! Sites rarely translate every page at once. A page without data for some
//! language is skipped for that language with a warning in the run log, and
//! the rest of the build goes on.
//!
//! ## Explicit Render Context
//!
//! The engine gets its paths, diagnostic stack and dependency buffer through
//! a context value, never through globals. Tests drive the generator with a
//! mock engine and an in-memory logger; nothing is shared between runs.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod generate;
pub mod logger;
pub mod naming;
pub mod output;
pub mod render;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
