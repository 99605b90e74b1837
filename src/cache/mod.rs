//! Build cache for incremental generation.
//!
//! Rendering every (page, language) pair on every build is wasteful when a
//! single data file changed. This module remembers, per output page, which
//! input resources it was rendered from and what those resources looked
//! like, so the next build only re-renders pages whose inputs changed.
//!
//! # Design
//!
//! ## Fingerprints
//!
//! Every tracked resource is identified by a content [`Fingerprint`]: the
//! first 16 bytes of its SHA-256 digest. The skeleton template gets one
//! global fingerprint; changing it invalidates the entire site.
//!
//! ## Dependencies
//!
//! Each resource entry stores the set of output pages that consumed it.
//! Resources are registered while a page renders: the orchestrator records
//! the global language data file, the template engine records the page
//! template, per-page data files and every partial it pulls in.
//!
//! A page is regenerated when:
//! 1. one of its resources changed or disappeared, or
//! 2. it was never registered by a previous build, or
//! 3. its output file is missing from disk
//!
//! ## Storage
//!
//! A single binary file in the project root (`build.cache` by default); see
//! [`format`] for the layout. An unreadable or foreign file is treated the
//! same as a missing one: the build starts cold.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to the `build` command to force a full rebuild. The
//! cache is rewritten at the end of that build.

mod checker;
mod fingerprint;
pub mod format;

pub use checker::{CacheError, CacheState, ColdReason, ModificationChecker};
pub use fingerprint::{FINGERPRINT_LEN, Fingerprint};
pub use format::{ResourceEntry, Snapshot};
