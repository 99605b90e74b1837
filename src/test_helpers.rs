//! Shared test utilities for the lingosite test suite.
//!
//! Provides a fixture project, small file helpers, and lookups over
//! scan-phase data structures (`SourceTree`, `PageSource`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let layout = fixture_layout(tmp.path());
//! let tree = scan(&skeleton_path(tmp.path()), &layout, &TemplatesConfig::default()).unwrap();
//!
//! let robin = find_page(&tree, "birds/robin.sbn-html");
//! assert_eq!(robin.languages, vec!["default", "pl"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{ProjectLayout, SiteConfig};
use crate::scan::{PageSource, SourceTree};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// The fixture is a small bird guide in three languages (`default`, `fr`,
/// `pl`) with two pages. `birds/robin` has no French data, so a full
/// build renders five targets and skips one.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// The skeleton template of a project created by [`setup_fixtures`].
pub fn skeleton_path(root: &Path) -> PathBuf {
    root.join("skeleton.html")
}

/// Default-config layout for a project rooted at `root`.
pub fn fixture_layout(root: &Path) -> ProjectLayout {
    SiteConfig::default().layout(root)
}

// =========================================================================
// File helpers
// =========================================================================

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// Read `root/rel` as a string. Panics with the path on failure.
pub fn read_file(root: &Path, rel: &str) -> String {
    let path = root.join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

// =========================================================================
// SourceTree lookups: panics with a clear message on miss
// =========================================================================

/// Find a page by its path relative to the main directory. Panics if not found.
pub fn find_page<'a>(tree: &'a SourceTree, relative: &str) -> &'a PageSource {
    tree.pages
        .iter()
        .find(|p| p.relative == Path::new(relative))
        .unwrap_or_else(|| {
            let pages = page_paths(tree);
            panic!("page '{relative}' not found. Available: {pages:?}")
        })
}

/// All page paths (relative, `/`-separated) in scan order.
pub fn page_paths(tree: &SourceTree) -> Vec<String> {
    tree.pages
        .iter()
        .map(|p| p.relative.to_string_lossy().replace('\\', "/"))
        .collect()
}

/// All language codes in scan order.
pub fn language_codes(tree: &SourceTree) -> Vec<&str> {
    tree.languages.iter().map(|l| l.code.as_str()).collect()
}
