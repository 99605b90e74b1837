//! Source discovery.
//!
//! Stage 1 of the lingosite build pipeline. Looks at the project around the
//! skeleton template and classifies every input file, producing a
//! [`SourceTree`] that the generator walks.
//!
//! ## Directory Structure
//!
//! ```text
//! my-site/                         # Project root (holds the skeleton)
//! ├── skeleton.html                # Skeleton template
//! ├── skeleton.json                # Global data → default language
//! ├── skeleton.pl.json             # Global data → language "pl"
//! ├── _global/                     # Shared partials (not scanned)
//! │   └── _nav.html
//! └── _main/                       # Walked recursively
//!     ├── index.html               # Page
//!     ├── index.default.json       # Page data, default language
//!     ├── index.pl.json            # Page data, "pl"
//!     ├── _footer.html             # Partial: page extension + prefix
//!     ├── birds/
//!     │   ├── robin.sbn-html       # Page
//!     │   └── robin.json           # Language-independent page data
//!     ├── scripts/helpers.sbn      # Script: ignored
//!     └── css/site.css             # Asset: copied verbatim
//! ```
//!
//! ## Classification
//!
//! Under the main directory:
//! - page extension, no partial prefix → **page**
//! - page extension with partial prefix → partial, only rendered when included
//! - data or script extension → consumed by templates, never copied
//! - anything else → **asset**
//!
//! Languages come from the global data files next to the skeleton. The
//! language list, the page list and the asset list are all sorted so that
//! builds are reproducible.

use crate::config::{ProjectLayout, TemplatesConfig};
use crate::naming::{
    has_extension, is_partial, page_language_data_path, page_stem, parse_data_file_name,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Main directory not found: {0}")]
    MissingMainDir(PathBuf),
    #[error("Language '{code}' is defined twice: {} and {}", .first.display(), .second.display())]
    DuplicateLanguage {
        code: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Everything the generator needs to know about the inputs.
#[derive(Debug, Clone)]
pub struct SourceTree {
    /// Sorted by language code.
    pub languages: Vec<LanguageSource>,
    /// Sorted by path relative to the main directory.
    pub pages: Vec<PageSource>,
    /// Static files, relative to the main directory, sorted.
    pub assets: Vec<PathBuf>,
}

impl SourceTree {
    /// Number of (language, page) render targets.
    pub fn target_count(&self) -> usize {
        self.languages.len() * self.pages.len()
    }
}

/// One site language and its global data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSource {
    pub code: String,
    pub data_file: PathBuf,
}

/// One top-level page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    /// Full path of the template.
    pub path: PathBuf,
    /// Path relative to the main directory; mirrored into the output.
    pub relative: PathBuf,
    /// Language codes that have a per-language data file for this page.
    pub languages: Vec<String>,
}

pub fn scan(
    skeleton: &Path,
    layout: &ProjectLayout,
    templates: &TemplatesConfig,
) -> Result<SourceTree, ScanError> {
    let languages = discover_languages(skeleton, &layout.root, templates)?;

    if !layout.main_dir.is_dir() {
        return Err(ScanError::MissingMainDir(layout.main_dir.clone()));
    }

    let mut pages = Vec::new();
    let mut assets = Vec::new();
    for entry in WalkDir::new(&layout.main_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        // WalkDir yields paths under the directory it was given.
        let Ok(relative) = path.strip_prefix(&layout.main_dir) else {
            continue;
        };
        let name = entry.file_name().to_string_lossy();

        match classify(path, &name, templates) {
            Kind::Page => pages.push(PageSource {
                path: path.to_path_buf(),
                relative: relative.to_path_buf(),
                languages: available_languages(path, &languages, &templates.data_extension),
            }),
            Kind::Asset => assets.push(relative.to_path_buf()),
            Kind::Ignored => {}
        }
    }
    pages.sort_by(|a, b| a.relative.cmp(&b.relative));
    assets.sort();

    Ok(SourceTree {
        languages,
        pages,
        assets,
    })
}

enum Kind {
    Page,
    Asset,
    Ignored,
}

fn classify(path: &Path, name: &str, templates: &TemplatesConfig) -> Kind {
    if has_extension(path, &templates.page_extensions) {
        if is_partial(name, &templates.partial_prefix) {
            Kind::Ignored
        } else {
            Kind::Page
        }
    } else if has_extension(path, std::slice::from_ref(&templates.data_extension))
        || has_extension(path, &templates.script_extensions)
    {
        Kind::Ignored
    } else {
        Kind::Asset
    }
}

/// Global data files named `<skeleton stem>[.<lang>].<data ext>` in `root`.
fn discover_languages(
    skeleton: &Path,
    root: &Path,
    templates: &TemplatesConfig,
) -> Result<Vec<LanguageSource>, ScanError> {
    let stem = page_stem(skeleton);
    let mut entries: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut languages: Vec<LanguageSource> = Vec::new();
    for path in entries {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let Some(parsed) = parse_data_file_name(
            &name,
            &templates.data_extension,
            &templates.default_language,
        ) else {
            continue;
        };
        if parsed.base != stem {
            continue;
        }
        if let Some(existing) = languages.iter().find(|l| l.code == parsed.language) {
            return Err(ScanError::DuplicateLanguage {
                code: parsed.language,
                first: existing.data_file.clone(),
                second: path,
            });
        }
        languages.push(LanguageSource {
            code: parsed.language,
            data_file: path,
        });
    }
    languages.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(languages)
}

/// Codes from `languages` for which `page` has a per-language data file.
pub fn available_languages(
    page: &Path,
    languages: &[LanguageSource],
    data_extension: &str,
) -> Vec<String> {
    languages
        .iter()
        .filter(|l| page_language_data_path(page, &l.code, data_extension).is_file())
        .map(|l| l.code.clone())
        .collect()
}
