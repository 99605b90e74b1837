//! Centralized filename conventions.
//!
//! Every file in a project is classified by its name alone:
//!
//! - `skeleton.html` → the skeleton template wrapped around every page
//! - `skeleton.pl.json` → global data for language `pl`
//! - `skeleton.json` → global data for the default language
//! - `_main/blog/post.html` → a page, rendered once per language
//! - `_main/blog/post.pl.json` → that page's data for language `pl`
//! - `_main/blog/post.json` → that page's language-independent data
//! - `_main/_header.html` → a partial, never rendered on its own
//!
//! This module also owns the mapping from (page, language) to the output
//! destination and the normalization of cache keys.

use std::path::{Component, Path, PathBuf};

/// Result of parsing a data filename like `skeleton.pl.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileName {
    /// Everything before the language segment (`skeleton` in `skeleton.pl.json`).
    pub base: String,
    /// Language code, or the default language when the name has no
    /// language segment.
    pub language: String,
}

/// Parse a data filename following the `<base>.<lang>.<ext>` convention.
///
/// - `"skeleton.pl.json"` → base=`skeleton`, language=`pl`
/// - `"skeleton.json"` → base=`skeleton`, language=`default_language`
/// - `"post.v2.en-GB.json"` → base=`post.v2`, language=`en-GB`
/// - `"skeleton.html"` → `None` (wrong extension)
/// - `".json"` → `None` (no base)
pub fn parse_data_file_name(
    file_name: &str,
    data_extension: &str,
    default_language: &str,
) -> Option<DataFileName> {
    let stem = file_name
        .strip_suffix(data_extension)?
        .strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }
    match stem.rsplit_once('.') {
        Some((base, language)) if !base.is_empty() && !language.is_empty() => {
            Some(DataFileName {
                base: base.to_string(),
                language: language.to_string(),
            })
        }
        Some(_) => None,
        None => Some(DataFileName {
            base: stem.to_string(),
            language: default_language.to_string(),
        }),
    }
}

/// Whether a file is a partial (excluded from top-level generation).
pub fn is_partial(file_name: &str, partial_prefix: &str) -> bool {
    file_name.starts_with(partial_prefix)
}

/// Whether a path carries one of the page template extensions.
///
/// Extensions compare case-insensitively and may themselves contain
/// dashes (`sbn-html`).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(&ext)))
}

/// Filename without its final extension (`post` for `post.sbn-html`).
pub fn page_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Per-language data file sibling of a page: `<dir>/<stem>.<lang>.<ext>`.
pub fn page_language_data_path(page: &Path, language: &str, data_extension: &str) -> PathBuf {
    page.with_file_name(format!("{}.{language}.{data_extension}", page_stem(page)))
}

/// Language-independent data file sibling of a page: `<dir>/<stem>.<ext>`.
pub fn page_universal_data_path(page: &Path, data_extension: &str) -> PathBuf {
    page.with_file_name(format!("{}.{data_extension}", page_stem(page)))
}

/// Output subfolder for a language; the default language writes to the root.
pub fn language_dir<'a>(language: &'a str, default_language: &str) -> Option<&'a str> {
    (language != default_language).then_some(language)
}

/// Site-absolute prefix for links into a language's subtree.
///
/// - `"pl"` → `"/pl"`
/// - `"default"` → `""`
pub fn language_dir_path(language: &str, default_language: &str) -> String {
    language_dir(language, default_language)
        .map(|dir| format!("/{dir}"))
        .unwrap_or_default()
}

/// Output page key (relative to the output root) for a page in a language.
///
/// The page's relative directory is mirrored, the extension is replaced
/// with `output_extension`, and non-default languages get a subfolder:
///
/// - `("blog/post.sbn-html", "pl")` → `"pl/blog/post.html"`
/// - `("index.html", "default")` → `"index.html"`
pub fn output_page_key(
    relative_page: &Path,
    language: &str,
    default_language: &str,
    output_extension: &str,
) -> String {
    let file_name = format!("{}.{output_extension}", page_stem(relative_page));
    let relative = match relative_page.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    };
    let key = match language_dir(language, default_language) {
        Some(dir) => Path::new(dir).join(relative),
        None => relative,
    };
    normalize_key(&key.to_string_lossy())
}

/// Canonical form of a cache key.
///
/// Separators become `/`, `.` components and repeated separators are
/// dropped. Letter case is preserved.
///
/// - `"pl\\blog\\post.html"` → `"pl/blog/post.html"`
/// - `"./_main//index.pl.json"` → `"_main/index.pl.json"`
pub fn normalize_key(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let joined = unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Cache key for a resource: relative to `root` when it lives under it,
/// otherwise the full path.
pub fn resource_key(root: &Path, resource: &Path) -> String {
    let relative = resource
        .strip_prefix(root)
        .ok()
        .filter(|rel| !rel.components().any(|c| matches!(c, Component::ParentDir)))
        .unwrap_or(resource);
    normalize_key(&relative.to_string_lossy())
}
