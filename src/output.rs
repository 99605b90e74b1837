//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (language, page, skipped target) leads with its identity:
//! a positional index and its name, with file locations as indented
//! context lines underneath.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Languages
//! 001 default
//!     Source: skeleton.json
//! 002 pl
//!     Source: skeleton.pl.json
//!
//! Pages
//! 001 birds/robin.sbn-html
//!     default → birds/robin.html
//!     pl → pl/birds/robin.html
//!     fr → (no data, skipped)
//!
//! Assets
//!     css/site.css
//!
//! 6 targets (2 languages × 3 pages)
//! ```
//!
//! ## Build
//!
//! ```text
//! [ 17%] birds/robin.html
//! [ 33%] index.html
//! ...
//! Cache: full rebuild: no build cache
//! Generated 5 pages, 0 up to date, 1 skipped, 1 asset copied
//! Skipped
//!     fr/birds/robin.html
//!         missing page data _main/birds/robin.fr.json
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::{ProjectLayout, TemplatesConfig};
use crate::naming::output_page_key;
use crate::scan::SourceTree;
use crate::types::GenerateSummary;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path relative to `base` with `/` separators, or the full path.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the discovered sources and every target they produce.
pub fn format_check_output(
    tree: &SourceTree,
    layout: &ProjectLayout,
    templates: &TemplatesConfig,
) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Languages".to_string());
    if tree.languages.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, language) in tree.languages.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), language.code));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_path(&language.data_file, &layout.root)
        ));
    }

    lines.push(String::new());
    lines.push("Pages".to_string());
    for (i, page) in tree.pages.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            display_path(&page.relative, Path::new(""))
        ));
        for language in &tree.languages {
            let destination = if page.languages.contains(&language.code) {
                output_page_key(
                    &page.relative,
                    &language.code,
                    &templates.default_language,
                    &templates.output_extension,
                )
            } else {
                "(no data, skipped)".to_string()
            };
            lines.push(format!("{}{} → {}", indent(1), language.code, destination));
        }
    }

    if !tree.assets.is_empty() {
        lines.push(String::new());
        lines.push("Assets".to_string());
        for asset in &tree.assets {
            lines.push(format!(
                "{}{}",
                indent(1),
                display_path(asset, Path::new(""))
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} ({} × {})",
        plural(tree.target_count(), "target"),
        plural(tree.languages.len(), "language"),
        plural(tree.pages.len(), "page")
    ));
    lines
}

pub fn print_check_output(tree: &SourceTree, layout: &ProjectLayout, templates: &TemplatesConfig) {
    for line in format_check_output(tree, layout, templates) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// One progress line: `[ 42%] pl/index.html`.
pub fn format_progress(percent: u8, current: &str) -> String {
    format!("[{:>3}%] {}", percent, current)
}

pub fn print_progress(percent: u8, current: &str) {
    println!("{}", format_progress(percent, current));
}

/// Format the end-of-build summary.
pub fn format_summary(summary: &GenerateSummary, root: &Path) -> Vec<String> {
    let mut lines = vec![
        format!("Cache: {}", summary.state),
        format!(
            "Generated {}, {} up to date, {} skipped, {} copied",
            plural(summary.rendered, "page"),
            summary.up_to_date,
            summary.skipped.len(),
            plural(summary.assets_copied, "asset")
        ),
    ];
    if !summary.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for skipped in &summary.skipped {
            lines.push(format!("{}{}", indent(1), skipped.output_key));
            let reason = skipped
                .reason
                .replace(&format!("{}/", root.to_string_lossy()), "");
            lines.push(format!("{}{}", indent(2), reason));
        }
    }
    lines
}

pub fn print_summary(summary: &GenerateSummary, root: &Path) {
    for line in format_summary(summary, root) {
        println!("{}", line);
    }
}
