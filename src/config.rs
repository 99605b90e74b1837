//! Site configuration module.
//!
//! Handles loading, validating, and merging the optional `config.toml` that
//! sits next to the skeleton template. Stock defaults are overridden by
//! whatever the file sets; everything else keeps its default.
//!
//! ## Config File Location
//!
//! ```text
//! my-site/
//! ├── config.toml          # Optional
//! ├── skeleton.html        # Skeleton template (passed on the command line)
//! ├── skeleton.json        # Global data, default language
//! ├── skeleton.pl.json     # Global data, language "pl"
//! ├── _global/             # Shared partials
//! ├── _main/               # Pages, mirrored into the output directory
//! └── output/              # Generated site
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! main = "_main"              # Page templates and static assets
//! global = "_global"          # Shared partials
//! output = "output"           # Generated site
//! cache_file = "build.cache"  # Incremental build cache
//! log_file = "website.log"    # Run log (appended)
//!
//! [templates]
//! page_extensions = ["html", "sbn-html"]
//! partial_prefix = "_"
//! output_extension = "html"
//! data_extension = "json"
//! script_extensions = ["sbn"]  # Never copied as assets
//! default_language = "default"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory and file names, relative to the project root.
    pub paths: PathsConfig,
    /// Template and data filename conventions.
    pub templates: TemplatesConfig,
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paths = &self.paths;
        for (key, value) in [
            ("paths.main", &paths.main),
            ("paths.global", &paths.global),
            ("paths.output", &paths.output),
            ("paths.cache_file", &paths.cache_file),
            ("paths.log_file", &paths.log_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if paths.main == paths.output {
            return Err(ConfigError::Validation(
                "paths.main and paths.output must differ".into(),
            ));
        }
        let templates = &self.templates;
        if templates.page_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "templates.page_extensions must not be empty".into(),
            ));
        }
        if templates.partial_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "templates.partial_prefix must not be empty".into(),
            ));
        }
        if templates.data_extension.is_empty() || templates.output_extension.is_empty() {
            return Err(ConfigError::Validation(
                "templates.data_extension and templates.output_extension must not be empty"
                    .into(),
            ));
        }
        if templates.default_language.is_empty() {
            return Err(ConfigError::Validation(
                "templates.default_language must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolved directory layout for a project rooted at `root`.
    pub fn layout(&self, root: &Path) -> ProjectLayout {
        ProjectLayout {
            root: root.to_path_buf(),
            main_dir: root.join(&self.paths.main),
            global_dir: root.join(&self.paths.global),
            output_dir: root.join(&self.paths.output),
            cache_file: root.join(&self.paths.cache_file),
            log_file: root.join(&self.paths.log_file),
        }
    }
}

/// Directory and file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Page templates, per-page data and static assets.
    pub main: String,
    /// Shared partials and data.
    pub global: String,
    /// Generated site.
    pub output: String,
    /// Incremental build cache.
    pub cache_file: String,
    /// Run log, appended to on every build.
    pub log_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            main: "_main".into(),
            global: "_global".into(),
            output: "output".into(),
            cache_file: "build.cache".into(),
            log_file: "website.log".into(),
        }
    }
}

/// Template and data filename conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Extensions of page templates (without the dot).
    pub page_extensions: Vec<String>,
    /// Filenames starting with this are partials, not pages.
    pub partial_prefix: String,
    /// Extension of every generated page.
    pub output_extension: String,
    /// Extension of data files (global and per-page).
    pub data_extension: String,
    /// Template-script files: never rendered, never copied.
    pub script_extensions: Vec<String>,
    /// Language code rendered into the output root instead of a subfolder.
    pub default_language: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            page_extensions: vec!["html".into(), "sbn-html".into()],
            partial_prefix: "_".into(),
            output_extension: "html".into(),
            data_extension: "json".into(),
            script_extensions: vec!["sbn".into()],
            default_language: "default".into(),
        }
    }
}

/// Absolute locations derived from [`PathsConfig`] and a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub main_dir: PathBuf,
    pub global_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_file: PathBuf,
    pub log_file: PathBuf,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load the config for a project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# lingosite configuration
# =======================
# Place this file next to the skeleton template. All settings are optional;
# the values below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the directory holding the skeleton template)
# ---------------------------------------------------------------------------
[paths]
# Page templates, per-page data files and static assets. The directory
# structure is mirrored into the output directory.
main = "_main"

# Shared partials, looked up before the page's own directory.
global = "_global"

# Generated site. Non-default languages get a subfolder named after the code.
output = "output"

# Incremental build cache. Delete it (or pass --no-cache) to rebuild all pages.
cache_file = "build.cache"

# Run log; warnings about skipped pages end up here.
log_file = "website.log"

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
[templates]
# Files with these extensions under `main` are pages.
page_extensions = ["html", "sbn-html"]

# Pages whose filename starts with this prefix are partials and are only
# rendered when included.
partial_prefix = "_"

# Every generated page gets this extension, whatever its template used.
output_extension = "html"

# Data files: <skeleton>.<lang>.json, <page>.<lang>.json, <page>.json
data_extension = "json"

# Script files are neither rendered nor copied to the output.
script_extensions = ["sbn"]

# This language renders into the output root; all others into <output>/<code>/.
default_language = "default"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_paths() {
        let config = SiteConfig::default();
        assert_eq!(config.paths.main, "_main");
        assert_eq!(config.paths.global, "_global");
        assert_eq!(config.paths.output, "output");
        assert_eq!(config.paths.cache_file, "build.cache");
    }

    #[test]
    fn default_config_templates() {
        let config = SiteConfig::default();
        assert_eq!(config.templates.page_extensions, vec!["html", "sbn-html"]);
        assert_eq!(config.templates.partial_prefix, "_");
        assert_eq!(config.templates.default_language, "default");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[paths]
output = "public"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.output, "public");
        assert_eq!(config.paths.main, "_main");
        assert_eq!(config.templates.output_extension, "html");
    }

    #[test]
    fn layout_joins_root() {
        let config = SiteConfig::default();
        let layout = config.layout(Path::new("/srv/site"));
        assert_eq!(layout.main_dir, PathBuf::from("/srv/site/_main"));
        assert_eq!(layout.output_dir, PathBuf::from("/srv/site/output"));
        assert_eq!(layout.cache_file, PathBuf::from("/srv/site/build.cache"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.paths.output, "output");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[paths]
main = "pages"

[templates]
default_language = "en"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.paths.main, "pages");
        assert_eq!(config.templates.default_language, "en");
        // Unspecified values should be defaults
        assert_eq!(config.paths.global, "_global");
        assert_eq!(config.templates.partial_prefix, "_");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[paths]
output = "_main"
"#,
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.paths.main, defaults.paths.main);
        assert_eq!(config.paths.log_file, defaults.paths.log_file);
        assert_eq!(
            config.templates.page_extensions,
            defaults.templates.page_extensions
        );
        assert_eq!(
            config.templates.script_extensions,
            defaults.templates.script_extensions
        );
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn empty_page_extensions_rejected() {
        let mut config = SiteConfig::default();
        config.templates.page_extensions.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn empty_partial_prefix_rejected() {
        let mut config = SiteConfig::default();
        config.templates.partial_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_directory_rejected() {
        let mut config = SiteConfig::default();
        config.paths.global = "  ".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("paths.global"));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"output = "output""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"output = "public""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("output").unwrap().as_str(), Some("public"));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[paths]
main = "_main"
output = "output"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[paths]
output = "public"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let paths = merged.get("paths").unwrap();
        assert_eq!(paths.get("output").unwrap().as_str(), Some("public"));
        assert_eq!(paths.get("main").unwrap().as_str(), Some("_main"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"page_extensions = ["html", "sbn-html"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"page_extensions = ["htm"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged.get("page_extensions").unwrap().as_array().unwrap().len(),
            1
        );
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[paths]
ouput = "public"
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[pathz]
main = "x"
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[templates]
partial_prefx = "_"
"#,
        )
        .unwrap();
        assert!(load_config(tmp.path()).is_err());
    }
}
