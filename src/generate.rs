//! Site generation.
//!
//! Stage 2 of the lingosite build pipeline. Takes the [`SourceTree`] from the
//! scan stage and renders every (language, page) target through a
//! [`TemplateEngine`], skipping targets the build cache knows are current.
//!
//! ## Run Order
//!
//! ```text
//! 1. validate skeleton path        (fails before any I/O)
//! 2. open run log
//! 3. scan sources
//! 4. load build cache              (cold or warm, see cache module)
//! 5. for language in languages:    (sorted by code)
//!      for page in pages:          (sorted by path)
//!        up to date?  → register, next
//!        render       → record dependencies, write output
//!        missing data → warn, skip target
//!        other error  → stop the run
//! 6. copy assets
//! 7. save build cache              (always, even after a fatal error)
//! 8. close run log                 (always)
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! output/
//! ├── index.html                 # default language at the root
//! ├── birds/robin.html
//! ├── css/site.css               # assets, copied once
//! ├── pl/
//! │   ├── index.html
//! │   └── birds/robin.html
//! └── fr/
//!     └── index.html             # robin has no French data
//! ```
//!
//! Progress is reported after every target as the share of attempted
//! targets out of languages × pages, so skipped targets still count.

use crate::cache::{CacheError, ModificationChecker};
use crate::config::{ProjectLayout, SiteConfig};
use crate::diagnostics::{DiagnosticStack, format_trace};
use crate::logger::{FileLogger, Logger};
use crate::naming::output_page_key;
use crate::render::{PlaceholderEngine, RenderContext, RenderRequest, TemplateEngine};
use crate::scan::{self, LanguageSource, PageSource, ScanError, SourceTree};
use crate::types::{BuildTarget, GenerateSummary, SkippedTarget, TargetOutcome};
use serde_json::Value;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum GenerateError {
    /// No skeleton template was given.
    #[error("no skeleton template given")]
    MissingSkeletonPath,
    #[error("skeleton template not found: {}", .0.display())]
    SkeletonNotFound(PathBuf),
    #[error("cannot open run log {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A global data file is not valid JSON.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The template engine failed; `trace` is the page/partial chain,
    /// outermost first.
    #[error("{message} (in {})", format_trace(.trace))]
    Render { message: String, trace: Vec<String> },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Receives progress after every attempted target.
///
/// Called synchronously from the build loop; implementations must return
/// quickly and must not touch build state.
pub trait ProgressReporter {
    fn report(&mut self, percent: u8, current: &str);
}

impl<F: FnMut(u8, &str)> ProgressReporter for F {
    fn report(&mut self, percent: u8, current: &str) {
        self(percent, current)
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _percent: u8, _current: &str) {}
}

/// `round(completed / total * 100)`, clamped to 100.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (completed as f64 / total as f64 * 100.0).round();
    percent.min(100.0) as u8
}

/// Project root for a skeleton path: its parent directory, or `.`.
pub fn project_root(skeleton_path: &Path) -> PathBuf {
    match skeleton_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Build a site with the built-in engine, logging to the configured file.
pub fn generate(
    skeleton_path: &Path,
    config: SiteConfig,
    force_rebuild: bool,
    progress: &mut dyn ProgressReporter,
) -> Result<GenerateSummary, GenerateError> {
    let log_file = config.layout(&project_root(skeleton_path)).log_file;
    SiteGenerator::new(config, PlaceholderEngine::new(), FileLogger::new(log_file))
        .force_rebuild(force_rebuild)
        .generate_site(skeleton_path, progress)
}

/// Drives a full build: owns the engine and the run log.
pub struct SiteGenerator<E, L> {
    config: SiteConfig,
    engine: E,
    logger: L,
    force_rebuild: bool,
}

impl<E: TemplateEngine, L: Logger> SiteGenerator<E, L> {
    pub fn new(config: SiteConfig, engine: E, logger: L) -> Self {
        Self {
            config,
            engine,
            logger,
            force_rebuild: false,
        }
    }

    /// Ignore the build cache and render every target.
    pub fn force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn into_logger(self) -> L {
        self.logger
    }

    pub fn generate_site(
        &mut self,
        skeleton_path: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<GenerateSummary, GenerateError> {
        if skeleton_path.as_os_str().is_empty() {
            return Err(GenerateError::MissingSkeletonPath);
        }
        if !skeleton_path.is_file() {
            return Err(GenerateError::SkeletonNotFound(skeleton_path.to_path_buf()));
        }
        let layout = self.config.layout(&project_root(skeleton_path));

        self.logger.open().map_err(|source| GenerateError::Log {
            path: layout.log_file.clone(),
            source,
        })?;
        let result = self.run(skeleton_path, &layout, progress);
        match &result {
            Ok(summary) => self.logger.info(
                &DiagnosticStack::new(),
                &format!("build finished: {summary}"),
            ),
            Err(GenerateError::Render { message, trace }) => {
                self.logger
                    .error(&DiagnosticStack::from(trace.clone()), message)
            }
            Err(e) => self.logger.error(&DiagnosticStack::new(), &e.to_string()),
        }
        let closed = self.logger.close();

        let summary = result?;
        closed.map_err(|source| GenerateError::Log {
            path: layout.log_file.clone(),
            source,
        })?;
        Ok(summary)
    }

    fn run(
        &mut self,
        skeleton_path: &Path,
        layout: &ProjectLayout,
        progress: &mut dyn ProgressReporter,
    ) -> Result<GenerateSummary, GenerateError> {
        let tree = scan::scan(skeleton_path, layout, &self.config.templates)?;
        let skeleton = fs::read_to_string(skeleton_path).map_err(io_error(skeleton_path))?;

        let mut checker = SaveOnUnwind(ModificationChecker::new(
            &layout.root,
            &layout.output_dir,
            &layout.cache_file,
        ));
        let state = checker.load(&skeleton, self.force_rebuild).clone();
        info!(%state, pages = tree.pages.len(), languages = tree.languages.len(), "starting build");
        self.logger
            .info(&DiagnosticStack::new(), &format!("build started ({state})"));
        if tree.languages.is_empty() {
            self.logger.warning(
                &DiagnosticStack::new(),
                &format!(
                    "no global data files next to {}; nothing to render",
                    skeleton_path.display()
                ),
            );
        }

        let mut summary = GenerateSummary::new(state, tree.target_count());
        let built = self
            .render_targets(&tree, layout, &skeleton, &mut checker, &mut summary, progress)
            .and_then(|()| copy_assets(&tree, layout));

        // The cache is saved whether or not the loop finished, so work done
        // before a fatal error is not repeated next time. Pages the loop
        // never reached must not look up to date afterwards.
        if built.is_err() {
            checker.abandon_pending();
        }
        let saved = checker.save_if_needed();
        summary.assets_copied = built?;
        summary.cache_written = saved?;
        Ok(summary)
    }

    fn render_targets(
        &mut self,
        tree: &SourceTree,
        layout: &ProjectLayout,
        skeleton: &str,
        checker: &mut ModificationChecker,
        summary: &mut GenerateSummary,
        progress: &mut dyn ProgressReporter,
    ) -> Result<(), GenerateError> {
        fs::create_dir_all(&layout.output_dir).map_err(io_error(&layout.output_dir))?;

        let total = tree.target_count();
        let mut completed = 0;
        let mut stack = DiagnosticStack::new();

        for language in &tree.languages {
            let global = GlobalData::read(language)?;
            for page in &tree.pages {
                let target = self.build_target(page, language, layout);
                let outcome = if checker.needs_regeneration(&target.output_key, &target.output_path)
                {
                    self.render_target(&target, layout, skeleton, &global, &mut stack, checker)?
                } else {
                    TargetOutcome::UpToDate
                };

                match outcome {
                    TargetOutcome::Rendered => summary.rendered += 1,
                    TargetOutcome::UpToDate => summary.up_to_date += 1,
                    TargetOutcome::SkippedMissingData(reason) => {
                        summary.skipped.push(SkippedTarget {
                            output_key: target.output_key.clone(),
                            reason,
                        })
                    }
                    TargetOutcome::Fatal { message, trace } => {
                        return Err(GenerateError::Render { message, trace });
                    }
                }
                checker.register_page(&target.output_key);

                completed += 1;
                progress.report(progress_percent(completed, total), &target.output_key);
            }
        }
        Ok(())
    }

    fn build_target(
        &self,
        page: &PageSource,
        language: &LanguageSource,
        layout: &ProjectLayout,
    ) -> BuildTarget {
        let templates = &self.config.templates;
        let output_key = output_page_key(
            &page.relative,
            &language.code,
            &templates.default_language,
            &templates.output_extension,
        );
        BuildTarget {
            page: page.path.clone(),
            language: language.code.clone(),
            available_languages: page.languages.clone(),
            output_path: layout.output_dir.join(&output_key),
            output_key,
        }
    }

    /// Render one stale target and write it out.
    ///
    /// Dependencies reach the checker only after the output file is written.
    fn render_target(
        &mut self,
        target: &BuildTarget,
        layout: &ProjectLayout,
        skeleton: &str,
        global: &GlobalData<'_>,
        stack: &mut DiagnosticStack,
        checker: &mut ModificationChecker,
    ) -> Result<TargetOutcome, GenerateError> {
        stack.push(target.output_key.as_str());
        let request = RenderRequest {
            page_path: &target.page,
            output_key: &target.output_key,
            skeleton,
            global_data: &global.value,
            language: &target.language,
            available_languages: &target.available_languages,
        };
        let mut ctx = RenderContext::new(layout, &self.config.templates, stack);
        let rendered = self.engine.render(&mut ctx, &request);
        let dependencies = ctx.into_dependencies();

        let outcome = match rendered {
            Ok(text) => write_output(&target.output_path, &text).map(|()| {
                checker.add_resource(&target.output_key, &global.source.data_file, &global.bytes);
                for dep in &dependencies {
                    checker.add_resource(&target.output_key, &dep.path, &dep.content);
                }
                debug!(page = %target.output_key, deps = dependencies.len() + 1, "rendered");
                TargetOutcome::Rendered
            }),
            Err(e) if e.is_recoverable() => {
                self.logger.warning(stack, &e.to_string());
                debug!(page = %target.output_key, reason = %e, "skipped");
                Ok(TargetOutcome::SkippedMissingData(e.to_string()))
            }
            Err(e) => {
                let trace = if e.trace().is_empty() {
                    stack.snapshot()
                } else {
                    e.trace().to_vec()
                };
                Ok(TargetOutcome::Fatal {
                    message: e.to_string(),
                    trace,
                })
            }
        };
        stack.pop();
        outcome
    }
}

/// Saves the build cache when a panicking engine unwinds through the run.
///
/// Normal and error returns save explicitly in [`SiteGenerator::run`].
struct SaveOnUnwind(ModificationChecker);

impl Deref for SaveOnUnwind {
    type Target = ModificationChecker;

    fn deref(&self) -> &ModificationChecker {
        &self.0
    }
}

impl DerefMut for SaveOnUnwind {
    fn deref_mut(&mut self) -> &mut ModificationChecker {
        &mut self.0
    }
}

impl Drop for SaveOnUnwind {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        self.0.abandon_pending();
        if let Err(e) = self.0.save_if_needed() {
            error!(error = %e, "cannot save build cache after a panic");
        }
    }
}

/// Global data of one language, shared by all of its targets.
struct GlobalData<'a> {
    source: &'a LanguageSource,
    bytes: Vec<u8>,
    value: Value,
}

impl<'a> GlobalData<'a> {
    fn read(source: &'a LanguageSource) -> Result<Self, GenerateError> {
        let path = &source.data_file;
        let bytes = fs::read(path).map_err(io_error(path))?;
        let value = serde_json::from_slice(&bytes).map_err(|source| GenerateError::Json {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            source,
            bytes,
            value,
        })
    }
}

fn write_output(path: &Path, text: &str) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(path, text).map_err(io_error(path))
}

/// Copy every asset into the output tree, overwriting. Returns the count.
fn copy_assets(tree: &SourceTree, layout: &ProjectLayout) -> Result<usize, GenerateError> {
    for relative in &tree.assets {
        let src = layout.main_dir.join(relative);
        let dst = layout.output_dir.join(relative);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        fs::copy(&src, &dst).map_err(io_error(&src))?;
    }
    Ok(tree.assets.len())
}
