//! The modification checker: decides which output pages must be regenerated.
//!
//! State lives in three collections restored from the cache file:
//!
//! - the skeleton fingerprint (one value for the whole site)
//! - registered pages: every output page seen by the last completed run
//! - resources: input file → fingerprint + output pages that consumed it
//!
//! [`ModificationChecker::load`] runs once per build and moves the checker
//! from unloaded to either [`CacheState::Cold`] (everything stale) or
//! [`CacheState::Warm`] (only pages whose resources changed are stale).
//! The cache file is rewritten by [`ModificationChecker::save_if_needed`]
//! only when something changed during the run.

use super::fingerprint::Fingerprint;
use super::format::{self, FormatError, ResourceEntry, Snapshot};
use crate::naming::{normalize_key, resource_key};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to write build cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a run starts from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColdReason {
    /// No cache file on disk.
    NoCache,
    /// The cache file exists but could not be decoded.
    Unreadable(String),
    /// The caller asked for a full rebuild.
    Forced,
    /// The skeleton template changed since the cache was written.
    SkeletonChanged,
}

impl fmt::Display for ColdReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColdReason::NoCache => write!(f, "no build cache"),
            ColdReason::Unreadable(why) => write!(f, "build cache unreadable ({why})"),
            ColdReason::Forced => write!(f, "full rebuild requested"),
            ColdReason::SkeletonChanged => write!(f, "skeleton template changed"),
        }
    }
}

/// Result of [`ModificationChecker::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Unloaded,
    Cold(ColdReason),
    Warm {
        /// Number of pages flagged because a resource changed or vanished.
        stale_pages: usize,
    },
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheState::Unloaded => write!(f, "unloaded"),
            CacheState::Cold(reason) => write!(f, "full rebuild: {reason}"),
            CacheState::Warm { stale_pages } => {
                write!(f, "incremental: {stale_pages} stale page(s)")
            }
        }
    }
}

/// Tracks resource fingerprints and page dependencies across builds.
#[derive(Debug)]
pub struct ModificationChecker {
    /// Resource keys are resolved against this directory.
    project_root: PathBuf,
    /// Page keys are resolved against this directory.
    output_dir: PathBuf,
    cache_path: PathBuf,
    state: CacheState,
    skeleton: Fingerprint,
    registered_pages: BTreeSet<String>,
    resources: BTreeMap<String, ResourceEntry>,
    pending_regeneration: HashSet<String>,
    dirty: bool,
}

impl ModificationChecker {
    pub fn new(project_root: &Path, output_dir: &Path, cache_path: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            cache_path: cache_path.to_path_buf(),
            state: CacheState::Unloaded,
            skeleton: Fingerprint::of(""),
            registered_pages: BTreeSet::new(),
            resources: BTreeMap::new(),
            pending_regeneration: HashSet::new(),
            dirty: false,
        }
    }

    /// Restore the previous build state and work out what is stale.
    ///
    /// Goes cold (discarding all tracked state) when the cache file is
    /// missing or unreadable, when `force_rebuild` is set, or when the
    /// skeleton fingerprint differs. Otherwise every tracked resource is
    /// re-fingerprinted: changed ones flag their dependent pages, vanished
    /// ones flag their dependents and are dropped.
    pub fn load(&mut self, skeleton_content: &str, force_rebuild: bool) -> &CacheState {
        let actual = Fingerprint::of(skeleton_content);
        self.pending_regeneration.clear();

        let snapshot = match self.read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(reason) => return self.go_cold(actual, reason),
        };
        if force_rebuild {
            return self.go_cold(actual, ColdReason::Forced);
        }
        if snapshot.skeleton != actual {
            return self.go_cold(actual, ColdReason::SkeletonChanged);
        }

        self.skeleton = actual;
        self.registered_pages = snapshot.registered_pages;
        self.resources = snapshot.resources;
        self.dirty = false;
        self.drop_vanished_outputs();
        self.flag_changed_resources();

        self.state = CacheState::Warm {
            stale_pages: self.pending_regeneration.len(),
        };
        debug!(
            pages = self.registered_pages.len(),
            resources = self.resources.len(),
            stale = self.pending_regeneration.len(),
            "restored build cache"
        );
        &self.state
    }

    fn read_snapshot(&self) -> Result<Snapshot, ColdReason> {
        let bytes = match std::fs::read(&self.cache_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ColdReason::NoCache),
            Err(e) => return Err(ColdReason::Unreadable(e.to_string())),
        };
        format::decode(&bytes).map_err(|e: FormatError| ColdReason::Unreadable(e.to_string()))
    }

    fn go_cold(&mut self, skeleton: Fingerprint, reason: ColdReason) -> &CacheState {
        debug!(%reason, "starting cold build");
        self.skeleton = skeleton;
        self.registered_pages.clear();
        self.resources.clear();
        self.pending_regeneration.clear();
        // The new skeleton fingerprint has to reach disk even if nothing renders.
        self.dirty = true;
        self.state = CacheState::Cold(reason);
        &self.state
    }

    /// Forget dependents whose output file is gone; the missing-output rule
    /// regenerates them anyway and they re-register on render.
    fn drop_vanished_outputs(&mut self) {
        let output_dir = &self.output_dir;
        for entry in self.resources.values_mut() {
            entry
                .dependent_pages
                .retain(|page| output_dir.join(page).exists());
        }
    }

    fn flag_changed_resources(&mut self) {
        let mut vanished = Vec::new();
        for (key, entry) in &self.resources {
            let path = self.project_root.join(key);
            let changed = match Fingerprint::of_file(&path) {
                Ok(current) => current != entry.fingerprint,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    vanished.push(key.clone());
                    true
                }
                Err(e) => {
                    warn!(resource = %key, error = %e, "cannot read tracked resource, treating as changed");
                    true
                }
            };
            if changed {
                self.pending_regeneration
                    .extend(entry.dependent_pages.iter().cloned());
            }
        }
        if !vanished.is_empty() {
            for key in &vanished {
                debug!(resource = %key, "pruning vanished resource");
                self.resources.remove(key);
            }
            self.dirty = true;
        }
    }

    /// Whether the page must be (re)rendered.
    ///
    /// True when one of its resources is stale, when the page was never
    /// registered, or when its output file is missing from disk.
    pub fn needs_regeneration(&self, page: &str, output_file: &Path) -> bool {
        let page = normalize_key(page);
        self.pending_regeneration.contains(&page)
            || !self.registered_pages.contains(&page)
            || !output_file.exists()
    }

    /// Record that `page` was rendered from `resource` with this content.
    ///
    /// Re-adding a tracked resource merges the dependent pages and
    /// overwrites the fingerprint.
    pub fn add_resource(&mut self, page: &str, resource: &Path, content: &[u8]) {
        let fingerprint = Fingerprint::of(content);
        let page = normalize_key(page);
        let key = resource_key(&self.project_root, resource);
        self.resources
            .entry(key)
            .and_modify(|entry| {
                entry.fingerprint = fingerprint;
                entry.dependent_pages.insert(page.clone());
            })
            .or_insert_with(|| ResourceEntry {
                fingerprint,
                dependent_pages: BTreeSet::from([page.clone()]),
            });
        self.dirty = true;
    }

    /// Remember that `page` exists, whether or not it was rendered this run.
    ///
    /// A registered page is no longer pending: it was either rendered from
    /// current inputs or found up to date.
    pub fn register_page(&mut self, page: &str) {
        let page = normalize_key(page);
        self.pending_regeneration.remove(&page);
        if self.registered_pages.insert(page) {
            self.dirty = true;
        }
    }

    /// Unregister every page still pending, for a run that stopped early.
    ///
    /// Another dependent may already have refreshed a shared resource's
    /// fingerprint, so the change would no longer be visible next run. An
    /// unregistered page is regenerated regardless. Returns the number of
    /// pages dropped.
    pub fn abandon_pending(&mut self) -> usize {
        let mut dropped = 0;
        for page in self.pending_regeneration.drain() {
            if self.registered_pages.remove(&page) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(pages = dropped, "unregistered pages left pending by an interrupted run");
            self.dirty = true;
        }
        dropped
    }

    /// Persist the state if anything changed. Returns whether a write happened.
    pub fn save_if_needed(&mut self) -> Result<bool, CacheError> {
        if !self.dirty {
            return Ok(false);
        }
        let bytes = format::encode(&self.snapshot());
        std::fs::write(&self.cache_path, bytes).map_err(|source| CacheError::Write {
            path: self.cache_path.clone(),
            source,
        })?;
        debug!(path = %self.cache_path.display(), "build cache written");
        self.pending_regeneration.clear();
        self.dirty = false;
        Ok(true)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            skeleton: self.skeleton,
            registered_pages: self.registered_pages.clone(),
            resources: self.resources.clone(),
        }
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn registered_pages(&self) -> &BTreeSet<String> {
        &self.registered_pages
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceEntry> {
        &self.resources
    }

    pub fn is_pending(&self, page: &str) -> bool {
        self.pending_regeneration.contains(&normalize_key(page))
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SKELETON: &str = "<body>{{page}}</body>";

    struct Fixture {
        tmp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            fs::create_dir_all(tmp.path().join("output/pl")).unwrap();
            Self { tmp }
        }

        fn root(&self) -> &Path {
            self.tmp.path()
        }

        fn checker(&self) -> ModificationChecker {
            ModificationChecker::new(
                self.root(),
                &self.root().join("output"),
                &self.root().join("build.cache"),
            )
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.root().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn output(&self, page: &str) -> PathBuf {
            self.root().join("output").join(page)
        }

        /// One completed run: `index.html` and `pl/index.html` depend on
        /// their global data file, output files written.
        fn completed_run(&self) {
            let default_data = self.write("skeleton.default.json", r#"{"t":"Hi"}"#);
            let pl_data = self.write("skeleton.pl.json", r#"{"t":"Cześć"}"#);
            let mut checker = self.checker();
            checker.load(SKELETON, false);
            for (page, data) in [("index.html", &default_data), ("pl/index.html", &pl_data)] {
                checker.add_resource(page, data, &fs::read(data).unwrap());
                checker.register_page(page);
                self.write(&format!("output/{page}"), "rendered");
            }
            assert!(checker.save_if_needed().unwrap());
        }
    }

    #[test]
    fn first_load_is_cold_without_cache() {
        let fx = Fixture::new();
        let mut checker = fx.checker();
        assert_eq!(
            checker.load(SKELETON, false),
            &CacheState::Cold(ColdReason::NoCache)
        );
        assert!(checker.needs_regeneration("index.html", &fx.output("index.html")));
        assert!(checker.is_dirty());
    }

    #[test]
    fn unchanged_inputs_load_warm_with_nothing_stale() {
        let fx = Fixture::new();
        fx.completed_run();

        let mut checker = fx.checker();
        assert_eq!(
            checker.load(SKELETON, false),
            &CacheState::Warm { stale_pages: 0 }
        );
        assert!(!checker.needs_regeneration("index.html", &fx.output("index.html")));
        assert!(!checker.needs_regeneration("pl/index.html", &fx.output("pl/index.html")));
        assert!(!checker.is_dirty());
    }

    #[test]
    fn second_save_without_changes_is_noop() {
        let fx = Fixture::new();
        fx.completed_run();

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        checker.register_page("index.html");
        assert!(!checker.save_if_needed().unwrap());
    }

    #[test]
    fn changed_resource_flags_only_its_dependents() {
        let fx = Fixture::new();
        fx.completed_run();
        fx.write("skeleton.pl.json", r#"{"t":"Dzień dobry"}"#);

        let mut checker = fx.checker();
        assert_eq!(
            checker.load(SKELETON, false),
            &CacheState::Warm { stale_pages: 1 }
        );
        assert!(checker.needs_regeneration("pl/index.html", &fx.output("pl/index.html")));
        assert!(!checker.needs_regeneration("index.html", &fx.output("index.html")));
    }

    #[test]
    fn skeleton_change_goes_cold() {
        let fx = Fixture::new();
        fx.completed_run();

        let mut checker = fx.checker();
        assert_eq!(
            checker.load("<main>{{page}}</main>", false),
            &CacheState::Cold(ColdReason::SkeletonChanged)
        );
        assert!(checker.registered_pages().is_empty());
        assert!(checker.resources().is_empty());
        assert!(checker.needs_regeneration("index.html", &fx.output("index.html")));
    }

    #[test]
    fn force_rebuild_goes_cold() {
        let fx = Fixture::new();
        fx.completed_run();

        let mut checker = fx.checker();
        assert_eq!(
            checker.load(SKELETON, true),
            &CacheState::Cold(ColdReason::Forced)
        );
        assert!(checker.needs_regeneration("index.html", &fx.output("index.html")));
    }

    #[test]
    fn corrupt_cache_goes_cold() {
        let fx = Fixture::new();
        fx.write("build.cache", "definitely not a cache");

        let mut checker = fx.checker();
        assert!(matches!(
            checker.load(SKELETON, false),
            CacheState::Cold(ColdReason::Unreadable(_))
        ));
    }

    #[test]
    fn missing_output_forces_regeneration() {
        let fx = Fixture::new();
        fx.completed_run();
        fs::remove_file(fx.output("index.html")).unwrap();

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert!(checker.needs_regeneration("index.html", &fx.output("index.html")));
    }

    #[test]
    fn unregistered_page_needs_regeneration() {
        let fx = Fixture::new();
        fx.completed_run();
        fx.write("output/new.html", "stale copy");

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert!(checker.needs_regeneration("new.html", &fx.output("new.html")));
    }

    #[test]
    fn vanished_resource_is_pruned_and_dependents_flagged() {
        let fx = Fixture::new();
        fx.completed_run();
        fs::remove_file(fx.root().join("skeleton.pl.json")).unwrap();

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert!(checker.is_pending("pl/index.html"));
        assert!(!checker.resources().contains_key("skeleton.pl.json"));
        assert!(checker.is_dirty());

        assert!(checker.save_if_needed().unwrap());
        let saved = format::decode(&fs::read(checker.cache_path()).unwrap()).unwrap();
        assert!(!saved.resources.contains_key("skeleton.pl.json"));
        assert!(saved.resources.contains_key("skeleton.default.json"));
    }

    #[test]
    fn add_resource_merges_dependents_and_overwrites_fingerprint() {
        let fx = Fixture::new();
        let partial = fx.write("_global/_nav.html", "<nav/>");
        let mut checker = fx.checker();
        checker.load(SKELETON, false);

        checker.add_resource("index.html", &partial, b"<nav/>");
        checker.add_resource("pl/index.html", &partial, b"<nav class=x/>");

        let entry = &checker.resources()["_global/_nav.html"];
        assert_eq!(entry.fingerprint, Fingerprint::of("<nav class=x/>"));
        assert_eq!(
            entry.dependent_pages.iter().collect::<Vec<_>>(),
            vec!["index.html", "pl/index.html"]
        );
    }

    #[test]
    fn keys_are_normalized_at_entry_points() {
        let fx = Fixture::new();
        let data = fx.write("_main/about.pl.json", "{}");
        let mut checker = fx.checker();
        checker.load(SKELETON, false);

        checker.register_page("pl\\about.html");
        checker.add_resource("pl\\about.html", &data, b"{}");

        assert!(checker.registered_pages().contains("pl/about.html"));
        assert!(
            checker.resources()["_main/about.pl.json"]
                .dependent_pages
                .contains("pl/about.html")
        );
    }

    #[test]
    fn register_page_is_idempotent() {
        let fx = Fixture::new();
        fx.completed_run();
        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        checker.register_page("index.html");
        checker.register_page("index.html");
        assert_eq!(checker.registered_pages().len(), 2);
        assert!(!checker.is_dirty());
    }

    #[test]
    fn warm_load_drops_dependents_without_output() {
        let fx = Fixture::new();
        fx.completed_run();
        fs::remove_file(fx.output("pl/index.html")).unwrap();

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert!(
            checker.resources()["skeleton.pl.json"]
                .dependent_pages
                .is_empty()
        );
        assert!(checker.needs_regeneration("pl/index.html", &fx.output("pl/index.html")));
    }

    #[test]
    fn persisted_state_round_trips_through_a_new_checker() {
        let fx = Fixture::new();
        fx.completed_run();

        let mut first = fx.checker();
        first.load(SKELETON, false);
        let before = first.snapshot();

        let saved = format::decode(&fs::read(fx.root().join("build.cache")).unwrap()).unwrap();
        assert_eq!(saved.registered_pages, before.registered_pages);
        assert_eq!(saved.resources, before.resources);
        assert_eq!(saved.skeleton, Fingerprint::of(SKELETON));
    }

    #[test]
    fn save_clears_pending_regeneration() {
        let fx = Fixture::new();
        fx.completed_run();
        fx.write("skeleton.pl.json", "{}");

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert!(checker.is_pending("pl/index.html"));
        let pl = fx.root().join("skeleton.pl.json");
        checker.add_resource("pl/index.html", &pl, b"{}");
        checker.save_if_needed().unwrap();
        assert!(!checker.is_pending("pl/index.html"));
    }

    #[test]
    fn register_page_clears_its_pending_flag() {
        let fx = Fixture::new();
        fx.completed_run();
        fx.write("skeleton.pl.json", "{}");

        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert!(checker.is_pending("pl/index.html"));
        checker.register_page("pl/index.html");
        assert!(!checker.is_pending("pl/index.html"));
    }

    #[test]
    fn abandon_pending_unregisters_pages_not_yet_rendered() {
        let fx = Fixture::new();
        let shared = fx.write("_global/_badge.html", "OLD");
        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        for page in ["index.html", "pl/index.html"] {
            checker.add_resource(page, &shared, b"OLD");
            checker.register_page(page);
            fx.write(&format!("output/{page}"), "OLD");
        }
        checker.save_if_needed().unwrap();

        // Interrupted run: the badge changed, only index.html re-rendered.
        fx.write("_global/_badge.html", "NEW");
        let mut checker = fx.checker();
        assert_eq!(
            checker.load(SKELETON, false),
            &CacheState::Warm { stale_pages: 2 }
        );
        checker.add_resource("index.html", &shared, b"NEW");
        checker.register_page("index.html");
        assert_eq!(checker.abandon_pending(), 1);
        checker.save_if_needed().unwrap();

        let mut next = fx.checker();
        assert_eq!(
            next.load(SKELETON, false),
            &CacheState::Warm { stale_pages: 0 }
        );
        assert!(!next.needs_regeneration("index.html", &fx.output("index.html")));
        assert!(next.needs_regeneration("pl/index.html", &fx.output("pl/index.html")));
    }

    #[test]
    fn abandon_pending_without_pending_pages_stays_clean() {
        let fx = Fixture::new();
        fx.completed_run();
        let mut checker = fx.checker();
        checker.load(SKELETON, false);
        assert_eq!(checker.abandon_pending(), 0);
        assert!(!checker.is_dirty());
    }
}
