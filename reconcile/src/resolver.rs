//! Locating generated files on disk.
//!
//! Lookup runs in tiers, most authoritative first:
//!
//! 1. Generation log, exact: an entry ends with one of the ordered naming
//!    candidates.
//! 2. Generation log, containment: entries in the kind's directory whose
//!    name contains the screen and tab words (strict), the tab words alone
//!    (relaxed), or every significant tab word (keywords).
//! 3. Directory scan: candidates joined to the layout directories.
//!
//! Under [`LookupStrategy::GenerationLog`] the third tier is skipped. A log
//! entry only counts when the file still exists.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use formsync_core::{ArtifactKind, GeneratedArtifact};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::case::kebab_case;
use crate::config::{LookupStrategy, ProjectLayout};
use crate::generation_log::{GenerationLog, LogEntry};
use crate::naming::{NameContext, NamingRules, TabRef};

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    LogExact,
    LogStrict,
    LogRelaxed,
    LogKeywords,
    Directory,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogExact => write!(f, "log_exact"),
            Self::LogStrict => write!(f, "log_strict"),
            Self::LogRelaxed => write!(f, "log_relaxed"),
            Self::LogKeywords => write!(f, "log_keywords"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found {
        artifact: GeneratedArtifact,
        tier: MatchTier,
    },
    NotFound {
        /// Candidate names in the order they were tried.
        tried: Vec<String>,
    },
}

impl Resolution {
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            Self::Found { artifact, .. } => Some(PathBuf::from(&artifact.path)),
            Self::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Name variants a containment tier matches against.
struct Needles {
    screen: String,
    page_dirs: Vec<String>,
    tab: Option<TabNeedles>,
}

struct TabNeedles {
    kebab: String,
    singular: String,
    simple: String,
    compact: String,
    keywords: Vec<String>,
}

/// Finds generated artifacts for a screen.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactResolver<'a> {
    layout: &'a ProjectLayout,
    rules: &'a NamingRules,
    log: Option<&'a GenerationLog>,
    strategy: LookupStrategy,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(layout: &'a ProjectLayout, rules: &'a NamingRules, strategy: LookupStrategy) -> Self {
        Self {
            layout,
            rules,
            log: None,
            strategy,
        }
    }

    pub fn with_log(mut self, log: Option<&'a GenerationLog>) -> Self {
        self.log = log;
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.layout
    }

    /// Looks up one artifact.
    pub fn resolve(&self, kind: ArtifactKind, ctx: &NameContext, tab: Option<TabRef<'_>>) -> Resolution {
        let candidates = self.rules.candidates(kind, ctx, tab);

        if let Some(log) = self.log {
            if let Some((path, tier)) = self.from_log(log, kind, ctx, tab, &candidates) {
                debug!(kind = %kind, tier = %tier, path = %path.display(), "Resolved from generation log");
                return found(kind, path, tier, candidates);
            }
        }

        if self.strategy == LookupStrategy::DirectoryScan {
            if let Some(path) = self.from_directories(kind, ctx, &candidates) {
                debug!(kind = %kind, path = %path.display(), "Resolved by directory scan");
                return found(kind, path, MatchTier::Directory, candidates);
            }
        }

        debug!(kind = %kind, tried = candidates.len(), "Artifact not found");
        Resolution::NotFound { tried: candidates }
    }

    /// Where a missing artifact would be created: the first candidate under
    /// the kind's layout directory.
    pub fn preferred_path(&self, kind: ArtifactKind, ctx: &NameContext, tab: Option<TabRef<'_>>) -> Option<PathBuf> {
        let first = self.rules.candidates(kind, ctx, tab).into_iter().next()?;
        let path = match kind {
            ArtifactKind::Model => self.layout.models_dir.join(first),
            ArtifactKind::UiComponent => self.layout.pages_dir.join(first),
            ArtifactKind::Service => return None,
            ArtifactKind::ListingGrid => self.layout.grids_dir.join(first),
        };
        Some(path)
    }

    fn from_log(
        &self,
        log: &GenerationLog,
        kind: ArtifactKind,
        ctx: &NameContext,
        tab: Option<TabRef<'_>>,
        candidates: &[String],
    ) -> Option<(PathBuf, MatchTier)> {
        let scoped: Vec<&LogEntry> = log
            .entries()
            .iter()
            .filter(|entry| in_scope(kind, entry))
            .collect();
        if scoped.is_empty() {
            return None;
        }

        if kind != ArtifactKind::Service {
            for candidate in candidates {
                let exact = scoped.iter().copied().filter(|e| e.ends_with_path(candidate));
                if let Some(path) = self.first_existing(exact) {
                    return Some((path, MatchTier::LogExact));
                }
            }
        }

        let needles = self.needles(ctx, tab);
        let primary = tab.is_none_or(|t| t.is_primary());
        for &(tier, rule) in containment_tiers(kind, primary) {
            let hits = scoped.iter().copied().filter(|entry| rule(entry, &needles));
            if let Some(path) = self.first_existing(hits) {
                return Some((path, tier));
            }
        }
        None
    }

    fn first_existing<'e>(&self, entries: impl Iterator<Item = &'e LogEntry>) -> Option<PathBuf> {
        for entry in entries {
            let path = entry.resolve(&self.layout.front_src);
            if path.is_file() {
                return Some(path);
            }
            trace!(path = %entry.path, "Logged file no longer exists");
        }
        None
    }

    fn needles(&self, ctx: &NameContext, tab: Option<TabRef<'_>>) -> Needles {
        let screen = self.rules.singular(&kebab_case(&ctx.screen));
        let page_dirs = self.rules.page_dirs(ctx);
        let tab = tab.filter(|t| !t.is_primary()).and_then(|t| {
            let kebab = kebab_case(t.name);
            if kebab.is_empty() {
                return None;
            }
            let keywords = kebab
                .split('-')
                .filter(|w| w.len() > 2 && !self.rules.connector_words.iter().any(|c| c == w))
                .map(str::to_string)
                .collect();
            Some(TabNeedles {
                singular: self.rules.singular(&kebab),
                simple: self.rules.tab_simple(&kebab),
                compact: kebab.replace('-', ""),
                kebab,
                keywords,
            })
        });
        Needles { screen, page_dirs, tab }
    }

    fn from_directories(&self, kind: ArtifactKind, ctx: &NameContext, candidates: &[String]) -> Option<PathBuf> {
        match kind {
            ArtifactKind::Model => self
                .layout
                .model_dirs()
                .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
                .find(|path| path.is_file()),
            ArtifactKind::UiComponent => candidates
                .iter()
                .map(|c| self.layout.pages_dir.join(c))
                .find(|path| path.is_file()),
            ArtifactKind::Service => candidates
                .iter()
                .map(|dir| self.layout.services_dir.join(dir))
                .filter(|dir| dir.is_dir())
                .find_map(|dir| first_service_file(&dir)),
            ArtifactKind::ListingGrid => candidates
                .iter()
                .map(|c| self.layout.grids_dir.join(c))
                .find(|path| path.is_file())
                .or_else(|| {
                    let screen = self.rules.singular(&kebab_case(&ctx.screen));
                    first_file_matching(&self.layout.grids_dir, |name| {
                        name.ends_with(".tsx") && name.contains(&screen)
                    })
                }),
        }
    }
}

fn found(kind: ArtifactKind, path: PathBuf, tier: MatchTier, candidates: Vec<String>) -> Resolution {
    Resolution::Found {
        artifact: GeneratedArtifact::new(kind, path.to_string_lossy(), candidates),
        tier,
    }
}

fn in_scope(kind: ArtifactKind, entry: &LogEntry) -> bool {
    let path = &entry.normalized;
    match kind {
        ArtifactKind::Model => path.contains("/models/") && path.ends_with(".ts"),
        ArtifactKind::UiComponent => {
            path.contains("/pages/") && path.contains("/form/") && path.ends_with(".tsx")
        }
        ArtifactKind::Service => path.contains("/services/") && path.ends_with("service.ts"),
        ArtifactKind::ListingGrid => path.contains("/grids/") && path.ends_with(".tsx"),
    }
}

type TierPredicate = fn(&LogEntry, &Needles) -> bool;

const MODEL_PRIMARY_TIERS: &[(MatchTier, TierPredicate)] = &[(MatchTier::LogStrict, name_has_screen)];

const MODEL_SECONDARY_TIERS: &[(MatchTier, TierPredicate)] = &[
    (MatchTier::LogStrict, name_has_screen_and_tab),
    (MatchTier::LogRelaxed, name_has_tab),
    (MatchTier::LogKeywords, name_has_tab_keywords),
];

const UI_PRIMARY_TIERS: &[(MatchTier, TierPredicate)] = &[
    (MatchTier::LogStrict, is_page_tabs_index),
    (MatchTier::LogRelaxed, is_page_form_index),
];

const UI_SECONDARY_TIERS: &[(MatchTier, TierPredicate)] = &[
    (MatchTier::LogStrict, in_page_and_tab_dir),
    (MatchTier::LogRelaxed, in_tab_dir),
    (MatchTier::LogKeywords, tab_dir_has_keywords),
];

const SERVICE_TIERS: &[(MatchTier, TierPredicate)] = &[
    (MatchTier::LogStrict, in_page_dir),
    (MatchTier::LogRelaxed, name_has_screen),
];

const LISTING_GRID_TIERS: &[(MatchTier, TierPredicate)] = &[(MatchTier::LogStrict, name_has_screen)];

fn containment_tiers(kind: ArtifactKind, primary: bool) -> &'static [(MatchTier, TierPredicate)] {
    match (kind, primary) {
        (ArtifactKind::Model, true) => MODEL_PRIMARY_TIERS,
        (ArtifactKind::Model, false) => MODEL_SECONDARY_TIERS,
        (ArtifactKind::UiComponent, true) => UI_PRIMARY_TIERS,
        (ArtifactKind::UiComponent, false) => UI_SECONDARY_TIERS,
        (ArtifactKind::Service, _) => SERVICE_TIERS,
        (ArtifactKind::ListingGrid, _) => LISTING_GRID_TIERS,
    }
}

fn name_has_screen(entry: &LogEntry, needles: &Needles) -> bool {
    entry.file_name().contains(&needles.screen)
}

fn name_has_screen_and_tab(entry: &LogEntry, needles: &Needles) -> bool {
    let name = entry.file_name();
    needles.tab.as_ref().is_some_and(|tab| {
        name.contains(&needles.screen) && (name.contains(&tab.singular) || name.contains(&tab.kebab))
    })
}

fn name_has_tab(entry: &LogEntry, needles: &Needles) -> bool {
    let name = entry.file_name();
    needles.tab.as_ref().is_some_and(|tab| {
        name.contains(&tab.singular) || name.contains(&tab.simple) || name.contains(&tab.compact)
    })
}

fn name_has_tab_keywords(entry: &LogEntry, needles: &Needles) -> bool {
    let name = entry.file_name();
    needles.tab.as_ref().is_some_and(|tab| {
        !tab.keywords.is_empty() && tab.keywords.iter().all(|k| name.contains(k.as_str()))
    })
}

fn is_page_tabs_index(entry: &LogEntry, needles: &Needles) -> bool {
    entry.normalized.ends_with("/form/tabs/index.tsx") && in_page_dir(entry, needles)
}

fn is_page_form_index(entry: &LogEntry, needles: &Needles) -> bool {
    entry.normalized.ends_with("/form/index.tsx") && in_page_dir(entry, needles)
}

fn in_page_and_tab_dir(entry: &LogEntry, needles: &Needles) -> bool {
    in_page_dir(entry, needles) && in_tab_dir(entry, needles)
}

fn tab_dir_has_keywords(entry: &LogEntry, needles: &Needles) -> bool {
    let Some((_, rest)) = entry.normalized.split_once("/form/tabs/") else {
        return false;
    };
    needles.tab.as_ref().is_some_and(|tab| {
        !tab.keywords.is_empty() && tab.keywords.iter().all(|k| rest.contains(k.as_str()))
    })
}

fn in_page_dir(entry: &LogEntry, needles: &Needles) -> bool {
    needles
        .page_dirs
        .iter()
        .any(|dir| entry.normalized.contains(&format!("/{dir}/")))
}

fn in_tab_dir(entry: &LogEntry, needles: &Needles) -> bool {
    let Some(tab) = needles.tab.as_ref() else {
        return false;
    };
    entry.normalized.contains("/form/tabs/")
        && [&tab.kebab, &tab.singular, &tab.simple]
            .iter()
            .any(|variant| entry.normalized.contains(&format!("/{variant}/")))
}

/// First `*service.ts` file of a directory, in name order.
fn first_service_file(dir: &Path) -> Option<PathBuf> {
    first_file_matching(dir, |name| name.ends_with("service.ts"))
}

fn first_file_matching(dir: &Path, pred: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pred(&name.to_lowercase()))
        })
        .collect();
    files.sort();
    files.into_iter().next()
}
