//! The scaffolding generator's log of files it wrote.
//!
//! The log is a JSON array of paths, usually absolute Windows paths:
//!
//! ```json
//! ["C:\\src\\front\\src\\common\\core\\models\\crm\\conta.ts", "..."]
//! ```
//!
//! Entries written by newer generator versions are objects with a `path`
//! member; both shapes are accepted. Paths are matched on a normalized form
//! (forward slashes, lowercase) but the original casing is what gets opened.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ReconcileError, Result};

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Path as logged, with separators normalized to `/`.
    pub path: String,
    /// Lowercase form of `path` used for matching.
    pub normalized: String,
}

impl LogEntry {
    pub fn new(path: &str) -> Self {
        let mut path = path.trim().replace('\\', "/");
        while path.contains("//") {
            path = path.replace("//", "/");
        }
        let normalized = path.to_lowercase();
        Self { path, normalized }
    }

    /// Lowercase file name of the entry.
    pub fn file_name(&self) -> &str {
        self.normalized
            .rsplit('/')
            .next()
            .unwrap_or(&self.normalized)
    }

    /// `true` when the entry ends with `/{suffix}` (or is exactly `suffix`),
    /// compared case-insensitively.
    pub fn ends_with_path(&self, suffix: &str) -> bool {
        let suffix = suffix.replace('\\', "/").to_lowercase();
        let suffix = suffix.trim_start_matches('/');
        self.normalized == suffix || self.normalized.ends_with(&format!("/{suffix}"))
    }

    /// Filesystem location of the entry; relative entries resolve against
    /// `base`.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() || is_drive_path(&self.path) {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

fn is_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Path(String),
    Object { path: String },
}

/// Parsed generation log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationLog {
    entries: Vec<LogEntry>,
}

impl GenerationLog {
    /// Loads the log from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::SourceNotFound`] if the file does not exist
    /// and [`ReconcileError::JsonError`] if it is not a JSON array of paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ReconcileError::SourceNotFound(format!(
                "generation log '{}' does not exist",
                path.display()
            )));
        }
        let log = Self::from_json(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), entries = log.len(), "Loaded generation log");
        Ok(log)
    }

    /// Parses the log from JSON text.
    ///
    /// # Examples
    ///
    /// ```
    /// use formsync_reconcile::GenerationLog;
    ///
    /// let log = GenerationLog::from_json(r#"["C:\\front\\models\\crm\\conta.ts", {"path": "x/y.tsx"}]"#).unwrap();
    /// assert_eq!(log.len(), 2);
    /// assert_eq!(log.entries()[0].path, "C:/front/models/crm/conta.ts");
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Vec<RawEntry> = serde_json::from_str(text)?;
        Ok(Self::from_paths(raw.into_iter().map(|entry| match entry {
            RawEntry::Path(path) | RawEntry::Object { path } => path,
        })))
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = paths
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| LogEntry::new(p.as_ref()))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose normalized path contains every one of `needles`.
    pub fn containing<'a>(&'a self, needles: &'a [&'a str]) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| needles.iter().all(|n| entry.normalized.contains(n)))
    }
}
