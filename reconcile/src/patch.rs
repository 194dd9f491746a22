//! Shared pieces of the source patchers.

use std::fmt;

use formsync_core::{FieldMetadata, is_standard_field};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::case::camel_case;

/// A patch step that could not be applied.
///
/// Conflicts never abort a run; the remaining steps of the same patch still
/// apply where their own anchors exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "conflict", rename_all = "snake_case")]
pub enum PatchConflict {
    /// No insertion point was found.
    MissingAnchor { anchor: String, skipped: String },
    /// A delimited block was opened but never closed.
    UnbalancedBlock { block: String },
}

impl PatchConflict {
    pub fn missing_anchor(anchor: impl Into<String>, skipped: impl Into<String>) -> Self {
        Self::MissingAnchor {
            anchor: anchor.into(),
            skipped: skipped.into(),
        }
    }
}

impl fmt::Display for PatchConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAnchor { anchor, skipped } => {
                write!(f, "no {anchor} found; skipped {skipped}")
            }
            Self::UnbalancedBlock { block } => write!(f, "{block} is not closed"),
        }
    }
}

/// How a form field surfaces in the generated frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProperty {
    /// camelCase form of the legacy key (`clienteId`).
    pub key: String,
    /// Declared property name (`cliente` for relations).
    pub name: String,
    /// Key ends in `Id`: the property is a relation selector.
    pub relation: bool,
}

impl FieldProperty {
    /// Derives the property for a field; `None` for inherited audit fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use formsync_core::FieldMetadata;
    /// use formsync_reconcile::FieldProperty;
    ///
    /// let prop = FieldProperty::of(&FieldMetadata::new("ClienteId", "select")).unwrap();
    /// assert_eq!(prop.key, "clienteId");
    /// assert_eq!(prop.name, "cliente");
    /// assert!(prop.relation);
    ///
    /// assert!(FieldProperty::of(&FieldMetadata::new("Codigo", "text")).is_none());
    /// ```
    pub fn of(field: &FieldMetadata) -> Option<Self> {
        let mut key = camel_case(&field.key);
        if key.eq_ignore_ascii_case("codigo") || key.eq_ignore_ascii_case("id") {
            key = "id".to_string();
        }
        if key.is_empty() || is_standard_field(&key) {
            return None;
        }
        let relation = key.len() > 2 && key.ends_with("Id");
        let name = if relation {
            key[..key.len() - 2].to_string()
        } else {
            key.clone()
        };
        if is_standard_field(&name.to_ascii_lowercase()) {
            return None;
        }
        Some(Self { key, name, relation })
    }
}

/// Source text split into lines, remembering the line terminator.
#[derive(Debug, Clone)]
pub(crate) struct Lines {
    pub lines: Vec<String>,
    eol: &'static str,
}

impl Lines {
    pub fn parse(source: &str) -> Self {
        let eol = if source.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = source
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self { lines, eol }
    }

    pub fn join(&self) -> String {
        self.lines.join(self.eol)
    }

    pub fn insert_all(&mut self, at: usize, new_lines: Vec<String>) {
        self.lines.splice(at..at, new_lines);
    }

    pub fn replace_with(&mut self, at: usize, new_lines: Vec<String>) {
        self.lines.splice(at..=at, new_lines);
    }
}

/// Leading whitespace of a line.
pub(crate) fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Whether `source` imports `name` in a named import list.
pub(crate) fn has_import(source: &str, name: &str) -> bool {
    let pattern = format!(
        r"import\s+(?:type\s+)?\{{[^}}]*\b{}\b[^}}]*\}}",
        regex::escape(name)
    );
    Regex::new(&pattern).is_ok_and(|re| re.is_match(source))
}

/// Smallest indentation step used in a source, defaulting to two spaces.
pub(crate) fn indent_unit(source: &str) -> String {
    source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indentation(line))
        .filter(|indent| !indent.is_empty())
        .min_by_key(|indent| indent.len())
        .map_or_else(|| "  ".to_string(), str::to_string)
}
