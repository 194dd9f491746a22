//! Reconciliation report.
//!
//! Every file a run looked for, found, created or patched is listed here,
//! together with the conflicts that made a patcher skip work. The report is
//! what a reviewer reads to decide what still needs a hand edit.

use chrono::{DateTime, Utc};
use formsync_extract::ExtractionReport;
use serde::Serialize;

use crate::listing::ListingPatch;
use crate::model::ModelPatch;
use crate::references::ReferencePatch;
use crate::resolver::{MatchTier, Resolution};
use crate::ui::UiPatch;

/// How a run obtained an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Found { path: String, tier: MatchTier },
    /// Written from a skeleton because lookup found nothing.
    Materialized { path: String },
    NotFound { candidates: Vec<String> },
}

impl ArtifactStatus {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Found { artifact, tier } => Self::Found {
                path: artifact.path.clone(),
                tier: *tier,
            },
            Resolution::NotFound { tried } => Self::NotFound {
                candidates: tried.clone(),
            },
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Found { path, .. } | Self::Materialized { path } => Some(path),
            Self::NotFound { .. } => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Found { tier, .. } => format!("found ({tier})"),
            Self::Materialized { .. } => "materialized".to_string(),
            Self::NotFound { candidates } => format!("not found ({} candidates)", candidates.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabReport {
    pub tab: String,
    pub fields: usize,
    pub model: ArtifactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_patch: Option<ModelPatch>,
    pub ui: ArtifactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_patch: Option<UiPatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingReport {
    pub columns: usize,
    pub grid: ArtifactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<ListingPatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceReport {
    pub path: String,
    pub class: String,
    pub patch: ReferencePatch,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub module: String,
    pub screen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionReport>,
    pub tabs: Vec<TabReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<ListingReport>,
    pub references: Vec<ReferenceReport>,
    pub warnings: Vec<String>,
}

impl ReconciliationReport {
    pub fn new(module: impl Into<String>, screen: impl Into<String>, dry_run: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            dry_run,
            module: module.into(),
            screen: screen.into(),
            metadata_path: None,
            extraction: None,
            tabs: Vec::new(),
            listing: None,
            references: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Number of files the run changed (or would change, in a dry run).
    pub fn changed_files(&self) -> usize {
        let tabs: usize = self
            .tabs
            .iter()
            .map(|tab| {
                let model = tab.model_patch.as_ref().is_some_and(ModelPatch::is_changed)
                    || matches!(tab.model, ArtifactStatus::Materialized { .. });
                let ui = tab.ui_patch.as_ref().is_some_and(UiPatch::is_changed)
                    || matches!(tab.ui, ArtifactStatus::Materialized { .. });
                usize::from(model) + usize::from(ui)
            })
            .sum();
        let listing = self
            .listing
            .as_ref()
            .and_then(|l| l.patch.as_ref())
            .is_some_and(ListingPatch::is_changed);
        let references = self.references.iter().filter(|r| r.patch.is_changed()).count();
        tabs + usize::from(listing) + references
    }

    /// Whether any artifact was missing or any patch hit a conflict.
    pub fn needs_attention(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Human-readable summary, one line per item.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} / {}{}",
            self.module,
            self.screen,
            if self.dry_run { " (dry run)" } else { "" }
        )];

        for tab in &self.tabs {
            let mut line = format!("  {} [{} fields]: model {}", tab.tab, tab.fields, tab.model.describe());
            if let Some(patch) = &tab.model_patch {
                line.push_str(&format!(
                    " +{} props +{} mappings",
                    patch.properties_added.len(),
                    patch.mappings_added.len()
                ));
            }
            line.push_str(&format!("; ui {}", tab.ui.describe()));
            if let Some(patch) = &tab.ui_patch {
                line.push_str(&format!(" +{} fields", patch.fields_injected.len()));
                if patch.grid_injected {
                    line.push_str(" +grid");
                }
            }
            lines.push(line);
        }

        if let Some(listing) = &self.listing {
            let added = listing.patch.as_ref().map_or(0, |p| p.columns_added.len());
            lines.push(format!(
                "  listing [{} columns]: grid {} +{added} columns",
                listing.columns,
                listing.grid.describe()
            ));
        }

        let repaired = self.references.iter().filter(|r| r.patch.is_changed()).count();
        if repaired > 0 {
            lines.push(format!("  references repaired in {repaired} files"));
        }

        lines.push(format!(
            "{} files {}changed, {} warnings",
            self.changed_files(),
            if self.dry_run { "would be " } else { "" },
            self.warnings.len()
        ));
        for warning in &self.warnings {
            lines.push(format!("  warning: {warning}"));
        }
        lines
    }
}
