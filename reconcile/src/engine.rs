//! Run orchestration.
//!
//! A run extracts (or loads) the screen metadata, then for every tab finds
//! and patches the tab's model and component, repairs model references in
//! the component and the screen's service, and finally patches the listing
//! grid with the legacy listing's columns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use formsync_core::{ArtifactKind, GridColumnMetadata, ScreenMetadata, TabMetadata, validate_metadata};
use formsync_extract::{
    ExtractionRun, FormExtractor, extract_columns, find_capture, read_metadata, read_optional_capture,
    write_metadata,
};
use tracing::{debug, info, warn};

use crate::case::{compact_lower, pascal_case};
use crate::config::{FormsyncConfig, LookupStrategy};
use crate::error::{ReconcileError, Result};
use crate::generation_log::GenerationLog;
use crate::listing::reconcile_listing_file;
use crate::model::{model_class_name, reconcile_model_file, reconcile_model_source};
use crate::naming::{NameContext, TabRef};
use crate::references::repair_references_file;
use crate::report::{ArtifactStatus, ListingReport, ReconciliationReport, ReferenceReport, TabReport};
use crate::resolver::{ArtifactResolver, Resolution};
use crate::skeleton::{materialize, model_skeleton, skeleton_class_name, ui_skeleton};
use crate::ui::{UiOptions, reconcile_ui_file, reconcile_ui_source};

/// Loads a metadata JSON file and checks its invariants.
///
/// # Errors
///
/// Returns [`ReconcileError::SourceNotFound`] when the file is missing and
/// [`ReconcileError::InvalidMetadata`] when it violates an invariant.
pub fn load_metadata(path: &Path) -> Result<ScreenMetadata> {
    let metadata = read_metadata(path)?;
    let violations = validate_metadata(&metadata);
    if !violations.is_empty() {
        let reasons: Vec<String> = violations.iter().map(ToString::to_string).collect();
        return Err(ReconcileError::InvalidMetadata(reasons.join("; ")));
    }
    Ok(metadata)
}

/// Drives extraction and reconciliation for one configured screen.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: FormsyncConfig,
}

impl Reconciler {
    pub fn new(config: FormsyncConfig) -> Self {
        Self { config }
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        FormsyncConfig::load(path).map(Self::new)
    }

    pub fn config(&self) -> &FormsyncConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FormsyncConfig {
        &mut self.config
    }

    /// Extracts metadata from the captured form page.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::SourceNotFound`] when no form capture directory is
    /// configured or it holds no page.
    pub fn extract(&self) -> Result<ExtractionRun> {
        let dir = self.config.paths.form_html_dir.as_deref().ok_or_else(|| {
            ReconcileError::SourceNotFound("paths.formHtmlDir is not configured".to_string())
        })?;
        let page = find_capture(dir, None)?;
        let html = std::fs::read_to_string(&page)?;
        let run = FormExtractor::new(self.config.extraction.clone()).extract(&self.config.screen.context(), &html)?;
        info!(
            page = %page.display(),
            tabs = run.metadata.tabs.len(),
            fields = run.metadata.field_count(),
            signals = run.report.signals.len(),
            "Extracted screen metadata"
        );
        Ok(run)
    }

    /// Columns of the captured listing page; empty when none was captured.
    pub fn listing_columns(&self) -> Result<Vec<GridColumnMetadata>> {
        let html = read_optional_capture(self.config.paths.listing_html_dir.as_deref())?;
        Ok(extract_columns(html.as_deref()))
    }

    /// Extracts, persists the metadata and reconciles.
    pub fn run(&self) -> Result<ReconciliationReport> {
        let run = self.extract()?;
        let columns = self.listing_columns()?;

        let metadata_path = match &self.config.paths.metadata_out {
            Some(root) if !self.config.reconcile.dry_run => Some(write_metadata(root, &run.metadata)?),
            _ => None,
        };

        let mut report = self.reconcile(&run.metadata, &columns)?;
        report.metadata_path = metadata_path.map(|p| p.to_string_lossy().into_owned());
        report.extraction = Some(run.report);
        Ok(report)
    }

    /// Reconciles generated sources against already extracted metadata.
    pub fn reconcile(&self, metadata: &ScreenMetadata, columns: &[GridColumnMetadata]) -> Result<ReconciliationReport> {
        let options = &self.config.reconcile;
        let log = self.load_log()?;
        let layout = self.config.layout();
        let resolver = ArtifactResolver::new(&layout, &self.config.naming, options.lookup).with_log(log.as_ref());

        let mut ctx = self.config.screen.name_context();
        if let Some(first) = metadata.tabs.first() {
            ctx = ctx.with_first_tab(first.name.clone());
        }

        info!(
            module = %metadata.module,
            screen = %metadata.screen,
            tabs = metadata.tabs.len(),
            lookup = %options.lookup,
            dry_run = options.dry_run,
            "Reconciling screen"
        );

        if metadata.has_grid_tabs() && !options.allow_grid_replacement {
            warn!(
                screen = %metadata.screen,
                "Grid tabs keep their generated forms; grid replacement is not enabled"
            );
        }

        let mut report = ReconciliationReport::new(&metadata.module, &metadata.screen, options.dry_run);
        let mut repaired: HashSet<PathBuf> = HashSet::new();
        let mut primary_class = None;

        for (index, tab) in metadata.tabs.iter().enumerate() {
            let tab_ref = TabRef::new(&tab.name, index);
            let (tab_report, class) = self.reconcile_tab(&resolver, &ctx, tab, tab_ref, &mut report.warnings)?;

            if let (Some(class), Some(ui)) = (&class, tab_report.ui.path()) {
                let path = PathBuf::from(ui);
                if path.is_file() && repaired.insert(path.clone()) {
                    let patch = repair_references_file(&path, class, options.dry_run)?;
                    report.references.push(ReferenceReport {
                        path: ui.to_string(),
                        class: class.clone(),
                        patch,
                    });
                }
            }
            if index == 0 {
                primary_class = class;
            }
            report.tabs.push(tab_report);
        }

        if let Some(class) = &primary_class {
            if let Some(path) = resolver.resolve(ArtifactKind::Service, &ctx, None).path() {
                if repaired.insert(path.clone()) {
                    let patch = repair_references_file(&path, class, options.dry_run)?;
                    report.references.push(ReferenceReport {
                        path: path.to_string_lossy().into_owned(),
                        class: class.clone(),
                        patch,
                    });
                }
            } else {
                debug!("No service found for reference repair");
            }
        }

        if !columns.is_empty() {
            report.listing = Some(self.reconcile_listing(&resolver, &ctx, columns, log.as_ref(), &mut report.warnings)?);
        }

        info!(
            changed = report.changed_files(),
            warnings = report.warnings.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    fn load_log(&self) -> Result<Option<GenerationLog>> {
        let strategy = self.config.reconcile.lookup;
        match &self.config.paths.generation_log {
            Some(path) if strategy == LookupStrategy::GenerationLog || path.is_file() => {
                GenerationLog::load(path).map(Some)
            }
            Some(path) => {
                warn!(path = %path.display(), "Generation log not found; scanning directories");
                Ok(None)
            }
            None if strategy == LookupStrategy::GenerationLog => Err(ReconcileError::SourceNotFound(
                "lookup is generation-log but paths.generationLog is not configured".to_string(),
            )),
            None => Ok(None),
        }
    }

    fn reconcile_tab(
        &self,
        resolver: &ArtifactResolver<'_>,
        ctx: &NameContext,
        tab: &TabMetadata,
        tab_ref: TabRef<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<(TabReport, Option<String>)> {
        let options = &self.config.reconcile;
        let conventions = &self.config.conventions;

        let model_resolution = resolver.resolve(ArtifactKind::Model, ctx, Some(tab_ref));
        let mut model = ArtifactStatus::from_resolution(&model_resolution);
        let mut model_patch = None;
        let mut class = None;
        match model_resolution {
            Resolution::Found { artifact, .. } => {
                let patch = reconcile_model_file(tab, Path::new(&artifact.path), &conventions.model, options.dry_run)?;
                class = model_class_name(&patch.content);
                model_patch = Some(patch);
            }
            Resolution::NotFound { .. } => {
                match resolver
                    .preferred_path(ArtifactKind::Model, ctx, Some(tab_ref))
                    .filter(|path| options.materialize_skeletons && !path.exists())
                {
                    Some(path) => {
                        let name = skeleton_class_name(&path).unwrap_or_else(|| pascal_case(&tab.name));
                        let skeleton = model_skeleton(&name, &conventions.model);
                        let patch = reconcile_model_source(tab, &skeleton, &conventions.model);
                        materialize(&path, &patch.content, options.dry_run)?;
                        class = Some(name);
                        model = ArtifactStatus::Materialized {
                            path: path.to_string_lossy().into_owned(),
                        };
                        model_patch = Some(patch);
                    }
                    None => {
                        warn!(tab = %tab.name, "Model not found");
                        warnings.push(format!("{}: model not found", tab.name));
                    }
                }
            }
        }

        let ui_options = UiOptions {
            allow_grid_replacement: options.allow_grid_replacement,
            grid_column_limit: options.grid_column_limit,
        };
        let ui_resolution = resolver.resolve(ArtifactKind::UiComponent, ctx, Some(tab_ref));
        let mut ui = ArtifactStatus::from_resolution(&ui_resolution);
        let mut ui_patch = None;
        match ui_resolution {
            Resolution::Found { artifact, .. } => {
                ui_patch = Some(reconcile_ui_file(
                    tab,
                    Path::new(&artifact.path),
                    &conventions.ui,
                    ui_options,
                    options.dry_run,
                )?);
            }
            Resolution::NotFound { .. } => {
                match resolver
                    .preferred_path(ArtifactKind::UiComponent, ctx, Some(tab_ref))
                    .filter(|path| options.materialize_skeletons && !path.exists())
                {
                    Some(path) => {
                        let skeleton = ui_skeleton(&compact_lower(&ctx.module));
                        let patch = reconcile_ui_source(tab, &skeleton, &conventions.ui, ui_options);
                        materialize(&path, &patch.content, options.dry_run)?;
                        ui = ArtifactStatus::Materialized {
                            path: path.to_string_lossy().into_owned(),
                        };
                        ui_patch = Some(patch);
                    }
                    None => {
                        warn!(tab = %tab.name, "Component not found");
                        warnings.push(format!("{}: component not found", tab.name));
                    }
                }
            }
        }

        if let Some(patch) = &model_patch {
            warnings.extend(patch.conflicts.iter().map(|c| format!("{} model: {c}", tab.name)));
        }
        if let Some(patch) = &ui_patch {
            warnings.extend(patch.conflicts.iter().map(|c| format!("{} component: {c}", tab.name)));
            if let Some(reason) = &patch.grid_skipped {
                warnings.push(format!("{} component: grid skipped, {reason}", tab.name));
            }
        }

        let report = TabReport {
            tab: tab.name.clone(),
            fields: tab.fields.len(),
            model,
            model_patch,
            ui,
            ui_patch,
        };
        Ok((report, class))
    }

    fn reconcile_listing(
        &self,
        resolver: &ArtifactResolver<'_>,
        ctx: &NameContext,
        columns: &[GridColumnMetadata],
        log: Option<&GenerationLog>,
        warnings: &mut Vec<String>,
    ) -> Result<ListingReport> {
        let resolution = resolver.resolve(ArtifactKind::ListingGrid, ctx, None);
        let grid = ArtifactStatus::from_resolution(&resolution);
        let patch = match resolution.path() {
            Some(path) => {
                let patch = reconcile_listing_file(columns, &path, resolver.layout(), log, self.config.reconcile.dry_run)?;
                warnings.extend(patch.conflicts.iter().map(|c| format!("listing grid: {c}")));
                if patch.model_path.is_none() {
                    warnings.push("listing grid: model not found, columns use legacy names".to_string());
                }
                Some(patch)
            }
            None => {
                warn!("Listing grid not found");
                warnings.push("listing grid not found".to_string());
                None
            }
        };
        Ok(ListingReport {
            columns: columns.len(),
            grid,
            patch,
        })
    }
}
