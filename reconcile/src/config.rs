//! Run configuration for a reconciliation.
//!
//! One file describes the screen being migrated, where the captures and the
//! generated frontend live, and how the run should behave. YAML and JSON are
//! both accepted; the format follows the file extension. Relative paths are
//! resolved against the directory holding the configuration file.
//!
//! # Example YAML
//!
//! ```yaml
//! screen:
//!   modulo: CRM
//!   tela: Contas
//!   menuPai: Movimento
//!   keywordUrl: Contas
//! paths:
//!   frontSrc: ../front/src
//!   formHtmlDir: capture/output/Form
//!   listingHtmlDir: capture/output/Lista
//!   generationLog: ../scaffolding/generated-files.json
//!   metadataOut: output/json
//! reconcile:
//!   lookup: generation-log
//!   dryRun: false
//!   allowGridReplacement: false
//!   materializeSkeletons: false
//!   gridColumnLimit: 5
//! naming:
//!   singularOverrides:
//!     fornecedores: fornecedor
//! ```

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use formsync_core::ScreenContext;
use formsync_extract::ExtractorConfig;
use serde::{Deserialize, Serialize};

use crate::case::compact_lower;
use crate::error::{ReconcileError, Result};
use crate::model::ModelConventions;
use crate::naming::{NameContext, NamingRules};
use crate::ui::UiConventions;

/// How generated files are located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LookupStrategy {
    /// Only files listed in the generation log are considered; the log is
    /// required.
    GenerationLog,
    /// Candidate names are joined to the layout directories and checked on
    /// disk. The generation log, when present, is consulted first.
    #[default]
    DirectoryScan,
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerationLog => write!(f, "generation-log"),
            Self::DirectoryScan => write!(f, "directory-scan"),
        }
    }
}

impl FromStr for LookupStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "generation-log" => Ok(Self::GenerationLog),
            "directory-scan" => Ok(Self::DirectoryScan),
            other => Err(format!("unknown lookup strategy '{other}'")),
        }
    }
}

/// The screen under migration, named as the legacy menu names it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(rename = "modulo", alias = "module")]
    pub module: String,
    #[serde(rename = "tela", alias = "screen")]
    pub screen: String,
    #[serde(rename = "menuPai", alias = "menu")]
    pub menu: String,
    /// URL keyword the screen's pages were generated under, when it differs
    /// from the screen name.
    #[serde(
        rename = "keywordUrl",
        alias = "keyword",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub keyword: Option<String>,
}

impl ScreenConfig {
    pub fn context(&self) -> ScreenContext {
        ScreenContext::new(&self.module, &self.menu, &self.screen)
    }

    pub fn name_context(&self) -> NameContext {
        NameContext::new(&self.screen, &self.module).with_keyword(self.keyword.clone())
    }
}

/// Input and output locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsConfig {
    /// Root of the generated frontend sources (`front/src`).
    pub front_src: PathBuf,
    /// Directory holding the captured form page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_html_dir: Option<PathBuf>,
    /// Directory holding the captured listing page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_html_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_log: Option<PathBuf>,
    /// Root the metadata JSON is written under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_out: Option<PathBuf>,
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        join(&mut self.front_src);
        for path in [
            &mut self.form_html_dir,
            &mut self.listing_html_dir,
            &mut self.generation_log,
            &mut self.metadata_out,
        ]
        .into_iter()
        .flatten()
        {
            join(path);
        }
    }
}

/// Behavior switches for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileOptions {
    pub lookup: LookupStrategy,
    /// Compute every patch without writing.
    pub dry_run: bool,
    /// Allow replacing a grid tab's form return with a data grid.
    pub allow_grid_replacement: bool,
    /// Write skeleton files for artifacts that were never generated.
    pub materialize_skeletons: bool,
    /// Number of fields that become grid columns.
    pub grid_column_limit: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            lookup: LookupStrategy::default(),
            dry_run: false,
            allow_grid_replacement: false,
            materialize_skeletons: false,
            grid_column_limit: 5,
        }
    }
}

/// Code conventions of the generated frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    pub model: ModelConventions,
    pub ui: UiConventions,
}

/// Directories of the generated frontend for one module.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::ProjectLayout;
///
/// let layout = ProjectLayout::new("/front/src", "CRM");
/// assert_eq!(layout.models_dir.to_str(), Some("/front/src/common/core/models/crm"));
/// assert_eq!(layout.pages_dir.to_str(), Some("/front/src/@crm/pages"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub front_src: PathBuf,
    pub models_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub services_dir: PathBuf,
    pub grids_dir: PathBuf,
    /// Further model directories searched after `models_dir`.
    pub extra_model_dirs: Vec<PathBuf>,
}

impl ProjectLayout {
    pub fn new(front_src: impl Into<PathBuf>, module: &str) -> Self {
        let front_src = front_src.into();
        let module = compact_lower(module);
        Self {
            models_dir: front_src.join("common/core/models").join(&module),
            pages_dir: front_src.join(format!("@{module}")).join("pages"),
            services_dir: front_src.join(format!("@{module}")).join("services"),
            grids_dir: front_src.join("common/core/grids").join(&module),
            extra_model_dirs: Vec::new(),
            front_src,
        }
    }

    pub fn with_extra_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_model_dirs.push(dir.into());
        self
    }

    /// Model directories in search order.
    pub fn model_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.models_dir).chain(&self.extra_model_dirs)
    }
}

/// Complete configuration for one screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsyncConfig {
    pub screen: ScreenConfig,
    pub paths: PathsConfig,
    pub reconcile: ReconcileOptions,
    pub naming: NamingRules,
    pub extraction: ExtractorConfig,
    pub conventions: Conventions,
    /// Model directories outside the module (relative to `frontSrc`).
    #[serde(rename = "extraModelDirs", skip_serializing_if = "Vec::is_empty")]
    pub extra_model_dirs: Vec<PathBuf>,
}

impl FormsyncConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::SourceNotFound`] if the file does not exist,
    /// [`ReconcileError::YamlError`]/[`ReconcileError::JsonError`] if it does
    /// not parse and [`ReconcileError::InvalidConfig`] if it fails
    /// [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ReconcileError::SourceNotFound(format!(
                "configuration file '{}' does not exist",
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(path)?);
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: Self = if is_json {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        config.paths.resolve_against(base);
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a run cannot do without.
    pub fn validate(&self) -> Result<()> {
        if self.screen.module.trim().is_empty() {
            return Err(ReconcileError::InvalidConfig("screen.modulo is empty".into()));
        }
        if self.screen.screen.trim().is_empty() {
            return Err(ReconcileError::InvalidConfig("screen.tela is empty".into()));
        }
        if self.screen.menu.trim().is_empty() {
            return Err(ReconcileError::InvalidConfig("screen.menuPai is empty".into()));
        }
        if self.reconcile.grid_column_limit == 0 {
            return Err(ReconcileError::InvalidConfig(
                "reconcile.gridColumnLimit must be at least 1".into(),
            ));
        }
        let unknown = self.naming.unknown_placeholders();
        if !unknown.is_empty() {
            return Err(ReconcileError::InvalidConfig(format!(
                "unknown naming placeholders: {}",
                unknown.join(", ")
            )));
        }
        Ok(())
    }

    pub fn layout(&self) -> ProjectLayout {
        let mut layout = ProjectLayout::new(&self.paths.front_src, &self.screen.module);
        for dir in &self.extra_model_dirs {
            layout = layout.with_extra_model_dir(self.paths.front_src.join(dir));
        }
        layout
    }
}
