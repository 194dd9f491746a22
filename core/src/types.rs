//! Metadata type definitions for captured legacy screens.
//!
//! A legacy ERP screen is a single server-rendered form split into tabs.
//! Extraction turns the captured HTML into a [`ScreenMetadata`] tree; the
//! reconciler reads that tree and patches generated frontend sources. The
//! types serialize with [`serde`] using camelCase keys so the JSON artifact
//! keeps the shape downstream scaffolding tools already consume.

use serde::{Deserialize, Serialize};

/// Version of the metadata contract (semver).
///
/// Embedded in every [`ScreenMetadata`] written to disk.
pub const METADATA_CONTRACT_VERSION: &str = "1.0.0";

/// Name given to the synthetic tab that stands for the whole form when the
/// captured page has no tab strip.
pub const PRIMARY_TAB_NAME: &str = "Principal";

/// Audit fields every generated model inherits from its base class.
///
/// These keys are never declared, mapped or bound by the reconciler.
pub const STANDARD_FIELDS: &[&str] = &[
    "id",
    "ativo",
    "usuarioCadastrouId",
    "excluidoPeloUsuarioId",
    "atualizadoPeloUsuarioId",
    "estaExcluido",
    "dataCadastro",
    "dataAtualizacao",
];

/// Returns `true` when `key` names an inherited audit field.
///
/// # Examples
///
/// ```
/// use formsync_core::is_standard_field;
///
/// assert!(is_standard_field("dataCadastro"));
/// assert!(!is_standard_field("email"));
/// ```
pub fn is_standard_field(key: &str) -> bool {
    STANDARD_FIELDS.contains(&key)
}

/// Identity of a screen inside the legacy menu tree.
///
/// Supplied by configuration, never inferred from the HTML.
///
/// # Examples
///
/// ```
/// use formsync_core::ScreenContext;
///
/// let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
/// assert_eq!(ctx.module, "CRM");
/// assert_eq!(ctx.screen, "Contas");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenContext {
    /// Business module (e.g. `CRM`).
    pub module: String,
    /// Parent menu the screen lives under.
    pub menu: String,
    /// Screen name as shown in the legacy menu.
    pub screen: String,
}

impl ScreenContext {
    /// Creates a new screen context.
    pub fn new(
        module: impl Into<String>,
        menu: impl Into<String>,
        screen: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            menu: menu.into(),
            screen: screen.into(),
        }
    }

    /// Names of the identity parts that are empty or whitespace-only.
    ///
    /// ```
    /// use formsync_core::ScreenContext;
    ///
    /// assert_eq!(ScreenContext::new("CRM", " ", "Contas").empty_parts(), vec!["menu"]);
    /// assert!(ScreenContext::new("CRM", "Movimento", "Contas").empty_parts().is_empty());
    /// ```
    pub fn empty_parts(&self) -> Vec<&'static str> {
        [
            ("module", &self.module),
            ("menu", &self.menu),
            ("screen", &self.screen),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }
}

/// Extracted metadata for one captured screen.
///
/// Immutable once extraction finishes. `tabs` is never empty: a page with no
/// tab strip yields a single synthetic [`PRIMARY_TAB_NAME`] tab.
///
/// # Examples
///
/// ```
/// use formsync_core::*;
///
/// let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
/// let mut screen = ScreenMetadata::new(&ctx, "ContaModelo");
/// screen.tabs.push(
///     TabMetadata::new("Dados")
///         .with_id("tabDados")
///         .with_field(FieldMetadata::new("Email", "text")),
/// );
///
/// assert_eq!(screen.primary_tab().unwrap().name, "Dados");
/// assert_eq!(screen.field_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    pub module: String,
    pub menu: String,
    pub screen: String,
    /// Last dotted segment of the form's model attribute; empty when absent.
    #[serde(default)]
    pub model_name: String,
    pub tabs: Vec<TabMetadata>,
}

impl ScreenMetadata {
    /// Creates an empty metadata tree for a screen.
    pub fn new(context: &ScreenContext, model_name: impl Into<String>) -> Self {
        Self {
            schema_version: Some(METADATA_CONTRACT_VERSION.to_string()),
            module: context.module.clone(),
            menu: context.menu.clone(),
            screen: context.screen.clone(),
            model_name: model_name.into(),
            tabs: Vec::new(),
        }
    }

    /// Returns the configured screen identity.
    pub fn context(&self) -> ScreenContext {
        ScreenContext::new(&self.module, &self.menu, &self.screen)
    }

    /// The first tab, which naming rules treat as the primary one.
    pub fn primary_tab(&self) -> Option<&TabMetadata> {
        self.tabs.first()
    }

    /// Finds a tab by exact name.
    pub fn find_tab(&self, name: &str) -> Option<&TabMetadata> {
        self.tabs.iter().find(|tab| tab.name == name)
    }

    /// Total fields across all tabs.
    pub fn field_count(&self) -> usize {
        self.tabs.iter().map(|tab| tab.fields.len()).sum()
    }

    /// Whether any tab is activated through a grid handler.
    pub fn has_grid_tabs(&self) -> bool {
        self.tabs.iter().any(|tab| tab.has_grid)
    }
}

/// One tab of a screen with its fields in document order.
///
/// # Examples
///
/// ```
/// use formsync_core::TabMetadata;
///
/// let tab = TabMetadata::synthetic();
/// assert!(tab.is_synthetic());
/// assert_eq!(tab.id.as_deref(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabMetadata {
    pub name: String,
    /// Container element id; absent for the synthetic tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub has_grid: bool,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
    /// Free-text notes about conditional visibility.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TabMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            has_grid: false,
            fields: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// The tab standing for the whole form when no tab strip exists.
    pub fn synthetic() -> Self {
        Self::new(PRIMARY_TAB_NAME)
    }

    /// A tab is synthetic when it carries the primary name and no container id.
    pub fn is_synthetic(&self) -> bool {
        self.id.is_none() && self.name == PRIMARY_TAB_NAME
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_grid(mut self) -> Self {
        self.has_grid = true;
        self
    }

    pub fn with_field(mut self, field: FieldMetadata) -> Self {
        self.fields.push(field);
        self
    }

    /// Finds a field by its raw key.
    pub fn find_field(&self, key: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.key == key)
    }
}

/// One named input of the legacy form.
///
/// `field_type` holds the raw input type (`text`, `checkbox`, …), the tag
/// name for `select`/`textarea`, or a component hint refined from legacy mask
/// classes (`date`, `number`).
///
/// # Examples
///
/// ```
/// use formsync_core::FieldMetadata;
///
/// let field = FieldMetadata::new("Email", "text")
///     .with_label("E-mail")
///     .required()
///     .with_max_length(120);
/// assert!(field.required);
/// assert_eq!(field.max_length, Some(120));
/// assert_eq!(field.label, "E-mail");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl FieldMetadata {
    /// Creates a field whose label defaults to its key.
    pub fn new(key: impl Into<String>, field_type: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            field_type: field_type.into(),
            required: false,
            max_length: None,
            is_hidden: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

/// One column of the legacy listing grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColumnMetadata {
    /// Legacy dotted field path (e.g. `Cliente.Nome`).
    pub field: String,
    /// Header title; falls back to `field` when the script has none.
    pub title: String,
}

impl GridColumnMetadata {
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
        }
    }
}

/// Kind of generated frontend artifact the reconciler patches.
///
/// # Examples
///
/// ```
/// use formsync_core::ArtifactKind;
///
/// assert_eq!(ArtifactKind::UiComponent.to_string(), "ui-component");
/// let json = serde_json::to_string(&ArtifactKind::ListingGrid).unwrap();
/// assert_eq!(json, "\"listing-grid\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// TypeScript model class with a field mapping table.
    Model,
    /// TSX form component for one tab.
    UiComponent,
    /// Service module wiring the model to its controller.
    Service,
    /// Listing grid component for the screen.
    ListingGrid,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::UiComponent => write!(f, "ui-component"),
            Self::Service => write!(f, "service"),
            Self::ListingGrid => write!(f, "listing-grid"),
        }
    }
}

/// A located generated file, with the candidate names that were tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub path: String,
    pub candidates: Vec<String>,
}

impl GeneratedArtifact {
    pub fn new(kind: ArtifactKind, path: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            candidates,
        }
    }
}
