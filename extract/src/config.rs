//! Declarative extraction settings.
//!
//! Every heuristic the extractor relies on (which lists count as a tab strip,
//! what marks a grid tab, which mask classes refine a field type) is data in
//! [`ExtractorConfig`], so a new legacy template variant is a config change
//! rather than a code change.
//!
//! # Example YAML
//!
//! ```yaml
//! tabStripSelectors:
//!   - "#{form_id}Tab"
//!   - ul#frmContaTab
//!   - ul.nav-tabs
//!   - ul.tabbable
//! gridMarkers: [AcaoGrid, tbl]
//! requiredAttribute: data-obrigatorio
//! maskHints:
//!   - { class: mascara-data, fieldType: date }
//! ```

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the model form's `id` inside a tab-strip selector.
pub const FORM_ID_PLACEHOLDER: &str = "{form_id}";

/// A legacy CSS class that refines a plain text input into a component hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskHint {
    pub class: String,
    pub field_type: String,
}

impl MaskHint {
    pub fn new(class: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            field_type: field_type.into(),
        }
    }
}

/// Settings for [`FormExtractor`](crate::FormExtractor).
///
/// # Examples
///
/// ```
/// use formsync_extract::ExtractorConfig;
///
/// let config = ExtractorConfig::default();
/// assert_eq!(config.tab_strip_selectors[1], "ul#frmContaTab");
/// assert!(config.is_grid_handler("carregarAcaoGrid('tblContatos')"));
/// assert!(!config.is_grid_handler("mostrarAba(2)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// Ordered tab-strip selectors; the first that matches wins.
    pub tab_strip_selectors: Vec<String>,
    /// Substrings of a tab activation handler that mark a grid tab.
    pub grid_markers: Vec<String>,
    /// Boolean data attribute that marks a field as required.
    pub required_attribute: String,
    /// Attributes whose value describes a visibility dependency.
    pub dependency_attributes: Vec<String>,
    /// Mask classes refining `text` inputs, checked in order.
    pub mask_hints: Vec<MaskHint>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tab_strip_selectors: vec![
                format!("#{FORM_ID_PLACEHOLDER}Tab"),
                "ul#frmContaTab".to_string(),
                "ul.nav-tabs".to_string(),
                "ul.tabbable".to_string(),
            ],
            grid_markers: vec!["AcaoGrid".to_string(), "tbl".to_string()],
            required_attribute: "data-obrigatorio".to_string(),
            dependency_attributes: vec!["data-dependency".to_string(), "data-show-if".to_string()],
            mask_hints: vec![
                MaskHint::new("mascara-data", "date"),
                MaskHint::new("mascara-inteiro", "number"),
                MaskHint::new("mascara-decimal", "number"),
                MaskHint::new("make-switch", "checkbox"),
            ],
        }
    }
}

impl ExtractorConfig {
    /// Whether a tab activation handler marks the tab as a grid tab.
    pub fn is_grid_handler(&self, handler: &str) -> bool {
        self.grid_markers
            .iter()
            .any(|marker| !marker.is_empty() && handler.contains(marker.as_str()))
    }

    /// Tab-strip selectors with the form id substituted.
    ///
    /// Selectors that need a form id are dropped when the form has none.
    pub fn resolved_tab_strip_selectors(&self, form_id: Option<&str>) -> Vec<String> {
        self.tab_strip_selectors
            .iter()
            .filter_map(|selector| {
                if !selector.contains(FORM_ID_PLACEHOLDER) {
                    return Some(selector.clone());
                }
                form_id
                    .filter(|id| !id.is_empty())
                    .map(|id| selector.replace(FORM_ID_PLACEHOLDER, id))
            })
            .collect()
    }

    /// Component hint for a set of classes, if any mask hint applies.
    pub fn mask_hint<'a>(&self, classes: impl IntoIterator<Item = &'a str>) -> Option<&str> {
        let classes: Vec<&str> = classes.into_iter().collect();
        self.mask_hints
            .iter()
            .find(|hint| classes.contains(&hint.class.as_str()))
            .map(|hint| hint.field_type.as_str())
    }
}
