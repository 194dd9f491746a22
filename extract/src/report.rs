//! Structured extraction reporting.
//!
//! Extraction never fails on a fallback. Every time a heuristic tier other
//! than the preferred one is used, a [`ParseSignal`] is recorded so a
//! reviewer can tell a clean capture from a best-effort one.

use serde::{Deserialize, Serialize};

/// A parse ambiguity observed during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ParseSignal {
    /// No tab strip matched; the synthetic tab spans the whole body.
    NoTabStrip,
    /// The tab strip matched a later selector than the first one.
    TabStripFallback { selector: String },
    /// A tab strip matched but none of its items produced a usable tab.
    EmptyTabStrip { selector: String },
    /// A strip item had no link text and was skipped.
    UnnamedTabSkipped { position: usize },
    /// A tab has no container id, so it yields no fields.
    TabWithoutContainerId { tab: String },
    /// The plain id selector missed; the tab-pane compound selector matched.
    ContainerFallback { tab: String },
    /// Neither container selector found the tab's pane.
    ContainerMissing { tab: String },
    /// No `form[model-name]` element was present.
    ModelNameMissing,
}

impl std::fmt::Display for ParseSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTabStrip => write!(f, "no_tab_strip"),
            Self::TabStripFallback { selector } => write!(f, "tab_strip_fallback ({selector})"),
            Self::EmptyTabStrip { selector } => write!(f, "empty_tab_strip ({selector})"),
            Self::UnnamedTabSkipped { position } => write!(f, "unnamed_tab_skipped (#{position})"),
            Self::TabWithoutContainerId { tab } => write!(f, "tab_without_container_id ({tab})"),
            Self::ContainerFallback { tab } => write!(f, "container_fallback ({tab})"),
            Self::ContainerMissing { tab } => write!(f, "container_missing ({tab})"),
            Self::ModelNameMissing => write!(f, "model_name_missing"),
        }
    }
}

/// Counts of form controls dropped during field extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFields {
    /// Controls without a `name` attribute.
    pub unnamed: usize,
    /// Controls named with the literal `undefined`.
    pub placeholder: usize,
    /// Controls of type `hidden`.
    pub hidden: usize,
    /// Repeated names inside one tab, such as radio groups.
    pub duplicate: usize,
}

impl SkippedFields {
    pub fn total(&self) -> usize {
        self.unnamed + self.placeholder + self.hidden + self.duplicate
    }
}

/// Per-screen extraction report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub module: String,
    pub screen: String,
    /// Selector that matched the tab strip; `None` when the synthetic tab was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_strip_selector: Option<String>,
    pub tab_count: usize,
    pub field_count: usize,
    pub skipped_fields: SkippedFields,
    pub signals: Vec<ParseSignal>,
}

impl ExtractionReport {
    /// Whether extraction used only preferred tiers.
    pub fn is_clean(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn has_signal(&self, predicate: impl Fn(&ParseSignal) -> bool) -> bool {
        self.signals.iter().any(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(signals: Vec<ParseSignal>) -> ExtractionReport {
        ExtractionReport {
            module: "CRM".to_string(),
            screen: "Contas".to_string(),
            tab_strip_selector: None,
            tab_count: 1,
            field_count: 0,
            skipped_fields: SkippedFields::default(),
            signals,
        }
    }

    #[test]
    fn test_signal_serde_is_tagged_snake_case() {
        let json = serde_json::to_string(&ParseSignal::NoTabStrip).unwrap();
        assert_eq!(json, r#"{"signal":"no_tab_strip"}"#);

        let json = serde_json::to_string(&ParseSignal::ContainerMissing { tab: "Dados".into() }).unwrap();
        assert_eq!(json, r#"{"signal":"container_missing","tab":"Dados"}"#);

        let back: ParseSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ParseSignal::ContainerMissing { tab: "Dados".into() });
    }

    #[test]
    fn test_signal_display_matches_serde_tag() {
        assert_eq!(ParseSignal::ModelNameMissing.to_string(), "model_name_missing");
        assert_eq!(
            ParseSignal::UnnamedTabSkipped { position: 2 }.to_string(),
            "unnamed_tab_skipped (#2)"
        );
    }

    #[test]
    fn test_report_omits_missing_selector() {
        let json = serde_json::to_string(&report(vec![ParseSignal::NoTabStrip])).unwrap();
        assert!(!json.contains("tab_strip_selector"));
    }

    #[test]
    fn test_clean_report() {
        assert!(report(Vec::new()).is_clean());
        let noisy = report(vec![ParseSignal::NoTabStrip]);
        assert!(!noisy.is_clean());
        assert!(noisy.has_signal(|s| matches!(s, ParseSignal::NoTabStrip)));
    }

    #[test]
    fn test_skipped_total() {
        let skipped = SkippedFields {
            unnamed: 1,
            placeholder: 2,
            hidden: 3,
            duplicate: 1,
        };
        assert_eq!(skipped.total(), 7);
    }
}
