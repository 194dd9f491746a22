//! Declarative naming rules for generated artifacts.
//!
//! The scaffolding generator names files from the screen and tab display
//! names, but its conventions drifted over time (kebab files, legacy
//! `…Modelo.ts` files, reversed compound names). Every convention is one
//! template in [`NamingRules`]; candidate generation is a pure function of
//! the rules and the names.
//!
//! Templates use `{placeholder}` slots:
//!
//! | Placeholder | `Contas` / `Dados Gerais` |
//! |-------------|---------------------------|
//! | `screen_kebab` | `contas` |
//! | `screen_kebab_singular` | `conta` |
//! | `screen_pascal` / `screen_pascal_singular` | `Contas` / `Conta` |
//! | `screen_camel_singular` | `conta` |
//! | `screen_compact` / `screen_compact_singular` | `contas` / `conta` |
//! | `module_lower` | `crm` |
//! | `first_tab_kebab` | kebab of the first tab name |
//! | `keyword_kebab` / `keyword_kebab_singular` / `keyword_compact` / `keyword_compact_singular` | from the configured URL keyword |
//! | `tab_kebab` / `tab_kebab_singular` | `dados-gerais` / `dados-gerai` |
//! | `tab_simple` | kebab with connector words removed |
//! | `tab_kebab_reversed` | singular words reversed |
//! | `tab_compact` | kebab without hyphens |
//! | `tab_pascal` | `DadosGerais` |
//!
//! A template whose placeholder has no value (no tab, no keyword) is
//! skipped.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use formsync_core::ArtifactKind;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::case::{camel_case, compact_lower, kebab_case, pascal_case, singularize};

// SAFETY: This regex is a compile-time constant and is validated by tests.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static regex must compile"));

const KNOWN_PLACEHOLDERS: &[&str] = &[
    "screen_kebab",
    "screen_kebab_singular",
    "screen_pascal",
    "screen_pascal_singular",
    "screen_camel_singular",
    "screen_compact",
    "screen_compact_singular",
    "module_lower",
    "first_tab_kebab",
    "keyword_kebab",
    "keyword_kebab_singular",
    "keyword_compact",
    "keyword_compact_singular",
    "tab_kebab",
    "tab_kebab_singular",
    "tab_simple",
    "tab_kebab_reversed",
    "tab_compact",
    "tab_pascal",
];

/// Screen-level names every candidate is derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameContext {
    pub screen: String,
    pub module: String,
    /// URL keyword some screens were generated under.
    pub keyword: Option<String>,
    /// Display name of the first tab; drives the page directory.
    pub first_tab: Option<String>,
}

impl NameContext {
    pub fn new(screen: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            screen: screen.into(),
            module: module.into(),
            keyword: None,
            first_tab: None,
        }
    }

    pub fn with_keyword(mut self, keyword: Option<String>) -> Self {
        self.keyword = keyword.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_first_tab(mut self, first_tab: impl Into<String>) -> Self {
        self.first_tab = Some(first_tab.into());
        self
    }
}

/// A tab's name and position; position 0 is the primary tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabRef<'a> {
    pub name: &'a str,
    pub index: usize,
}

impl<'a> TabRef<'a> {
    pub fn new(name: &'a str, index: usize) -> Self {
        Self { name, index }
    }

    pub fn is_primary(&self) -> bool {
        self.index == 0
    }
}

/// Ordered naming templates per artifact kind.
///
/// Paths are relative to the layout directory for the kind: the module's
/// models directory, its pages directory, its services directory, or its
/// grids directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamingRules {
    pub model_primary: Vec<String>,
    pub model_secondary: Vec<String>,
    /// Page directories tried for UI components and services.
    pub page_dirs: Vec<String>,
    /// UI paths relative to a page directory, primary tab.
    pub ui_primary: Vec<String>,
    /// UI paths relative to a page directory, other tabs.
    pub ui_secondary: Vec<String>,
    pub listing_grid: Vec<String>,
    /// Explicit singular forms consulted before the trailing-`s` rule.
    pub singular_overrides: BTreeMap<String, String>,
    /// Connector words dropped to build `tab_simple`.
    pub connector_words: Vec<String>,
}

impl Default for NamingRules {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            model_primary: strings(&[
                "{screen_kebab_singular}.ts",
                "{screen_pascal_singular}Modelo.ts",
                "{screen_pascal}Modelo.ts",
            ]),
            model_secondary: strings(&[
                "{screen_kebab_singular}-{tab_kebab_singular}.ts",
                "{screen_kebab_singular}-{tab_kebab}.ts",
                "{screen_kebab_singular}-{tab_kebab_reversed}.ts",
                "{tab_kebab_singular}.ts",
                "{tab_kebab}.ts",
                "{screen_pascal_singular}{tab_pascal}Modelo.ts",
                "{screen_pascal_singular}{tab_pascal}sModelo.ts",
                "{tab_pascal}Modelo.ts",
                "{tab_pascal}sModelo.ts",
            ]),
            page_dirs: strings(&[
                "{first_tab_kebab}",
                "{screen_kebab}",
                "{screen_kebab_singular}",
                "{keyword_compact}",
                "{keyword_compact_singular}",
                "{keyword_kebab}",
                "{keyword_kebab_singular}",
            ]),
            ui_primary: strings(&["form/tabs/index.tsx", "form/index.tsx"]),
            ui_secondary: strings(&[
                "form/tabs/{tab_kebab}/index.tsx",
                "form/tabs/{tab_kebab_singular}/index.tsx",
                "form/tabs/{tab_simple}/index.tsx",
            ]),
            listing_grid: strings(&[
                "{screen_kebab}.tsx",
                "{screen_kebab_singular}.tsx",
                "{screen_kebab}-grid.tsx",
                "{screen_kebab_singular}-grid.tsx",
            ]),
            singular_overrides: BTreeMap::new(),
            connector_words: strings(&["de", "do", "da", "dos", "das"]),
        }
    }
}

impl NamingRules {
    /// Returns template placeholders no rule set understands.
    pub fn unknown_placeholders(&self) -> Vec<String> {
        let mut unknown = Vec::new();
        let all = self
            .model_primary
            .iter()
            .chain(&self.model_secondary)
            .chain(&self.page_dirs)
            .chain(&self.ui_primary)
            .chain(&self.ui_secondary)
            .chain(&self.listing_grid);
        for template in all {
            for caps in PLACEHOLDER_RE.captures_iter(template) {
                let name = &caps[1];
                if !KNOWN_PLACEHOLDERS.contains(&name) && !unknown.iter().any(|u| u == name) {
                    unknown.push(name.to_string());
                }
            }
        }
        unknown
    }

    /// Ordered, deduplicated candidate paths for one artifact.
    ///
    /// Model and UI candidates depend on the tab (screen-only templates for
    /// the primary tab); service candidates are page directories and listing
    /// grid candidates ignore the tab.
    ///
    /// # Examples
    ///
    /// ```
    /// use formsync_core::ArtifactKind;
    /// use formsync_reconcile::{NameContext, NamingRules, TabRef};
    ///
    /// let rules = NamingRules::default();
    /// let ctx = NameContext::new("Contas", "CRM");
    ///
    /// let primary = rules.candidates(ArtifactKind::Model, &ctx, Some(TabRef::new("Principal", 0)));
    /// assert_eq!(primary, vec!["conta.ts", "ContaModelo.ts", "ContasModelo.ts"]);
    ///
    /// let contatos = rules.candidates(ArtifactKind::Model, &ctx, Some(TabRef::new("Contatos", 1)));
    /// assert_eq!(contatos[0], "conta-contato.ts");
    /// ```
    pub fn candidates(&self, kind: ArtifactKind, ctx: &NameContext, tab: Option<TabRef<'_>>) -> Vec<String> {
        let parts = self.parts(ctx, tab);
        let primary = tab.is_none_or(|t| t.is_primary());

        let rendered: Vec<String> = match kind {
            ArtifactKind::Model => {
                let templates = if primary {
                    &self.model_primary
                } else {
                    &self.model_secondary
                };
                render_all(templates, &parts)
            }
            ArtifactKind::UiComponent => {
                let templates = if primary {
                    &self.ui_primary
                } else {
                    &self.ui_secondary
                };
                let relative = render_all(templates, &parts);
                self.page_dirs(ctx)
                    .iter()
                    .flat_map(|dir| relative.iter().map(move |path| format!("{dir}/{path}")))
                    .collect()
            }
            ArtifactKind::Service => self.page_dirs(ctx),
            ArtifactKind::ListingGrid => render_all(&self.listing_grid, &parts),
        };

        dedup(rendered)
    }

    /// Page directories for a screen, in preference order.
    pub fn page_dirs(&self, ctx: &NameContext) -> Vec<String> {
        dedup(render_all(&self.page_dirs, &self.parts(ctx, None)))
    }

    /// Singular form under these rules.
    pub fn singular(&self, name: &str) -> String {
        singularize(name, &self.singular_overrides)
    }

    /// Kebab tab name with connector words removed: `dados-do-cliente` → `dados-cliente`.
    pub fn tab_simple(&self, tab_kebab: &str) -> String {
        tab_kebab
            .split('-')
            .filter(|word| !self.connector_words.iter().any(|c| c == word))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Placeholder values for a screen and optional tab.
    pub fn parts(&self, ctx: &NameContext, tab: Option<TabRef<'_>>) -> BTreeMap<&'static str, String> {
        let mut parts = BTreeMap::new();

        let screen_kebab = kebab_case(&ctx.screen);
        let screen_pascal = pascal_case(&ctx.screen);
        let screen_compact = compact_lower(&ctx.screen);
        parts.insert("screen_kebab_singular", self.singular(&screen_kebab));
        parts.insert("screen_pascal_singular", self.singular(&screen_pascal));
        parts.insert("screen_camel_singular", camel_case(&self.singular(&screen_pascal)));
        parts.insert("screen_compact_singular", self.singular(&screen_compact));
        parts.insert("screen_kebab", screen_kebab);
        parts.insert("screen_pascal", screen_pascal);
        parts.insert("screen_compact", screen_compact);
        parts.insert("module_lower", compact_lower(&ctx.module));

        if let Some(first) = ctx.first_tab.as_deref().map(kebab_case).filter(|k| !k.is_empty()) {
            parts.insert("first_tab_kebab", first);
        }

        if let Some(keyword) = ctx.keyword.as_deref() {
            let kebab = kebab_case(keyword);
            let compact = compact_lower(keyword);
            parts.insert("keyword_kebab_singular", self.singular(&kebab));
            parts.insert("keyword_compact_singular", self.singular(&compact));
            parts.insert("keyword_kebab", kebab);
            parts.insert("keyword_compact", compact);
        }

        if let Some(tab) = tab {
            let tab_kebab = kebab_case(tab.name);
            if !tab_kebab.is_empty() {
                let singular = self.singular(&tab_kebab);
                let reversed = singular.split('-').rev().collect::<Vec<_>>().join("-");
                parts.insert("tab_simple", self.tab_simple(&tab_kebab));
                parts.insert("tab_compact", tab_kebab.replace('-', ""));
                parts.insert("tab_pascal", pascal_case(tab.name));
                parts.insert("tab_kebab_reversed", reversed);
                parts.insert("tab_kebab_singular", singular);
                parts.insert("tab_kebab", tab_kebab);
            }
        }

        parts.retain(|_, value| !value.is_empty());
        parts
    }
}

fn render_all(templates: &[String], parts: &BTreeMap<&'static str, String>) -> Vec<String> {
    templates
        .iter()
        .filter_map(|template| render(template, parts))
        .collect()
}

/// Fills a template; `None` when any placeholder has no value.
fn render(template: &str, parts: &BTreeMap<&'static str, String>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let whole = caps.get(0)?;
        let value = parts.get(&caps[1])?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Some(out)
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
