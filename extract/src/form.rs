//! Tab and field extraction from a captured form page.
//!
//! The legacy templates render every tab of a screen into one page: a tab
//! strip (`ul` of links) whose `href` fragments point at pane containers,
//! and the form controls inside each pane. [`FormExtractor`] walks that
//! structure and produces a [`ScreenMetadata`] tree.

use std::collections::HashSet;
use std::sync::LazyLock;

use formsync_core::{FieldMetadata, ScreenContext, ScreenMetadata, TabMetadata};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::report::{ExtractionReport, ParseSignal, SkippedFields};

// SAFETY: These selectors are compile-time constants and are validated by tests.
static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| static_selector("a"));
static FIELD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| static_selector("input, select, textarea"));
static LABEL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| static_selector("label"));
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| static_selector("body"));
static MODEL_FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| static_selector("form[model-name]"));

fn static_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Metadata plus the report describing how it was obtained.
#[derive(Debug, Clone)]
pub struct ExtractionRun {
    pub metadata: ScreenMetadata,
    pub report: ExtractionReport,
}

/// Extracts screen metadata from captured form HTML.
///
/// # Examples
///
/// ```
/// use formsync_core::ScreenContext;
/// use formsync_extract::{ExtractorConfig, FormExtractor};
///
/// let html = r#"<html><body>
///   <form model-name="Erp.Crm.Conta">
///     <div class="form-group"><label>E-mail</label><input name="Email" maxlength="80"></div>
///   </form>
/// </body></html>"#;
///
/// let extractor = FormExtractor::new(ExtractorConfig::default());
/// let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
/// let run = extractor.extract(&ctx, html).unwrap();
///
/// assert_eq!(run.metadata.model_name, "Conta");
/// assert_eq!(run.metadata.tabs[0].name, "Principal");
/// assert_eq!(run.metadata.tabs[0].fields[0].label, "E-mail");
/// assert_eq!(run.metadata.tabs[0].fields[0].max_length, Some(80));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormExtractor {
    config: ExtractorConfig,
}

impl FormExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts metadata and a report from one captured page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::IncompleteContext`] when the module, menu or
    /// screen name is empty, and [`ExtractError::SourceNotFound`] when `html`
    /// is empty or has no markup at all. Every other irregularity is
    /// reported as a [`ParseSignal`].
    pub fn extract(&self, context: &ScreenContext, html: &str) -> Result<ExtractionRun, ExtractError> {
        let empty = context.empty_parts();
        if !empty.is_empty() {
            return Err(ExtractError::IncompleteContext(format!(
                "{} is empty",
                empty.join(", ")
            )));
        }
        ensure_markup(html)?;
        let document = Html::parse_document(html);
        let mut signals = Vec::new();
        let mut skipped = SkippedFields::default();

        let model_form = document.select(&MODEL_FORM_SELECTOR).next();
        let model_name = match model_form.and_then(|form| form.value().attr("model-name")) {
            Some(raw) => model_name_from_attribute(raw),
            None => {
                signals.push(ParseSignal::ModelNameMissing);
                String::new()
            }
        };
        let form_id = model_form.and_then(|form| form.value().attr("id"));

        let mut tabs = Vec::new();
        let mut tab_strip_selector = None;
        match self.find_tab_strip(&document, form_id, &mut signals) {
            Some((strip, css)) => {
                tabs = self.tabs_from_strip(&document, strip, &mut signals, &mut skipped);
                if tabs.is_empty() {
                    signals.push(ParseSignal::EmptyTabStrip { selector: css });
                } else {
                    tab_strip_selector = Some(css);
                }
            }
            None => signals.push(ParseSignal::NoTabStrip),
        }

        if tabs.is_empty() {
            let root = document
                .select(&BODY_SELECTOR)
                .next()
                .unwrap_or_else(|| document.root_element());
            let mut tab = TabMetadata::synthetic();
            self.collect_fields(root, &mut tab, &mut skipped);
            debug!(fields = tab.fields.len(), "Using synthetic tab for form without tab strip");
            tabs.push(tab);
        }

        let mut metadata = ScreenMetadata::new(context, model_name);
        metadata.tabs = tabs;

        let report = ExtractionReport {
            module: context.module.clone(),
            screen: context.screen.clone(),
            tab_strip_selector,
            tab_count: metadata.tabs.len(),
            field_count: metadata.field_count(),
            skipped_fields: skipped,
            signals,
        };

        info!(
            module = %context.module,
            screen = %context.screen,
            tabs = report.tab_count,
            fields = report.field_count,
            signals = report.signals.len(),
            "Extracted screen metadata"
        );

        Ok(ExtractionRun { metadata, report })
    }

    fn find_tab_strip<'a>(
        &self,
        document: &'a Html,
        form_id: Option<&str>,
        signals: &mut Vec<ParseSignal>,
    ) -> Option<(ElementRef<'a>, String)> {
        for (index, css) in self
            .config
            .resolved_tab_strip_selectors(form_id)
            .into_iter()
            .enumerate()
        {
            let selector = match Selector::parse(&css) {
                Ok(selector) => selector,
                Err(_) => {
                    warn!(selector = %css, "Skipping unparseable tab-strip selector");
                    continue;
                }
            };
            if let Some(strip) = document.select(&selector).next() {
                if index > 0 {
                    signals.push(ParseSignal::TabStripFallback {
                        selector: css.clone(),
                    });
                }
                debug!(selector = %css, "Matched tab strip");
                return Some((strip, css));
            }
        }
        None
    }

    fn tabs_from_strip(
        &self,
        document: &Html,
        strip: ElementRef<'_>,
        signals: &mut Vec<ParseSignal>,
        skipped: &mut SkippedFields,
    ) -> Vec<TabMetadata> {
        let mut tabs = Vec::new();

        // Direct children only: dropdown tabs nest their own `li` menus.
        let items = strip
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name().eq_ignore_ascii_case("li"));
        for (position, item) in items.enumerate() {
            let link = item.select(&LINK_SELECTOR).next();
            let name = tab_name(&link.map(element_text).unwrap_or_default());
            if name.is_empty() {
                signals.push(ParseSignal::UnnamedTabSkipped { position });
                continue;
            }

            let handler = item
                .value()
                .attr("onclick")
                .or_else(|| link.and_then(|a| a.value().attr("onclick")))
                .unwrap_or_default();

            let mut tab = TabMetadata::new(name);
            tab.id = link
                .and_then(|a| a.value().attr("href"))
                .and_then(container_id_from_href);
            tab.has_grid = self.config.is_grid_handler(handler);

            match tab.id.clone() {
                None => signals.push(ParseSignal::TabWithoutContainerId {
                    tab: tab.name.clone(),
                }),
                Some(id) => match find_container(document, &id) {
                    Some((container, used_fallback)) => {
                        if used_fallback {
                            signals.push(ParseSignal::ContainerFallback {
                                tab: tab.name.clone(),
                            });
                        }
                        self.collect_fields(container, &mut tab, skipped);
                    }
                    None => {
                        warn!(tab = %tab.name, container = %id, "Tab container not found");
                        signals.push(ParseSignal::ContainerMissing {
                            tab: tab.name.clone(),
                        });
                    }
                },
            }

            debug!(
                tab = %tab.name,
                fields = tab.fields.len(),
                has_grid = tab.has_grid,
                "Extracted tab"
            );
            tabs.push(tab);
        }

        tabs
    }

    fn collect_fields(&self, container: ElementRef<'_>, tab: &mut TabMetadata, skipped: &mut SkippedFields) {
        let mut seen: HashSet<String> = HashSet::new();

        for element in container.select(&FIELD_SELECTOR) {
            let attrs = element.value();
            let Some(key) = attrs.attr("name").map(str::trim).filter(|name| !name.is_empty()) else {
                skipped.unnamed += 1;
                continue;
            };
            if key == "undefined" {
                skipped.placeholder += 1;
                continue;
            }
            let field_type = self.field_type(element);
            if field_type == "hidden" {
                skipped.hidden += 1;
                continue;
            }
            if !seen.insert(key.to_string()) {
                skipped.duplicate += 1;
                continue;
            }

            let label = form_group_label(element).unwrap_or_else(|| key.to_string());
            let mut field = FieldMetadata::new(key, field_type).with_label(label);
            field.required = self.is_required(element);
            field.max_length = attrs
                .attr("maxlength")
                .and_then(|value| value.trim().parse::<u32>().ok())
                .filter(|length| *length > 0);
            field.is_hidden = is_inside_hidden_block(element);

            for attribute in &self.config.dependency_attributes {
                if let Some(dependency) = attrs
                    .attr(attribute.as_str())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                {
                    tab.dependencies
                        .push(format!("field '{key}' depends on '{dependency}'"));
                }
            }
            if field.is_hidden {
                tab.dependencies
                    .push(format!("field '{key}' starts inside a hidden block"));
            }

            tab.fields.push(field);
        }
    }

    fn field_type(&self, element: ElementRef<'_>) -> String {
        let attrs = element.value();
        let base = attrs
            .attr("type")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| attrs.name().to_ascii_lowercase());

        if base == "text" || base == "input" {
            if let Some(hint) = self.config.mask_hint(attrs.classes()) {
                return hint.to_string();
            }
        }
        base
    }

    fn is_required(&self, element: ElementRef<'_>) -> bool {
        let attrs = element.value();
        attrs
            .attr("required")
            .is_some_and(|value| !value.trim().eq_ignore_ascii_case("false"))
            || attrs
                .attr(self.config.required_attribute.as_str())
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

/// Extracts screen metadata with the default configuration.
///
/// # Errors
///
/// Returns [`ExtractError::SourceNotFound`] for empty or markup-free input.
pub fn extract_screen(context: &ScreenContext, html: &str) -> Result<ScreenMetadata, ExtractError> {
    FormExtractor::default()
        .extract(context, html)
        .map(|run| run.metadata)
}

/// Extracts screen metadata and its report with an explicit configuration.
pub fn extract_screen_with_report(
    context: &ScreenContext,
    html: &str,
    config: &ExtractorConfig,
) -> Result<ExtractionRun, ExtractError> {
    FormExtractor::new(config.clone()).extract(context, html)
}

fn ensure_markup(html: &str) -> Result<(), ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::SourceNotFound(
            "captured form HTML is empty".to_string(),
        ));
    }
    if !html.contains('<') {
        return Err(ExtractError::SourceNotFound(
            "captured form HTML contains no markup".to_string(),
        ));
    }
    Ok(())
}

/// `Erp.Modulo.ContaModelo` → `ContaModelo`.
fn model_name_from_attribute(raw: &str) -> String {
    raw.trim().rsplit('.').next().unwrap_or_default().to_string()
}

/// Link text up to the first `:` (counters such as `Contatos: 3`), with
/// whitespace collapsed.
fn tab_name(raw: &str) -> String {
    let head = raw.split(':').next().unwrap_or_default();
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn container_id_from_href(href: &str) -> Option<String> {
    let id = href.trim().trim_start_matches('#');
    if id.is_empty() || id.contains(':') || id.contains('/') {
        return None;
    }
    Some(id.to_string())
}

fn find_container<'a>(document: &'a Html, id: &str) -> Option<(ElementRef<'a>, bool)> {
    if let Ok(selector) = Selector::parse(&format!("#{id}")) {
        if let Some(container) = document.select(&selector).next() {
            return Some((container, false));
        }
    }
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    let selector = Selector::parse(&format!(".tab-pane[id=\"{escaped}\"]")).ok()?;
    document.select(&selector).next().map(|container| (container, true))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn form_group_label(element: ElementRef<'_>) -> Option<String> {
    let group = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().classes().any(|class| class == "form-group"))?;
    let label = group.select(&LABEL_SELECTOR).next()?;
    let text = element_text(label)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn is_inside_hidden_block(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|node| node.value().attr("style").is_some_and(hides_element))
}

fn hides_element(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none")
}
