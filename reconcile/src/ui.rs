//! Patching generated tab components.
//!
//! Missing fields are injected as form controls right before the closing
//! tag of the component's form wrapper. A grid tab may instead have its
//! whole return expression replaced by a data grid, which discards whatever
//! the expression held, so that step is opt-in and refuses any return
//! expression it does not fully recognize.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use formsync_core::{FieldMetadata, TabMetadata};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::case::{camel_case, kebab_case, pascal_case};
use crate::error::Result;
use crate::patch::{FieldProperty, PatchConflict, has_import, indent_unit, indentation};

/// Placeholder comment in freshly materialized components.
pub const FIELDS_PLACEHOLDER: &str = "{/* INJECT_FIELDS_HERE */}";

// SAFETY: This regex is a compile-time constant and is validated by tests.
static RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\breturn\s*\(").expect("static regex must compile"));

/// Markup conventions of the generated components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiConventions {
    /// Closing tags fields are injected before, in preference order.
    pub field_markers: Vec<String>,
    /// Any of these means the component already renders a grid.
    pub grid_markers: Vec<String>,
    pub grid_import: String,
    /// Elements a replaceable return expression may have as its root.
    pub wrapper_roots: Vec<String>,
    /// `dataApi` expression of injected relation selectors.
    pub select2_data_api: String,
}

impl Default for UiConventions {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            field_markers: strings(&[
                "</Form.Wrapper>",
                "</Forms.Header>",
                "</Forms.Detail>",
                "</Forms.Simple>",
            ]),
            grid_markers: strings(&["<DataGrids", "<Grid"]),
            grid_import: "import { DataGrids } from '@/common/components/datagrids';".to_string(),
            wrapper_roots: strings(&[
                "Forms.Header",
                "Forms.Main",
                "Forms.Simple",
                "Forms.Detail",
                "Form.Wrapper",
            ]),
            select2_data_api:
                "{{ model: ANY_MODEL_HERE, controller: M8Controllers.ANY, loadSelect2Route: 'ANY_ROUTE_SELECAO' }}"
                    .to_string(),
        }
    }
}

/// Why a grid tab did not get a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GridSkipReason {
    /// Grid replacement was not enabled for this run.
    NotEnabled,
    /// The component does not have exactly one `return (` expression.
    ReturnCount { found: usize },
    /// The return expression's parentheses never close.
    UnbalancedReturn,
    /// The return expression is not a single known form wrapper.
    UnexpectedRoot,
}

impl fmt::Display for GridSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnabled => write!(f, "grid replacement not enabled"),
            Self::ReturnCount { found } => {
                write!(f, "expected one return expression, found {found}")
            }
            Self::UnbalancedReturn => write!(f, "return expression is not closed"),
            Self::UnexpectedRoot => write!(f, "return expression is not a single form wrapper"),
        }
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub allow_grid_replacement: bool,
    pub grid_column_limit: usize,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            allow_grid_replacement: false,
            grid_column_limit: 5,
        }
    }
}

/// Result of patching one component source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiPatch {
    #[serde(skip)]
    pub content: String,
    pub fields_injected: Vec<String>,
    pub grid_injected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_skipped: Option<GridSkipReason>,
    pub imports_added: Vec<String>,
    pub conflicts: Vec<PatchConflict>,
}

impl UiPatch {
    pub fn is_changed(&self) -> bool {
        !self.fields_injected.is_empty() || self.grid_injected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Select2,
    Checkbox,
    Date,
    Input,
}

impl Control {
    fn for_field(field: &FieldMetadata, prop: &FieldProperty) -> Self {
        match field.field_type.as_str() {
            "checkbox" | "boolean" => Self::Checkbox,
            "date" => Self::Date,
            "select" => Self::Select2,
            _ if prop.relation => Self::Select2,
            _ => Self::Input,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Select2 => "Form.Select2",
            Self::Checkbox => "Form.Checkbox",
            Self::Date => "Form.Date",
            Self::Input => "Form.Input",
        }
    }
}

/// Whether `source` already binds `key` through `register` or `name=`.
fn is_bound(source: &str, key: &str) -> bool {
    let key = regex::escape(key);
    let register = format!(r#"(?i)register\(\s*['"]{key}['"]"#);
    let name = format!(r#"(?i)\bname\s*=\s*['"]{key}['"]"#);
    [register, name]
        .iter()
        .any(|pattern| Regex::new(pattern).is_ok_and(|re| re.is_match(source)))
}

/// Patches a component so every field of `tab` has a bound control.
pub fn reconcile_ui_source(
    tab: &TabMetadata,
    source: &str,
    conventions: &UiConventions,
    options: UiOptions,
) -> UiPatch {
    let mut patch = UiPatch {
        content: source.to_string(),
        ..UiPatch::default()
    };

    let has_grid_marker = conventions
        .grid_markers
        .iter()
        .any(|marker| source.contains(marker.as_str()));
    if tab.has_grid && !has_grid_marker {
        match replace_return_with_grid(tab, source, conventions, options) {
            Ok(content) => {
                patch.content = content;
                patch.grid_injected = true;
                if !has_import(&patch.content, "DataGrids") && !conventions.grid_import.is_empty() {
                    let eol = if source.contains("\r\n") { "\r\n" } else { "\n" };
                    patch.content = format!("{}{eol}{}", conventions.grid_import, patch.content);
                    patch.imports_added.push("DataGrids".to_string());
                }
                info!(tab = %tab.name, "Replaced form with data grid");
                return patch;
            }
            Err(reason) => {
                debug!(tab = %tab.name, reason = %reason, "Grid not injected");
                patch.grid_skipped = Some(reason);
            }
        }
    }

    let mut seen = HashSet::new();
    let missing: Vec<(&FieldMetadata, FieldProperty)> = tab
        .fields
        .iter()
        .filter_map(|field| FieldProperty::of(field).map(|prop| (field, prop)))
        .filter(|(_, prop)| seen.insert(prop.key.clone()))
        .filter(|(_, prop)| {
            !is_bound(source, &prop.key) && !(prop.relation && is_bound(source, &prop.name))
        })
        .collect();
    if missing.is_empty() {
        return patch;
    }

    let unit = indent_unit(source);
    let render = |indent: &str| -> Vec<String> {
        missing
            .iter()
            .flat_map(|(field, prop)| render_control(field, prop, conventions, indent, &unit))
            .collect()
    };

    let eol = if source.contains("\r\n") { "\r\n" } else { "\n" };
    if let Some(at) = source.find(FIELDS_PLACEHOLDER) {
        let line_start = source[..at].rfind('\n').map_or(0, |i| i + 1);
        let indent = indentation(&source[line_start..]).to_string();
        let line_end = source[at..].find('\n').map_or(source.len(), |i| at + i);
        let line_end = if source[..line_end].ends_with('\r') {
            line_end - 1
        } else {
            line_end
        };
        let body = render(&indent).join(eol);
        patch.content = format!("{}{body}{}", &source[..line_start], &source[line_end..]);
    } else {
        let Some(at) = conventions
            .field_markers
            .iter()
            .find_map(|marker| source.rfind(marker.as_str()))
        else {
            if has_grid_marker {
                debug!(tab = %tab.name, "Component renders a grid only; no controls injected");
                return patch;
            }
            warn!(tab = %tab.name, "No form wrapper to inject fields into");
            patch.conflicts.push(PatchConflict::missing_anchor(
                "form wrapper closing tag",
                format!("{} fields", missing.len()),
            ));
            return patch;
        };
        let line_start = source[..at].rfind('\n').map_or(0, |i| i + 1);
        let marker_indent = &source[line_start..at];
        if marker_indent.trim().is_empty() {
            let indent = format!("{marker_indent}{unit}");
            let mut body = render(&indent).join(eol);
            body.push_str(eol);
            patch.content = format!("{}{body}{}", &source[..line_start], &source[line_start..]);
        } else {
            let base = indentation(marker_indent);
            let indent = format!("{base}{unit}");
            let body = render(&indent).join(eol);
            patch.content = format!("{}{eol}{body}{eol}{base}{}", &source[..at], &source[at..]);
        }
    }

    patch.fields_injected = missing.iter().map(|(_, prop)| prop.key.clone()).collect();
    info!(tab = %tab.name, fields = patch.fields_injected.len(), "Injected form controls");
    patch
}

fn render_control(
    field: &FieldMetadata,
    prop: &FieldProperty,
    conventions: &UiConventions,
    indent: &str,
    unit: &str,
) -> Vec<String> {
    let label = match camel_case(&field.label) {
        label if label.is_empty() => prop.key.clone(),
        label => label,
    };
    let control = Control::for_field(field, prop);
    if control == Control::Select2 {
        vec![
            format!("{indent}<{}", control.tag()),
            format!("{indent}{unit}label={{t('{label}')}}"),
            format!("{indent}{unit}dataApi={}", conventions.select2_data_api),
            format!("{indent}{unit}{{...register(\"{}\")}}", prop.key),
            format!("{indent}/>"),
        ]
    } else {
        vec![format!(
            "{indent}<{} label={{t('{label}')}} {{...register(\"{}\")}} />",
            control.tag(),
            prop.key
        )]
    }
}

/// Replaces the component's single return expression with a data grid.
fn replace_return_with_grid(
    tab: &TabMetadata,
    source: &str,
    conventions: &UiConventions,
    options: UiOptions,
) -> std::result::Result<String, GridSkipReason> {
    if !options.allow_grid_replacement {
        return Err(GridSkipReason::NotEnabled);
    }
    let returns: Vec<_> = RETURN_RE.find_iter(source).collect();
    if returns.len() != 1 {
        return Err(GridSkipReason::ReturnCount {
            found: returns.len(),
        });
    }
    let ret = returns[0];
    let open = ret.end() - 1;
    let close = matching_paren(source, open).ok_or(GridSkipReason::UnbalancedReturn)?;

    let expression = source[open + 1..close].trim();
    let root = conventions
        .wrapper_roots
        .iter()
        .find(|root| is_single_root(expression, root))
        .ok_or(GridSkipReason::UnexpectedRoot)?;
    debug!(tab = %tab.name, root = %root, "Return expression is replaceable");

    let line_start = source[..ret.start()].rfind('\n').map_or(0, |i| i + 1);
    let base = indentation(&source[line_start..]);
    let unit = indent_unit(source);
    let eol = if source.contains("\r\n") { "\r\n" } else { "\n" };

    let columns: Vec<String> = tab
        .fields
        .iter()
        .take(options.grid_column_limit)
        .map(|field| {
            let label = camel_case(&field.label);
            let label = if label.is_empty() { camel_case(&field.key) } else { label };
            format!(
                "{base}{unit}{unit}{unit}{{ field: '{}', title: t('{label}') }},",
                camel_case(&field.key)
            )
        })
        .collect();

    let mut lines = vec![
        "return (".to_string(),
        format!("{base}{unit}<DataGrids.Main"),
        format!("{base}{unit}{unit}tabName=\"{}\"", kebab_case(&tab.name)),
        format!("{base}{unit}{unit}modelName=\"{}\"", pascal_case(&tab.name)),
        format!("{base}{unit}{unit}columns={{["),
    ];
    lines.extend(columns);
    lines.push(format!("{base}{unit}{unit}]}}"));
    lines.push(format!("{base}{unit}/>"));
    lines.push(format!("{base})"));

    Ok(format!(
        "{}{}{}",
        &source[..ret.start()],
        lines.join(eol),
        &source[close + 1..]
    ))
}

fn matching_paren(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in source[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// `expression` is exactly one `<root …>…</root>` element.
fn is_single_root(expression: &str, root: &str) -> bool {
    let open = format!("<{root}");
    let Some(rest) = expression.strip_prefix(&open) else {
        return false;
    };
    let boundary = rest
        .chars()
        .next()
        .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/');
    let opens = expression
        .match_indices(&open)
        .filter(|(i, _)| {
            expression[i + open.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
        })
        .count();
    boundary && opens == 1 && expression.ends_with(&format!("</{root}>"))
}

/// Reads, patches and (unless `dry_run`) rewrites a component file.
pub fn reconcile_ui_file(
    tab: &TabMetadata,
    path: &Path,
    conventions: &UiConventions,
    options: UiOptions,
    dry_run: bool,
) -> Result<UiPatch> {
    let source = fs::read_to_string(path)?;
    let patch = reconcile_ui_source(tab, &source, conventions, options);
    if patch.is_changed() && !dry_run {
        fs::write(path, &patch.content)?;
        debug!(path = %path.display(), "Wrote component");
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT: &str = r#"import { Forms } from '@/common/components/forms';
import { useTranslation } from 'react-i18next';

export const Index = () => {
  const { t } = useTranslation('crm');
  const { register } = useFormContext();
  return (
    <Forms.Header>
      <Form.Input label={t('razaoSocial')} {...register("razaoSocial")} />
    </Forms.Header>
  );
};
"#;

    fn options() -> UiOptions {
        UiOptions::default()
    }

    fn grid_tab() -> TabMetadata {
        TabMetadata::new("Contatos")
            .with_grid()
            .with_field(FieldMetadata::new("ContatoNome", "text").with_label("Nome do Contato"))
            .with_field(FieldMetadata::new("Telefone", "text"))
            .with_field(FieldMetadata::new("Email", "text"))
    }

    #[test]
    fn test_injects_relation_selector_before_marker() {
        let tab = TabMetadata::new("Dados").with_field(
            FieldMetadata::new("ClienteId", "select").with_label("Cliente"),
        );
        let patch = reconcile_ui_source(&tab, COMPONENT, &UiConventions::default(), options());
        assert_eq!(patch.fields_injected, vec!["clienteId"]);
        let expected = r#"      <Form.Input label={t('razaoSocial')} {...register("razaoSocial")} />
      <Form.Select2
        label={t('cliente')}
        dataApi={{ model: ANY_MODEL_HERE, controller: M8Controllers.ANY, loadSelect2Route: 'ANY_ROUTE_SELECAO' }}
        {...register("clienteId")}
      />
    </Forms.Header>"#;
        assert!(patch.content.contains(expected), "{}", patch.content);
    }

    #[test]
    fn test_control_kinds() {
        let tab = TabMetadata::new("Dados")
            .with_field(FieldMetadata::new("Vip", "checkbox"))
            .with_field(FieldMetadata::new("DataAbertura", "date").with_label("Data de Abertura"))
            .with_field(FieldMetadata::new("Email", "text").with_label("E-mail"))
            .with_field(FieldMetadata::new("Ativo", "checkbox"));
        let patch = reconcile_ui_source(&tab, COMPONENT, &UiConventions::default(), options());
        assert_eq!(patch.fields_injected, vec!["vip", "dataAbertura", "email"]);
        assert!(patch.content.contains(r#"      <Form.Checkbox label={t('vip')} {...register("vip")} />"#));
        assert!(patch.content.contains(
            r#"      <Form.Date label={t('dataDeAbertura')} {...register("dataAbertura")} />"#
        ));
        assert!(patch.content.contains(r#"      <Form.Input label={t('eMail')} {...register("email")} />"#));
    }

    #[test]
    fn test_existing_bindings_are_respected() {
        let source = r#"<Forms.Header>
  <Select name='cliente' />
  <Form.Input {...register( 'EMAIL')} />
</Forms.Header>"#;
        let tab = TabMetadata::new("Dados")
            .with_field(FieldMetadata::new("ClienteId", "select"))
            .with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_ui_source(&tab, source, &UiConventions::default(), options());
        assert!(!patch.is_changed());
        assert_eq!(patch.content, source);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let tab = TabMetadata::new("Dados")
            .with_field(FieldMetadata::new("ClienteId", "select"))
            .with_field(FieldMetadata::new("Email", "text"));
        let first = reconcile_ui_source(&tab, COMPONENT, &UiConventions::default(), options());
        let second = reconcile_ui_source(&tab, &first.content, &UiConventions::default(), options());
        assert!(!second.is_changed());
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn test_marker_preference_and_last_occurrence() {
        let source = "<Form.Wrapper>\n</Form.Wrapper>\n<Forms.Header>\n  <Form.Wrapper>\n  </Form.Wrapper>\n</Forms.Header>";
        let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_ui_source(&tab, source, &UiConventions::default(), options());
        assert!(patch.content.contains(
            "  <Form.Wrapper>\n    <Form.Input label={t('email')} {...register(\"email\")} />\n  </Form.Wrapper>\n</Forms.Header>"
        ), "{}", patch.content);
    }

    #[test]
    fn test_inline_marker() {
        let source = "<Forms.Simple><p/></Forms.Simple>";
        let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_ui_source(&tab, source, &UiConventions::default(), options());
        assert_eq!(
            patch.content,
            "<Forms.Simple><p/>\n  <Form.Input label={t('email')} {...register(\"email\")} />\n</Forms.Simple>"
        );
    }

    #[test]
    fn test_missing_marker_is_conflict() {
        let source = "export const X = () => <div />;";
        let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_ui_source(&tab, source, &UiConventions::default(), options());
        assert!(!patch.is_changed());
        assert_eq!(patch.content, source);
        assert_eq!(patch.conflicts.len(), 1);
    }

    #[test]
    fn test_placeholder_is_replaced() {
        let source = "    return (\n        <Forms.Simple>\n            {/* INJECT_FIELDS_HERE */}\n        </Forms.Simple>\n    );\n";
        let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_ui_source(&tab, source, &UiConventions::default(), options());
        assert_eq!(
            patch.content,
            "    return (\n        <Forms.Simple>\n            <Form.Input label={t('email')} {...register(\"email\")} />\n        </Forms.Simple>\n    );\n"
        );
    }

    #[test]
    fn test_grid_requires_opt_in() {
        let patch = reconcile_ui_source(&grid_tab(), COMPONENT, &UiConventions::default(), options());
        assert!(!patch.grid_injected);
        assert_eq!(patch.grid_skipped, Some(GridSkipReason::NotEnabled));
        assert_eq!(patch.fields_injected, vec!["contatoNome", "telefone", "email"]);
    }

    #[test]
    fn test_grid_replaces_return_expression() {
        let options = UiOptions {
            allow_grid_replacement: true,
            grid_column_limit: 2,
        };
        let patch = reconcile_ui_source(&grid_tab(), COMPONENT, &UiConventions::default(), options);
        assert!(patch.grid_injected);
        assert!(patch.fields_injected.is_empty());
        assert_eq!(patch.imports_added, vec!["DataGrids"]);
        let expected = r#"  return (
    <DataGrids.Main
      tabName="contatos"
      modelName="Contatos"
      columns={[
        { field: 'contatoNome', title: t('nomeDoContato') },
        { field: 'telefone', title: t('telefone') },
      ]}
    />
  );
};"#;
        assert!(patch.content.contains(expected), "{}", patch.content);
        assert!(!patch.content.contains("Forms.Header>"));
        assert!(patch.content.starts_with("import { DataGrids }"));

        let again = reconcile_ui_source(&grid_tab(), &patch.content, &UiConventions::default(), options);
        assert!(!again.is_changed());
        assert!(again.conflicts.is_empty());
    }

    #[test]
    fn test_grid_fails_closed_on_unexpected_shapes() {
        let options = UiOptions {
            allow_grid_replacement: true,
            grid_column_limit: 5,
        };
        let two_returns = format!("{COMPONENT}\nconst Other = () => {{ return (<Forms.Header></Forms.Header>); }};");
        let patch = reconcile_ui_source(&grid_tab(), &two_returns, &UiConventions::default(), options);
        assert_eq!(patch.grid_skipped, Some(GridSkipReason::ReturnCount { found: 2 }));

        let fragment = COMPONENT.replace("<Forms.Header>", "<>\n    <Forms.Header>").replace(
            "</Forms.Header>\n  );",
            "</Forms.Header>\n    <Extra />\n    </>\n  );",
        );
        let patch = reconcile_ui_source(&grid_tab(), &fragment, &UiConventions::default(), options);
        assert_eq!(patch.grid_skipped, Some(GridSkipReason::UnexpectedRoot));
        assert!(!patch.grid_injected);

        let unbalanced = "export const X = () => { return (\n<Forms.Header>\n";
        let patch = reconcile_ui_source(&grid_tab(), unbalanced, &UiConventions::default(), options);
        assert_eq!(patch.grid_skipped, Some(GridSkipReason::UnbalancedReturn));
    }

    #[test]
    fn test_existing_grid_marker_skips_grid_silently() {
        let source = COMPONENT.replace("<Form.Input", "<DataGrids.Main columns={[]} />\n      <Form.Input");
        let options = UiOptions {
            allow_grid_replacement: true,
            grid_column_limit: 5,
        };
        let patch = reconcile_ui_source(&grid_tab(), &source, &UiConventions::default(), options);
        assert!(!patch.grid_injected);
        assert_eq!(patch.grid_skipped, None);
    }

    #[test]
    fn test_file_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.tsx");
        fs::write(&path, COMPONENT).unwrap();
        let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));

        let dry = reconcile_ui_file(&tab, &path, &UiConventions::default(), options(), true).unwrap();
        assert!(dry.is_changed());
        assert_eq!(fs::read_to_string(&path).unwrap(), COMPONENT);

        let written = reconcile_ui_file(&tab, &path, &UiConventions::default(), options(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), written.content);
    }
}
