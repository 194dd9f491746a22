//! Listing grid column extraction.
//!
//! The legacy listing page initializes a Kendo grid from an inline script.
//! The column list is read from that script first; when no script can be
//! read, the rendered table header is used instead.

use std::sync::LazyLock;

use formsync_core::GridColumnMetadata;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pseudo-column holding row action buttons.
pub const ACTION_COLUMN: &str = "AcaoBtn";

// SAFETY: These regexes are compile-time constants and are validated by tests.
static GRID_INIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:jQuery|\$)\(\s*["']#tbl\w+["']\s*\)\s*\.kendoGrid\(\s*\{"#)
        .expect("static regex must compile")
});
static COLUMNS_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?columns["']?\s*:\s*\["#).expect("static regex must compile")
});
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?field["']?\s*:\s*["']([\w.\[\]]+)["']"#).expect("static regex must compile")
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?title["']?\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("static regex must compile")
});
static HEADER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead th").expect("static selector must parse"));

/// Which tier produced the column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    /// Inline grid initialization script.
    Script,
    /// Rendered `thead` cells.
    Header,
}

impl std::fmt::Display for ColumnSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Header => write!(f, "header"),
        }
    }
}

/// Extracts listing grid columns, in display order.
///
/// Absent HTML yields no columns; it is never an error.
///
/// # Examples
///
/// ```
/// use formsync_extract::extract_columns;
///
/// let html = r##"<script>
/// jQuery("#tblContas").kendoGrid({"columns":[
///   {"field":"Nome","title":"Nome da Conta"},
///   {"field":"AcaoBtn","title":""},
///   {"field":"Cliente.Nome"}]});
/// </script>"##;
///
/// let columns = extract_columns(Some(html));
/// assert_eq!(columns.len(), 2);
/// assert_eq!(columns[0].title, "Nome da Conta");
/// assert_eq!(columns[1].title, "Cliente.Nome");
/// assert!(extract_columns(None).is_empty());
/// ```
pub fn extract_columns(html: Option<&str>) -> Vec<GridColumnMetadata> {
    extract_columns_with_source(html)
        .map(|(columns, _)| columns)
        .unwrap_or_default()
}

/// Extracts listing grid columns and reports which tier produced them.
///
/// Returns `None` when neither tier finds a column.
pub fn extract_columns_with_source(
    html: Option<&str>,
) -> Option<(Vec<GridColumnMetadata>, ColumnSource)> {
    let html = html?;

    let columns = columns_from_script(html);
    if !columns.is_empty() {
        debug!(columns = columns.len(), "Grid columns read from init script");
        return Some((columns, ColumnSource::Script));
    }

    let columns = columns_from_header(html);
    if !columns.is_empty() {
        debug!(columns = columns.len(), "Grid columns read from table header");
        return Some((columns, ColumnSource::Header));
    }

    None
}

fn columns_from_script(html: &str) -> Vec<GridColumnMetadata> {
    for init in GRID_INIT_RE.find_iter(html) {
        let rest = &html[init.end()..];
        let Some(key) = COLUMNS_KEY_RE.find(rest) else {
            continue;
        };
        // The match ends just past the opening bracket.
        let Some(array) = balanced_span(rest, key.end() - 1, b'[', b']') else {
            continue;
        };

        let columns: Vec<GridColumnMetadata> = split_objects(array)
            .into_iter()
            .filter_map(column_from_object)
            .filter(|column| column.field != ACTION_COLUMN)
            .collect();
        if !columns.is_empty() {
            return columns;
        }
    }
    Vec::new()
}

fn column_from_object(object: &str) -> Option<GridColumnMetadata> {
    let field = FIELD_RE.captures(object)?.get(1)?.as_str().to_string();
    let title = TITLE_RE
        .captures(object)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_js(m.as_str()).trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| field.clone());
    Some(GridColumnMetadata::new(field, title))
}

fn columns_from_header(html: &str) -> Vec<GridColumnMetadata> {
    let document = Html::parse_document(html);
    document
        .select(&HEADER_SELECTOR)
        .filter_map(|cell| {
            let field = cell.value().attr("data-field")?.trim();
            if field.is_empty() || field == ACTION_COLUMN {
                return None;
            }
            let text = cell
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let title = if text.is_empty() { field.to_string() } else { text };
            Some(GridColumnMetadata::new(field, title))
        })
        .collect()
}

/// Returns the text between the bracket at `start` and its matching close,
/// skipping brackets inside string literals.
fn balanced_span(text: &str, start: usize, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&open) {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == q {
                quote = None;
            }
            continue;
        }
        match byte {
            b'"' | b'\'' => quote = Some(byte),
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start + 1..start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits the inside of an array literal into its top-level `{…}` objects.
fn split_objects(array: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut cursor = 0;
    while let Some(found) = array[cursor..].find('{') {
        let start = cursor + found;
        match balanced_span(array, start, b'{', b'}') {
            Some(body) => {
                cursor = start + body.len() + 2;
                objects.push(body);
            }
            None => break,
        }
    }
    objects
}

/// Decodes the escapes the legacy serializer emits inside string literals.
fn unescape_js(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tier_preserves_order_and_drops_action_column() {
        let html = r##"<script type="text/javascript">
            jQuery("#tblClientes").kendoGrid({
                "dataSource": {"transport": {"read": "/Clientes/Listar"}},
                "columns":[
                    {"field":"AcaoBtn","title":" ","template":"<a href='#'>[x]</a>"},
                    {"field":"Codigo","title":"Código"},
                    {"field":"Cliente.Nome","title":"Cliente \"VIP\""},
                    {"field":"Cidade","attributes":{"class":"text-left"}}
                ],
                "pageable": true
            });
        </script>"##;

        let (columns, source) = extract_columns_with_source(Some(html)).unwrap();
        assert_eq!(source, ColumnSource::Script);
        let pairs: Vec<(&str, &str)> = columns
            .iter()
            .map(|c| (c.field.as_str(), c.title.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Codigo", "Código"),
                ("Cliente.Nome", "Cliente \"VIP\""),
                ("Cidade", "Cidade"),
            ]
        );
    }

    #[test]
    fn test_titles_pair_with_their_own_field() {
        let html = r##"<script>
            $("#tblContas").kendoGrid({"columns":[
                {"field":"Numero"},
                {"title":"Sem campo"},
                {"field":"Valor","title":"Valor Total"}
            ]});
        </script>"##;
        assert_eq!(
            extract_columns(Some(html)),
            vec![
                GridColumnMetadata::new("Numero", "Numero"),
                GridColumnMetadata::new("Valor", "Valor Total"),
            ]
        );
    }

    #[test]
    fn test_header_tier_used_without_script() {
        let html = r#"<table><thead><tr>
            <th data-field="AcaoBtn"></th>
            <th data-field="Nome"> Nome </th>
            <th>Sem campo</th>
            <th data-field="Email"></th>
        </tr></thead></table>"#;
        let (columns, source) = extract_columns_with_source(Some(html)).unwrap();
        assert_eq!(source, ColumnSource::Header);
        assert_eq!(
            columns,
            vec![
                GridColumnMetadata::new("Nome", "Nome"),
                GridColumnMetadata::new("Email", "Email"),
            ]
        );
    }

    #[test]
    fn test_script_without_columns_falls_back_to_header() {
        let html = r##"<script>$("#tblX").kendoGrid({"pageable":true});</script>
            <table><thead><tr><th data-field="Valor">Valor</th></tr></thead></table>"##;
        let (columns, source) = extract_columns_with_source(Some(html)).unwrap();
        assert_eq!(source, ColumnSource::Header);
        assert_eq!(columns[0].field, "Valor");
    }

    #[test]
    fn test_nothing_found() {
        assert!(extract_columns_with_source(Some("<p>vazio</p>")).is_none());
        assert!(extract_columns(Some("")).is_empty());
    }

    #[test]
    fn test_balanced_span_ignores_brackets_in_strings() {
        let text = r#"[{"t":"a]b"}, [1]] tail"#;
        assert_eq!(balanced_span(text, 0, b'[', b']'), Some(r#"{"t":"a]b"}, [1]"#));
        assert_eq!(balanced_span("[unterminated", 0, b'[', b']'), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_js(r"S\u00e3o Paulo\/SP"), "São Paulo/SP");
        assert_eq!(unescape_js(r"bad \uZZZZ"), r"bad \uZZZZ");
    }
}
