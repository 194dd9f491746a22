//! Patching the generated listing grid with the legacy listing's columns.
//!
//! Legacy column fields are backend names (`ClienteNome`); the generated
//! grid addresses frontend paths (`cliente.name`). The grid's model mapping
//! table translates between the two, so a column is only added when neither
//! name is already present.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use formsync_core::GridColumnMetadata;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::case::{camel_case, kebab_case};
use crate::config::ProjectLayout;
use crate::error::Result;
use crate::generation_log::GenerationLog;
use crate::mapping::parse_field_mappings;
use crate::patch::{PatchConflict, indent_unit, indentation};

const COLUMNS_OPEN: &str = "columns={[";

// SAFETY: These regexes are compile-time constants and are validated by tests.
static MODEL_NAME_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r#"modelName=['"](\w+)['"]"#,
        r#"gridName=['"](\w+)['"]"#,
        r"GridComponentProps<(\w+)>",
    ]
    .map(|pattern| Regex::new(pattern).expect("static regex must compile"))
});

/// Result of patching a listing grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingPatch {
    #[serde(skip)]
    pub content: String,
    /// Frontend field paths of the added columns.
    pub columns_added: Vec<String>,
    /// Model whose mapping table translated the columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    pub conflicts: Vec<PatchConflict>,
}

impl ListingPatch {
    pub fn is_changed(&self) -> bool {
        !self.columns_added.is_empty()
    }
}

/// Model class the grid component is bound to.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::listing_model_name;
///
/// assert_eq!(listing_model_name(r#"<Grid modelName="ContaModelo" />"#).as_deref(), Some("ContaModelo"));
/// assert_eq!(listing_model_name("const g: GridComponentProps<Conta> = {}").as_deref(), Some("Conta"));
/// assert_eq!(listing_model_name("<Grid />"), None);
/// ```
pub fn listing_model_name(source: &str) -> Option<String> {
    MODEL_NAME_RES
        .iter()
        .find_map(|re| re.captures(source))
        .map(|caps| caps[1].to_string())
}

/// Column type from the legacy field name and its frontend path.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::column_type;
///
/// assert_eq!(column_type("ValorLimite", "valorLimite"), "decimal");
/// assert_eq!(column_type("DataValor", "dataValor"), "date");
/// assert_eq!(column_type("Codigo", "id"), "number");
/// assert_eq!(column_type("Nome", "nome"), "string");
/// ```
pub fn column_type(legacy: &str, frontend: &str) -> &'static str {
    let lower = legacy.to_lowercase();
    if lower == "ativo" || frontend == "ativo" {
        "boolean"
    } else if lower == "id" || frontend == "id" {
        "number"
    } else if lower.contains("data") {
        "date"
    } else if lower.contains("valor") || lower.contains("preco") {
        "decimal"
    } else {
        "string"
    }
}

/// Adds missing legacy columns to a grid component.
///
/// `mappings` maps legacy field names to frontend paths, as returned by
/// [`parse_field_mappings`].
pub fn reconcile_listing_source(
    columns: &[GridColumnMetadata],
    source: &str,
    mappings: &BTreeMap<String, String>,
) -> ListingPatch {
    let mut patch = ListingPatch {
        content: source.to_string(),
        ..ListingPatch::default()
    };

    let mut missing: Vec<(&GridColumnMetadata, String)> = Vec::new();
    for column in columns {
        let mut frontend = mappings
            .get(&column.field)
            .cloned()
            .unwrap_or_else(|| column.field.clone());
        if frontend.eq_ignore_ascii_case("id") || frontend.eq_ignore_ascii_case("ativo") {
            frontend = frontend.to_lowercase();
        }
        let inverted = mappings
            .iter()
            .find(|(_, mapped)| **mapped == frontend)
            .map(|(legacy, _)| legacy.as_str());
        let present = has_column(source, &frontend)
            || inverted.is_some_and(|legacy| has_column(source, legacy))
            || missing.iter().any(|(_, f)| *f == frontend);
        if !present {
            missing.push((column, frontend));
        }
    }
    if missing.is_empty() {
        return patch;
    }

    let Some(open) = source.find(COLUMNS_OPEN) else {
        patch.conflicts.push(PatchConflict::missing_anchor(
            COLUMNS_OPEN,
            format!("{} columns", missing.len()),
        ));
        return patch;
    };
    let bracket = open + COLUMNS_OPEN.len() - 1;
    let Some(close) = matching_bracket(source, bracket) else {
        patch.conflicts.push(PatchConflict::UnbalancedBlock {
            block: COLUMNS_OPEN.to_string(),
        });
        return patch;
    };

    let eol = if source.contains("\r\n") { "\r\n" } else { "\n" };
    let unit = indent_unit(source);
    let open_line = source[..open].rfind('\n').map_or(0, |i| i + 1);
    let base = indentation(&source[open_line..]);
    let indent = format!("{base}{unit}");

    let lines: Vec<String> = missing
        .iter()
        .map(|(column, frontend)| {
            let label = camel_case(&column.title);
            let label = label.strip_suffix("Id").filter(|l| !l.is_empty()).unwrap_or(&label);
            format!(
                "{indent}{{ label: t('{label}'), field: '{frontend}', type: '{}', width: 150 }},",
                column_type(&column.field, frontend)
            )
        })
        .collect();

    let existing = source[bracket + 1..close].trim_end();
    let (head, comma) = if !existing.trim().is_empty() && !existing.ends_with(',') {
        let at = bracket + 1 + existing.len();
        (&source[..at], ",")
    } else {
        (&source[..bracket + 1 + existing.len()], "")
    };
    let close_line = source[..close].rfind('\n').map_or(0, |i| i + 1);
    let close_indent = if source[close_line..close].trim().is_empty() && close_line > bracket {
        &source[close_line..close]
    } else {
        base
    };
    patch.content = format!(
        "{head}{comma}{eol}{}{eol}{close_indent}{}",
        lines.join(eol),
        &source[close..]
    );
    patch.columns_added = missing.into_iter().map(|(_, frontend)| frontend).collect();
    info!(columns = patch.columns_added.len(), "Added listing grid columns");
    patch
}

fn has_column(source: &str, field: &str) -> bool {
    let pattern = format!(r#"(?i)field:\s*['"]{}['"]"#, regex::escape(field));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(source))
}

fn matching_bracket(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Finds the model file a grid is bound to.
///
/// Tries `{kebab}.ts` in the model directories, then generation log
/// entries under `/models/`, then the grid's own import of the class.
pub fn locate_listing_model(
    grid_source: &str,
    model_name: &str,
    layout: &ProjectLayout,
    log: Option<&GenerationLog>,
) -> Option<PathBuf> {
    let kebab = kebab_case(model_name);
    let file = format!("{kebab}.ts");

    if let Some(path) = layout.model_dirs().map(|dir| dir.join(&file)).find(|p| p.is_file()) {
        return Some(path);
    }

    if let Some(log) = log {
        let logged = log
            .containing(&["/models/", kebab.as_str()])
            .map(|entry| entry.resolve(&layout.front_src))
            .find(|path| path.is_file());
        if logged.is_some() {
            return logged;
        }
    }

    let import = format!(
        r#"import\s+(?:type\s+)?\{{[^}}]*\b{}\b[^}}]*\}}\s*from\s*['"]@/([^'"]+)['"]"#,
        regex::escape(model_name)
    );
    let re = Regex::new(&import).ok()?;
    let module = re.captures(grid_source)?[1].to_string();
    let path = layout.front_src.join(format!("{module}.ts"));
    path.is_file().then_some(path)
}

/// Reads, patches and (unless `dry_run`) rewrites a listing grid file.
pub fn reconcile_listing_file(
    columns: &[GridColumnMetadata],
    path: &Path,
    layout: &ProjectLayout,
    log: Option<&GenerationLog>,
    dry_run: bool,
) -> Result<ListingPatch> {
    let source = fs::read_to_string(path)?;

    let model_path = listing_model_name(&source)
        .and_then(|name| locate_listing_model(&source, &name, layout, log));
    let mappings = match &model_path {
        Some(model) => parse_field_mappings(&fs::read_to_string(model)?),
        None => {
            debug!(grid = %path.display(), "No model found for grid; using legacy names");
            BTreeMap::new()
        }
    };

    let mut patch = reconcile_listing_source(columns, &source, &mappings);
    patch.model_path = model_path.map(|p| p.to_string_lossy().into_owned());
    if patch.is_changed() && !dry_run {
        fs::write(path, &patch.content)?;
        debug!(path = %path.display(), "Wrote listing grid");
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = r#"import { Grid } from '@/common/components/grid';
import { ContaModelo } from '@/common/core/models/crm/conta';

export const ContasGrid = () => {
  const { t } = useTranslation('crm');
  return (
    <Grid
      modelName="ContaModelo"
      columns={[
        { label: t('razaoSocial'), field: 'razaoSocial', type: 'string', width: 150 }
      ]}
    />
  );
};
"#;

    fn columns() -> Vec<GridColumnMetadata> {
        vec![
            GridColumnMetadata::new("RazaoSocial", "Razão Social"),
            GridColumnMetadata::new("ClienteNome", "Cliente"),
            GridColumnMetadata::new("ValorLimite", "Valor Limite"),
            GridColumnMetadata::new("DataAbertura", "Data Abertura"),
            GridColumnMetadata::new("VendedorId", "Vendedor Id"),
        ]
    }

    fn mappings() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("RazaoSocial".to_string(), "razaoSocial".to_string()),
            ("ClienteNome".to_string(), "cliente.name".to_string()),
        ])
    }

    #[test]
    fn test_adds_missing_columns_with_mapped_fields() {
        let patch = reconcile_listing_source(&columns(), GRID, &mappings());
        assert_eq!(
            patch.columns_added,
            vec!["cliente.name", "ValorLimite", "DataAbertura", "VendedorId"]
        );
        let expected = "        { label: t('razaoSocial'), field: 'razaoSocial', type: 'string', width: 150 },
        { label: t('cliente'), field: 'cliente.name', type: 'string', width: 150 },
        { label: t('valorLimite'), field: 'ValorLimite', type: 'decimal', width: 150 },
        { label: t('dataAbertura'), field: 'DataAbertura', type: 'date', width: 150 },
        { label: t('vendedor'), field: 'VendedorId', type: 'string', width: 150 },
      ]}";
        assert!(patch.content.contains(expected), "{}", patch.content);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let first = reconcile_listing_source(&columns(), GRID, &mappings());
        let second = reconcile_listing_source(&columns(), &first.content, &mappings());
        assert!(!second.is_changed());
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn test_legacy_name_already_present_counts() {
        let source = GRID.replace("field: 'razaoSocial'", "field: 'RazaoSocial'");
        let cols = vec![GridColumnMetadata::new("RazaoSocial", "Razão Social")];
        let patch = reconcile_listing_source(&cols, &source, &mappings());
        assert!(!patch.is_changed());
    }

    #[test]
    fn test_empty_columns_array() {
        let source = "<Grid columns={[]} />";
        let cols = vec![GridColumnMetadata::new("Ativo", "Ativo")];
        let patch = reconcile_listing_source(&cols, source, &BTreeMap::new());
        assert_eq!(
            patch.content,
            "<Grid columns={[\n  { label: t('ativo'), field: 'ativo', type: 'boolean', width: 150 },\n]} />"
        );
    }

    #[test]
    fn test_missing_columns_block_is_conflict() {
        let cols = vec![GridColumnMetadata::new("Nome", "Nome")];
        let patch = reconcile_listing_source(&cols, "<Grid />", &BTreeMap::new());
        assert!(!patch.is_changed());
        assert_eq!(patch.conflicts.len(), 1);
    }

    #[test]
    fn test_locate_model_by_directory_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), "CRM");

        let imported = dir.path().join("common/core/models/crm/conta.ts");
        fs::create_dir_all(imported.parent().unwrap()).unwrap();
        fs::write(&imported, "").unwrap();
        assert_eq!(
            locate_listing_model(GRID, "ContaModelo", &layout, None),
            Some(imported.clone())
        );

        let direct = dir.path().join("common/core/models/crm/conta-modelo.ts");
        fs::write(&direct, "").unwrap();
        assert_eq!(locate_listing_model(GRID, "ContaModelo", &layout, None), Some(direct));
    }

    #[test]
    fn test_file_uses_model_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), "CRM");
        let model = dir.path().join("common/core/models/crm/conta-modelo.ts");
        fs::create_dir_all(model.parent().unwrap()).unwrap();
        fs::write(
            &model,
            "export class ContaModelo {\n  fieldMappingKeys = {\n    'cliente.name': 'ClienteNome',\n  };\n}\n",
        )
        .unwrap();
        let grid = dir.path().join("contas.tsx");
        fs::write(&grid, GRID).unwrap();

        let cols = vec![GridColumnMetadata::new("ClienteNome", "Cliente")];
        let patch = reconcile_listing_file(&cols, &grid, &layout, None, false).unwrap();
        assert_eq!(patch.columns_added, vec!["cliente.name"]);
        assert_eq!(patch.model_path, Some(model.to_string_lossy().into_owned()));
        assert!(fs::read_to_string(&grid).unwrap().contains("field: 'cliente.name'"));
    }
}
