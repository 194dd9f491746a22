//! Patching generated model classes.
//!
//! A tab's fields become optional class properties plus entries in the
//! model's `fieldMappingKeys` table. Existing declarations are never edited
//! or removed, so reconciling a patched file again changes nothing.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use formsync_core::{FieldMetadata, TabMetadata, is_standard_field};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::case::pascal_case;
use crate::error::Result;
use crate::mapping::{find_mapping_block, parse_mapping_pairs};
use crate::patch::{FieldProperty, Lines, PatchConflict, has_import, indentation};

pub const PROPS_PLACEHOLDER: &str = "// PROPS_HERE";
pub const MAPPINGS_PLACEHOLDER: &str = "// MAPPINGS_HERE";

const MEMBER_PREFIX: &str =
    r"^\s*(?:@\w+(?:\([^)]*\))?\s*)*(?:(?:public|private|protected|readonly|declare|override)\s+)*";

// SAFETY: These regexes are compile-time constants and are validated by tests.
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+(?:default\s+)?class\s+(\w+)").expect("static regex must compile")
});
static CONSTRUCTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:public\s+)?constructor\s*\(").expect("static regex must compile")
});
static ID_DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{MEMBER_PREFIX}(\w+Id)\s*[?!]?\s*:")).expect("static regex must compile")
});

/// Import lines and type names the generated models use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelConventions {
    pub base_class: String,
    pub base_import: String,
    pub relation_type: String,
    pub relation_import: String,
    pub required_import: String,
    pub max_length_import: String,
    /// Suffix of the legacy column holding a relation's display name.
    pub relation_name_suffix: String,
}

impl Default for ModelConventions {
    fn default() -> Self {
        Self {
            base_class: "Mapper".to_string(),
            base_import: "import { Mapper } from '@/common/core/models/base';".to_string(),
            relation_type: "select2".to_string(),
            relation_import: "import type { select2 } from '@/common/core/types/select2';".to_string(),
            required_import: "import { Required } from '@/common/helpers/class-validator/required';"
                .to_string(),
            max_length_import:
                "import { MaxLength } from '@/common/helpers/class-validator/max-length';".to_string(),
            relation_name_suffix: "Nome".to_string(),
        }
    }
}

/// Result of patching one model source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelPatch {
    #[serde(skip)]
    pub content: String,
    pub properties_added: Vec<String>,
    pub mappings_added: Vec<String>,
    pub imports_added: Vec<String>,
    pub base_class_added: bool,
    pub conflicts: Vec<PatchConflict>,
}

impl ModelPatch {
    pub fn is_changed(&self) -> bool {
        !self.properties_added.is_empty()
            || !self.mappings_added.is_empty()
            || !self.imports_added.is_empty()
            || self.base_class_added
    }
}

/// Name of the first exported class in a source file.
pub fn model_class_name(source: &str) -> Option<String> {
    CLASS_RE.captures(source).map(|caps| caps[1].to_string())
}

struct NewProperty {
    name: String,
    lines: Vec<String>,
    decorators: Vec<&'static str>,
    relation: bool,
}

/// Patches a model source so every field of `tab` is declared and mapped.
///
/// # Examples
///
/// ```
/// use formsync_core::{FieldMetadata, TabMetadata};
/// use formsync_reconcile::{ModelConventions, reconcile_model_source};
///
/// let source = "export class Conta extends Mapper {\n  constructor() {\n    super();\n  }\n}\n";
/// let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));
///
/// let patch = reconcile_model_source(&tab, source, &ModelConventions::default());
/// assert!(patch.content.contains("  email?: string;\n\n  constructor()"));
/// assert!(patch.content.contains("    email: 'Email',"));
///
/// let again = reconcile_model_source(&tab, &patch.content, &ModelConventions::default());
/// assert!(!again.is_changed());
/// ```
pub fn reconcile_model_source(tab: &TabMetadata, source: &str, conventions: &ModelConventions) -> ModelPatch {
    let mut patch = ModelPatch::default();
    let mut doc = Lines::parse(source);

    let block = find_mapping_block(source);
    let block_lines = block.map(|b| (b.header_line(source), b.closing_line(source)));
    let table_unclosed = block.is_none() && source.contains("fieldMappingKeys");
    if table_unclosed {
        patch.conflicts.push(PatchConflict::UnbalancedBlock {
            block: "fieldMappingKeys".to_string(),
        });
    }
    let outside_block = |index: usize| block_lines.is_none_or(|(start, end)| index < start || index > end);
    let declared = |name: &str| -> bool {
        let pattern = format!(r"(?i){MEMBER_PREFIX}{}\s*[?!]?\s*:", regex::escape(name));
        let Ok(re) = Regex::new(&pattern) else {
            return false;
        };
        doc.lines
            .iter()
            .enumerate()
            .any(|(i, line)| outside_block(i) && re.is_match(line))
    };

    let mut existing_keys: HashSet<String> = parse_mapping_pairs(source)
        .into_iter()
        .map(|pair| pair.frontend)
        .collect();
    let mut new_mappings: Vec<(String, String)> = Vec::new();
    let mut push_mapping = |key: String, legacy: String| {
        if existing_keys.insert(key.clone()) {
            new_mappings.push((key, legacy));
        }
    };

    let mut handled: HashSet<String> = HashSet::new();
    let mut new_properties: Vec<NewProperty> = Vec::new();

    for field in &tab.fields {
        let Some(prop) = FieldProperty::of(field) else {
            continue;
        };
        if !handled.insert(prop.name.clone()) {
            continue;
        }
        handled.insert(prop.key.clone());
        let legacy_key = pascal_case(&field.key);

        let scalar_id = prop.relation && !declared(&prop.name) && declared(&prop.key);
        if scalar_id {
            push_mapping(prop.key.clone(), legacy_key);
            continue;
        }

        if !declared(&prop.name) {
            new_properties.push(property_lines(field, &prop, conventions));
        }

        if prop.relation {
            push_mapping(format!("{}.id", prop.name), legacy_key);
            push_mapping(
                format!("{}.name", prop.name),
                format!("{}{}", pascal_case(&prop.name), conventions.relation_name_suffix),
            );
        } else {
            push_mapping(prop.name.clone(), legacy_key);
        }
    }

    // Foreign keys declared by hand still need a mapping entry.
    for (i, line) in doc.lines.iter().enumerate() {
        if !outside_block(i) {
            continue;
        }
        if let Some(caps) = ID_DECLARATION_RE.captures(line) {
            let name = caps[1].to_string();
            if !is_standard_field(&name) && !handled.contains(&name) {
                handled.insert(name.clone());
                let legacy = pascal_case(&name);
                push_mapping(name, legacy);
            }
        }
    }

    if new_properties.is_empty() && new_mappings.is_empty() {
        debug!(tab = %tab.name, "Model already matches tab");
        patch.content = source.to_string();
        return patch;
    }

    let Some(class_line) = doc.lines.iter().position(|l| CLASS_RE.is_match(l)) else {
        patch.conflicts.push(PatchConflict::missing_anchor(
            "exported class",
            format!(
                "{} properties and {} mappings",
                new_properties.len(),
                new_mappings.len()
            ),
        ));
        patch.content = source.to_string();
        return patch;
    };

    if !new_mappings.is_empty() && !table_unclosed {
        insert_mappings(&mut doc, block_lines, class_line, &new_mappings);
        patch.mappings_added = new_mappings.into_iter().map(|(key, _)| key).collect();
    }

    if !new_properties.is_empty() {
        if insert_properties(&mut doc, &new_properties) {
            patch.properties_added = new_properties.iter().map(|p| p.name.clone()).collect();
        } else {
            patch.conflicts.push(PatchConflict::missing_anchor(
                "constructor or closing brace",
                format!("{} properties", new_properties.len()),
            ));
            new_properties.clear();
        }
    }

    if patch.is_changed() {
        patch.base_class_added = add_base_class(&mut doc, conventions);
        let uses_relation = new_properties.iter().any(|p| p.relation);
        let uses = |decorator: &str| {
            new_properties
                .iter()
                .any(|p| p.decorators.iter().any(|d| *d == decorator))
        };
        let wanted = [
            (uses("Required"), "Required", conventions.required_import.as_str()),
            (uses("MaxLength"), "MaxLength", conventions.max_length_import.as_str()),
            (uses_relation, conventions.relation_type.as_str(), conventions.relation_import.as_str()),
            (patch.base_class_added, conventions.base_class.as_str(), conventions.base_import.as_str()),
        ];
        let text = doc.join();
        let mut imports = Vec::new();
        for (used, name, line) in wanted {
            if used && !line.is_empty() && !has_import(&text, name) {
                imports.push(line.to_string());
                patch.imports_added.push(name.to_string());
            }
        }
        doc.insert_all(0, imports);
    }

    info!(
        tab = %tab.name,
        properties = patch.properties_added.len(),
        mappings = patch.mappings_added.len(),
        "Patched model"
    );
    patch.content = doc.join();
    patch
}

fn property_lines(field: &FieldMetadata, prop: &FieldProperty, conventions: &ModelConventions) -> NewProperty {
    let mut lines = Vec::new();
    let mut decorators = Vec::new();
    if field.required {
        lines.push("@Required()".to_string());
        decorators.push("Required");
    }
    if let Some(max) = field.max_length {
        lines.push(format!("@MaxLength({max})"));
        decorators.push("MaxLength");
    }
    let ts_type = if prop.relation {
        conventions.relation_type.as_str()
    } else {
        match field.field_type.as_str() {
            "checkbox" | "boolean" => "boolean",
            "date" => "Date",
            "number" => "number",
            _ => "string",
        }
    };
    lines.push(format!("{}?: {ts_type};", prop.name));
    NewProperty {
        name: prop.name.clone(),
        lines,
        decorators,
        relation: prop.relation,
    }
}

fn insert_mappings(
    doc: &mut Lines,
    block_lines: Option<(usize, usize)>,
    class_line: usize,
    mappings: &[(String, String)],
) {
    let render = |indent: &str| -> Vec<String> {
        mappings
            .iter()
            .map(|(key, legacy)| {
                if key.contains('.') {
                    format!("{indent}'{key}': '{legacy}',")
                } else {
                    format!("{indent}{key}: '{legacy}',")
                }
            })
            .collect()
    };

    match block_lines {
        Some((header, end)) => {
            let indent = format!("{}  ", indentation(&doc.lines[header]));
            let placeholder = (header..=end).find(|&i| doc.lines[i].trim() == MAPPINGS_PLACEHOLDER);
            match placeholder {
                Some(at) => {
                    let indent = indentation(&doc.lines[at]).to_string();
                    doc.replace_with(at, render(&indent));
                }
                None if header == end => {
                    // Single-line table: split it open.
                    let line = doc.lines[header].clone();
                    let (head, tail) = line.split_at(line.find('{').map_or(line.len(), |i| i + 1));
                    let base = indentation(&line).to_string();
                    let mut new_lines = vec![head.to_string()];
                    let inner = tail.trim_start();
                    let inner = inner.strip_prefix('}').map_or(inner, |_| "");
                    if !inner.is_empty() {
                        let close = inner.rfind('}').unwrap_or(inner.len());
                        let existing = inner[..close].trim().trim_end_matches(',');
                        if !existing.is_empty() {
                            new_lines.push(format!("{indent}{existing},"));
                        }
                    }
                    new_lines.extend(render(&indent));
                    let rest = tail.rfind('}').map_or("};", |i| &tail[i..]);
                    new_lines.push(format!("{base}{rest}"));
                    doc.replace_with(header, new_lines);
                }
                None => doc.insert_all(header + 1, render(&indent)),
            }
        }
        None => {
            let mut block = vec!["  fieldMappingKeys = {".to_string()];
            block.extend(render("    "));
            block.push("  };".to_string());
            block.push(String::new());
            doc.insert_all(class_line + 1, block);
        }
    }
}

/// Inserts property declarations at the props placeholder, before the first
/// constructor, or before the last line that is only `}`.
fn insert_properties(doc: &mut Lines, properties: &[NewProperty]) -> bool {
    let render = |indent: &str| -> Vec<String> {
        properties
            .iter()
            .flat_map(|p| p.lines.iter().map(move |line| format!("{indent}{line}")))
            .collect()
    };

    if let Some(at) = doc.lines.iter().position(|l| l.trim_start().starts_with(PROPS_PLACEHOLDER)) {
        let indent = indentation(&doc.lines[at]).to_string();
        doc.replace_with(at, render(&indent));
        return true;
    }
    if let Some(at) = doc.lines.iter().position(|l| CONSTRUCTOR_RE.is_match(l)) {
        let indent = indentation(&doc.lines[at]).to_string();
        let mut lines = render(&indent);
        lines.push(String::new());
        doc.insert_all(at, lines);
        return true;
    }
    if let Some(at) = doc.lines.iter().rposition(|l| l.trim() == "}") {
        let indent = format!("{}  ", indentation(&doc.lines[at]));
        doc.insert_all(at, render(&indent));
        return true;
    }
    false
}

fn add_base_class(doc: &mut Lines, conventions: &ModelConventions) -> bool {
    if conventions.base_class.is_empty() {
        return false;
    }
    let Some(at) = doc.lines.iter().position(|l| CLASS_RE.is_match(l)) else {
        return false;
    };
    let line = &doc.lines[at];
    if line.contains(" extends ") || line.contains(" implements ") {
        return false;
    }
    let Some(class) = CLASS_RE.find(line) else {
        return false;
    };
    let end = class.end();
    let extended = format!("{} extends {}{}", &line[..end], conventions.base_class, &line[end..]);
    doc.lines[at] = extended;
    true
}

/// Reads, patches and (unless `dry_run`) rewrites a model file.
pub fn reconcile_model_file(
    tab: &TabMetadata,
    path: &Path,
    conventions: &ModelConventions,
    dry_run: bool,
) -> Result<ModelPatch> {
    let source = fs::read_to_string(path)?;
    let patch = reconcile_model_source(tab, &source, conventions);
    if patch.is_changed() && !dry_run {
        fs::write(path, &patch.content)?;
        debug!(path = %path.display(), "Wrote model");
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "import { Mapper } from '@/common/core/models/base';
import type { AnyObject } from '@/common/core/types/any-object';

export class ContaModelo extends Mapper {
  fieldMappingKeys = {
    razaoSocial: 'RazaoSocial',
  };

  razaoSocial?: string;

  constructor(json?: AnyObject) {
    super();
    this.map(json);
  }
}
";

    fn conventions() -> ModelConventions {
        ModelConventions::default()
    }

    fn tab() -> TabMetadata {
        TabMetadata::new("Dados Gerais")
            .with_field(FieldMetadata::new("RazaoSocial", "text").required())
            .with_field(FieldMetadata::new("Email", "text"))
            .with_field(FieldMetadata::new("ClienteId", "select").required())
            .with_field(FieldMetadata::new("DataAbertura", "date"))
            .with_field(FieldMetadata::new("Ativo", "checkbox"))
            .with_field(FieldMetadata::new("Nome", "text").with_max_length(60))
    }

    #[test]
    fn test_adds_missing_properties_before_constructor() {
        let patch = reconcile_model_source(&tab(), MODEL, &conventions());
        assert_eq!(patch.properties_added, vec!["email", "cliente", "dataAbertura", "nome"]);
        let expected = "  razaoSocial?: string;

  email?: string;
  @Required()
  cliente?: select2;
  dataAbertura?: Date;
  @MaxLength(60)
  nome?: string;

  constructor(json?: AnyObject) {";
        assert!(patch.content.contains(expected), "{}", patch.content);
        assert!(!patch.content.contains("ativo?:"));
    }

    #[test]
    fn test_adds_mappings_after_header() {
        let patch = reconcile_model_source(&tab(), MODEL, &conventions());
        assert_eq!(
            patch.mappings_added,
            vec!["email", "cliente.id", "cliente.name", "dataAbertura", "nome"]
        );
        let expected = "  fieldMappingKeys = {
    email: 'Email',
    'cliente.id': 'ClienteId',
    'cliente.name': 'ClienteNome',
    dataAbertura: 'DataAbertura',
    nome: 'Nome',
    razaoSocial: 'RazaoSocial',
  };";
        assert!(patch.content.contains(expected), "{}", patch.content);
    }

    #[test]
    fn test_imports_only_for_used_names() {
        let patch = reconcile_model_source(&tab(), MODEL, &conventions());
        assert_eq!(patch.imports_added, vec!["Required", "MaxLength", "select2"]);
        assert!(patch.content.starts_with(
            "import { Required } from '@/common/helpers/class-validator/required';\n"
        ));
        assert!(!patch.base_class_added);

        let plain = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&plain, MODEL, &conventions());
        assert!(patch.imports_added.is_empty());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let first = reconcile_model_source(&tab(), MODEL, &conventions());
        let second = reconcile_model_source(&tab(), &first.content, &conventions());
        assert!(!second.is_changed(), "{:?}", second);
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn test_existing_declarations_case_insensitive_and_decorated() {
        let source = "export class X extends Mapper {
  fieldMappingKeys = {
    email: 'Email',
  };
  @Required() public EMAIL?: string;
  constructor() {}
}";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert!(!patch.is_changed());
        assert_eq!(patch.content, source);
    }

    #[test]
    fn test_mapping_entry_does_not_count_as_declaration() {
        let source = "export class X extends Mapper {
  fieldMappingKeys = {
    email: 'Email',
  };
  constructor() {}
}";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert_eq!(patch.properties_added, vec!["email"]);
        assert!(patch.mappings_added.is_empty());
    }

    #[test]
    fn test_declared_foreign_key_gets_scalar_mapping() {
        let source = "export class X extends Mapper {
  fieldMappingKeys = {
  };
  clienteId?: number;
  vendedorId?: number;
  usuarioCadastrouId?: number;
  constructor() {}
}";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("ClienteId", "select"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert!(patch.properties_added.is_empty());
        assert_eq!(patch.mappings_added, vec!["clienteId", "vendedorId"]);
        assert!(patch.content.contains("    clienteId: 'ClienteId',"));
        assert!(patch.content.contains("    vendedorId: 'VendedorId',"));
        assert!(!patch.content.contains("usuarioCadastrouId: '"));
    }

    #[test]
    fn test_placeholders_are_replaced() {
        let source = "export class Nova extends Mapper {
  fieldMappingKeys = {
    // MAPPINGS_HERE
  };

  // PROPS_HERE

  constructor() {}
}";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert!(!patch.content.contains("_HERE"));
        assert!(patch.content.contains("  fieldMappingKeys = {\n    email: 'Email',\n  };"));
        assert!(patch.content.contains("\n  email?: string;\n\n  constructor"));
    }

    #[test]
    fn test_creates_mapping_table_and_base_class() {
        let source = "export class Solta {\n  nome?: string;\n}\n";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert!(patch.base_class_added);
        assert_eq!(patch.imports_added, vec!["Mapper"]);
        assert!(
            patch
                .content
                .contains("export class Solta extends Mapper {\n  fieldMappingKeys = {\n    email: 'Email',\n  };\n"),
            "{}",
            patch.content
        );
        assert!(patch.content.ends_with("  email?: string;\n}\n"));
    }

    #[test]
    fn test_single_line_table_is_opened() {
        let source = "export class X extends Mapper {\n  fieldMappingKeys = { nome: 'Nome' };\n  nome?: string;\n  constructor() {}\n}";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert!(
            patch
                .content
                .contains("  fieldMappingKeys = {\n    nome: 'Nome',\n    email: 'Email',\n  };"),
            "{}",
            patch.content
        );
        let again = reconcile_model_source(&tab, &patch.content, &conventions());
        assert!(!again.is_changed());
    }

    #[test]
    fn test_crlf_preserved() {
        let source = MODEL.replace('\n', "\r\n");
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, &source, &conventions());
        assert!(patch.content.contains("  email?: string;\r\n"));
        assert!(!patch.content.replace("\r\n", "").contains('\n'));
        assert!(patch.content.ends_with("}\r\n"));
    }

    #[test]
    fn test_missing_class_is_conflict() {
        let source = "const notAModel = 1;\n";
        let tab = TabMetadata::new("X").with_field(FieldMetadata::new("Email", "text"));
        let patch = reconcile_model_source(&tab, source, &conventions());
        assert!(!patch.is_changed());
        assert_eq!(patch.content, source);
        assert!(matches!(patch.conflicts[0], PatchConflict::MissingAnchor { .. }));
    }

    #[test]
    fn test_model_class_name() {
        assert_eq!(model_class_name(MODEL).as_deref(), Some("ContaModelo"));
        assert_eq!(model_class_name("const x = 1;"), None);
    }

    #[test]
    fn test_file_dry_run_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conta.ts");
        fs::write(&path, MODEL).unwrap();

        let patch = reconcile_model_file(&tab(), &path, &conventions(), true).unwrap();
        assert!(patch.is_changed());
        assert_eq!(fs::read_to_string(&path).unwrap(), MODEL);

        reconcile_model_file(&tab(), &path, &conventions(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), patch.content);
    }
}
