//! Repairing references to the model class in generated services and UI.
//!
//! The scaffolding generator sometimes emitted `model: ,` or a
//! `model: new Placeholder(),` option and an untyped `BaseService` when it
//! could not resolve the model yet. Once the model file is known these are
//! rewritten to name the class.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

// SAFETY: These regexes are compile-time constants and are validated by tests.
static TYPED_SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"extends\s+BaseService<([^>]*)>").expect("static regex must compile")
});
static UNTYPED_SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"extends\s+BaseService\s*\{").expect("static regex must compile")
});
static MODEL_OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"model:\s*(?:new\s+\w+\(\))?\s*,").expect("static regex must compile")
});

/// Result of repairing one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferencePatch {
    #[serde(skip)]
    pub content: String,
    pub service_typed: bool,
    pub model_options_fixed: usize,
}

impl ReferencePatch {
    pub fn is_changed(&self) -> bool {
        self.service_typed || self.model_options_fixed > 0
    }
}

/// Points `model:` options (and, for services, the `BaseService` generic)
/// at `class`. Any existing generic is replaced, not only placeholders.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::repair_model_references;
///
/// let source = "export class ContaService extends BaseService {\n  opts = { model: , url: 'conta' };\n}\n";
/// let patch = repair_model_references(source, "Conta", true);
/// assert!(patch.content.contains("extends BaseService<Conta> {"));
/// assert!(patch.content.contains("model: Conta, url"));
/// ```
pub fn repair_model_references(source: &str, class: &str, is_service: bool) -> ReferencePatch {
    let mut patch = ReferencePatch::default();
    let mut content = source.to_string();

    if is_service {
        let typed = TYPED_SERVICE_RE.replace_all(&content, |caps: &Captures<'_>| {
            if caps[1].trim() != class {
                patch.service_typed = true;
            }
            format!("extends BaseService<{class}>")
        });
        let typed = typed.into_owned();
        let untyped = UNTYPED_SERVICE_RE.replace_all(&typed, |_: &Captures<'_>| {
            patch.service_typed = true;
            format!("extends BaseService<{class}> {{")
        });
        content = untyped.into_owned();
    }

    let mut fixed = 0;
    let options = MODEL_OPTION_RE.replace_all(&content, |_: &Captures<'_>| {
        fixed += 1;
        format!("model: {class},")
    });
    patch.content = options.into_owned();
    patch.model_options_fixed = fixed;
    patch
}

/// Reads, repairs and (unless `dry_run`) rewrites a service or UI file.
///
/// Files whose name ends in `service.ts` are treated as services.
pub fn repair_references_file(path: &Path, class: &str, dry_run: bool) -> Result<ReferencePatch> {
    let source = fs::read_to_string(path)?;
    let is_service = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().to_lowercase().ends_with("service.ts"));
    let patch = repair_model_references(&source, class, is_service);
    if patch.is_changed() && !dry_run {
        fs::write(path, &patch.content)?;
        debug!(path = %path.display(), class, "Repaired model references");
    }
    Ok(patch)
}
