//! Minimal sources written when a model or component was never generated.
//!
//! Skeletons carry the placeholders the patchers fill, so a materialized
//! file goes through the same reconciliation as a generated one.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::case::pascal_case;
use crate::error::{ReconcileError, Result};
use crate::model::{MAPPINGS_PLACEHOLDER, ModelConventions, PROPS_PLACEHOLDER};
use crate::ui::FIELDS_PLACEHOLDER;

/// Class name for a model materialized at `path`: the Pascal form of the
/// file stem.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use formsync_reconcile::skeleton_class_name;
///
/// assert_eq!(skeleton_class_name(Path::new("models/crm/conta-contato.ts")).as_deref(), Some("ContaContato"));
/// assert_eq!(skeleton_class_name(Path::new("ContaModelo.ts")).as_deref(), Some("ContaModelo"));
/// ```
pub fn skeleton_class_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let class = pascal_case(&stem);
    (!class.is_empty()).then_some(class)
}

pub fn model_skeleton(class: &str, conventions: &ModelConventions) -> String {
    format!(
        "{base_import}
import type {{ AnyObject }} from '@/common/core/types/any-object';
{relation_import}

export class {class} extends {base} {{
  fieldMappingKeys = {{
    {MAPPINGS_PLACEHOLDER}
  }};

  {PROPS_PLACEHOLDER}

  constructor(json?: AnyObject) {{
    super();
    this.map(json);
  }}
}}
",
        base_import = conventions.base_import,
        relation_import = conventions.relation_import,
        base = conventions.base_class,
    )
}

pub fn ui_skeleton(translation_namespace: &str) -> String {
    format!(
        "import {{ Forms }} from '@/common/components/forms';
import {{ useTranslation }} from 'react-i18next';

export const Index = () => {{
    const {{ t }} = useTranslation('{translation_namespace}');
    return (
        <Forms.Simple>
            {FIELDS_PLACEHOLDER}
        </Forms.Simple>
    );
}};
export default Index;
"
    )
}

/// Writes `content` to `path`, creating parent directories.
///
/// Never overwrites: an existing file is an [`ReconcileError::InvalidConfig`]
/// since the caller only materializes paths lookup reported as missing.
pub fn materialize(path: &Path, content: &str, dry_run: bool) -> Result<()> {
    if path.exists() {
        return Err(ReconcileError::InvalidConfig(format!(
            "refusing to overwrite '{}' with a skeleton",
            path.display()
        )));
    }
    if dry_run {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    info!(path = %path.display(), "Materialized skeleton");
    Ok(())
}
