//! Locating captured pages and persisting extracted metadata.
//!
//! The capture step drops one HTML file per page into a directory. The
//! extractor takes the first `.html` file in name order, so repeated runs
//! over the same directory read the same page.

use std::fs;
use std::path::{Path, PathBuf};

use formsync_core::{ScreenContext, ScreenMetadata};
use tracing::{debug, info};

use crate::error::ExtractError;

/// Finds the captured page in `dir`.
///
/// With a `prefix`, only files whose name starts with it are considered.
///
/// # Errors
///
/// Returns [`ExtractError::SourceNotFound`] when the directory does not
/// exist or holds no matching `.html` file.
pub fn find_capture(dir: &Path, prefix: Option<&str>) -> Result<PathBuf, ExtractError> {
    if !dir.is_dir() {
        return Err(ExtractError::SourceNotFound(format!(
            "capture directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut pages: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_html(path))
        .filter(|path| {
            prefix.is_none_or(|prefix| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(prefix))
            })
        })
        .collect();
    pages.sort();

    let page = pages.into_iter().next().ok_or_else(|| {
        ExtractError::SourceNotFound(format!("no captured HTML in '{}'", dir.display()))
    })?;
    debug!(path = %page.display(), "Selected captured page");
    Ok(page)
}

/// Reads the captured page in `dir`, if the directory has one.
///
/// Used for optional inputs such as the listing page, where absence is not
/// an error.
pub fn read_optional_capture(dir: Option<&Path>) -> Result<Option<String>, ExtractError> {
    let Some(dir) = dir else {
        return Ok(None);
    };
    match find_capture(dir, None) {
        Ok(path) => Ok(Some(fs::read_to_string(path)?)),
        Err(ExtractError::SourceNotFound(reason)) => {
            debug!(reason = %reason, "Optional capture not available");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Path the metadata JSON for a screen is written to:
/// `{root}/{module}/{menu}/{screen}_metadata.json`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use formsync_core::ScreenContext;
/// use formsync_extract::metadata_output_path;
///
/// let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
/// let path = metadata_output_path(Path::new("out"), &ctx);
/// assert_eq!(path, Path::new("out/CRM/Movimento/Contas_metadata.json"));
/// ```
pub fn metadata_output_path(root: &Path, context: &ScreenContext) -> PathBuf {
    root.join(&context.module)
        .join(&context.menu)
        .join(format!("{}_metadata.json", context.screen))
}

/// Writes metadata as pretty JSON to its predictable path under `root`.
///
/// # Errors
///
/// [`ExtractError::IncompleteContext`] when module, menu or screen is empty;
/// the path is keyed on all three.
pub fn write_metadata(root: &Path, metadata: &ScreenMetadata) -> Result<PathBuf, ExtractError> {
    let context = metadata.context();
    let empty = context.empty_parts();
    if !empty.is_empty() {
        return Err(ExtractError::IncompleteContext(format!("{} is empty", empty.join(", "))));
    }
    let path = metadata_output_path(root, &context);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json)?;
    info!(path = %path.display(), "Wrote screen metadata");
    Ok(path)
}

/// Reads a metadata JSON file written by [`write_metadata`].
pub fn read_metadata(path: &Path) -> Result<ScreenMetadata, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::SourceNotFound(format!(
            "metadata file '{}' does not exist",
            path.display()
        )));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}
