//! Metadata validation.
//!
//! Checks the structural invariants extraction promises before a metadata
//! tree loaded from disk is trusted by the reconciler.
//!
//! # Examples
//!
//! ```
//! use formsync_core::*;
//!
//! let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
//! let mut screen = ScreenMetadata::new(&ctx, "Conta");
//! screen.tabs.push(TabMetadata::synthetic().with_field(FieldMetadata::new("Email", "text")));
//! assert!(validate_metadata(&screen).is_empty());
//!
//! // A field that should have been skipped during extraction
//! screen.tabs[0].fields.push(FieldMetadata::new("Token", "hidden"));
//! assert!(!validate_metadata(&screen).is_empty());
//! ```

use thiserror::Error;

use crate::ScreenMetadata;

/// Metadata validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("screen has no tabs")]
    EmptyTabs,
    #[error("screen identity is incomplete: {0} is empty")]
    EmptyContext(&'static str),
    /// Tab name is empty or whitespace-only.
    #[error("tab #{0} has an empty name")]
    EmptyTabName(usize),
    #[error("tab '{0}' contains a field with an empty key")]
    EmptyFieldKey(String),
    /// The legacy template emitted the literal string `undefined` as a name.
    #[error("tab '{tab}' contains placeholder field key '{key}'")]
    PlaceholderFieldKey { tab: String, key: String },
    #[error("tab '{tab}' contains hidden field '{key}'")]
    HiddenFieldType { tab: String, key: String },
}

/// Validates a screen metadata tree.
///
/// Returns every violation found, in tab order.
pub fn validate_metadata(screen: &ScreenMetadata) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(
        screen
            .context()
            .empty_parts()
            .into_iter()
            .map(ValidationError::EmptyContext),
    );

    if screen.tabs.is_empty() {
        errors.push(ValidationError::EmptyTabs);
        return errors;
    }

    for (index, tab) in screen.tabs.iter().enumerate() {
        if tab.name.trim().is_empty() {
            errors.push(ValidationError::EmptyTabName(index));
        }
        for field in &tab.fields {
            if field.key.trim().is_empty() {
                errors.push(ValidationError::EmptyFieldKey(tab.name.clone()));
            } else if field.key == "undefined" {
                errors.push(ValidationError::PlaceholderFieldKey {
                    tab: tab.name.clone(),
                    key: field.key.clone(),
                });
            }
            if field.field_type.eq_ignore_ascii_case("hidden") {
                errors.push(ValidationError::HiddenFieldType {
                    tab: tab.name.clone(),
                    key: field.key.clone(),
                });
            }
        }
    }

    errors
}
