//! Core metadata types for legacy form reconciliation.
//!
//! This crate defines the data model shared by extraction and reconciliation:
//!
//! - [`ScreenMetadata`]: one captured screen with its tabs, keyed by the
//!   configured module, menu and screen names.
//! - [`TabMetadata`]: a tab with its container id, grid flag, fields and
//!   visibility notes.
//! - [`FieldMetadata`]: one named input with type, label and validation
//!   hints.
//! - [`GridColumnMetadata`]: one column of the legacy listing grid.
//! - [`GeneratedArtifact`] / [`ArtifactKind`]: a generated frontend file the
//!   reconciler located.
//!
//! Validation ([`validate_metadata`]) checks the invariants extraction
//! guarantees, so metadata loaded from disk can be trusted.
//!
//! # Example
//!
//! ```
//! use formsync_core::*;
//!
//! let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
//! let mut screen = ScreenMetadata::new(&ctx, "ContaModelo");
//! screen.tabs.push(
//!     TabMetadata::synthetic()
//!         .with_field(FieldMetadata::new("Email", "text").with_max_length(120))
//!         .with_field(FieldMetadata::new("ClienteId", "select").required()),
//! );
//!
//! assert!(screen.tabs[0].is_synthetic());
//! assert!(validate_metadata(&screen).is_empty());
//! ```

mod types;
mod validate;

pub use types::*;
pub use validate::{ValidationError, validate_metadata};
