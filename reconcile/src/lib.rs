//! Reconciliation of generated frontend sources with extracted screen
//! metadata.
//!
//! The scaffolding generator produced a model class, a tab component and a
//! service per screen, plus a listing grid, but it routinely missed fields
//! the legacy form has. This crate finds those generated files and patches
//! them in place:
//!
//! - [`ArtifactResolver`] finds each file from a [`GenerationLog`] or by
//!   scanning the [`ProjectLayout`], trying [`NamingRules`] candidates.
//! - [`reconcile_model_source`] declares and maps missing properties.
//! - [`reconcile_ui_source`] injects missing form controls and, when
//!   enabled, swaps a grid tab's form for a data grid.
//! - [`reconcile_listing_source`] adds missing listing columns.
//! - [`repair_model_references`] points services and components at the
//!   model class.
//!
//! [`Reconciler`] runs all of it for one configured screen and returns a
//! [`ReconciliationReport`]. Every patch is idempotent: a second run over
//! its own output changes nothing.
//!
//! # Example
//!
//! ```
//! use formsync_core::{FieldMetadata, TabMetadata};
//! use formsync_reconcile::{UiConventions, UiOptions, reconcile_ui_source};
//!
//! let component = "export const Index = () => (\n  <Forms.Simple>\n  </Forms.Simple>\n);\n";
//! let tab = TabMetadata::new("Dados").with_field(FieldMetadata::new("Email", "text"));
//!
//! let patch = reconcile_ui_source(&tab, component, &UiConventions::default(), UiOptions::default());
//! assert_eq!(patch.fields_injected, vec!["email"]);
//! assert!(patch.content.contains(r#"{...register("email")}"#));
//! ```

pub mod case;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation_log;
pub mod listing;
pub mod mapping;
pub mod model;
pub mod naming;
mod patch;
pub mod references;
pub mod report;
pub mod resolver;
pub mod skeleton;
pub mod ui;

pub use config::{
    Conventions, FormsyncConfig, LookupStrategy, PathsConfig, ProjectLayout, ReconcileOptions, ScreenConfig,
};
pub use engine::{Reconciler, load_metadata};
pub use error::{ReconcileError, Result};
pub use generation_log::{GenerationLog, LogEntry};
pub use listing::{
    ListingPatch, column_type, listing_model_name, locate_listing_model, reconcile_listing_file,
    reconcile_listing_source,
};
pub use mapping::{FieldMapping, MappingBlock, find_mapping_block, parse_field_mappings, parse_mapping_pairs};
pub use model::{ModelConventions, ModelPatch, model_class_name, reconcile_model_file, reconcile_model_source};
pub use naming::{NameContext, NamingRules, TabRef};
pub use patch::{FieldProperty, PatchConflict};
pub use references::{ReferencePatch, repair_model_references, repair_references_file};
pub use report::{ArtifactStatus, ListingReport, ReconciliationReport, ReferenceReport, TabReport};
pub use resolver::{ArtifactResolver, MatchTier, Resolution};
pub use skeleton::{materialize, model_skeleton, skeleton_class_name, ui_skeleton};
pub use ui::{GridSkipReason, UiConventions, UiOptions, UiPatch, reconcile_ui_file, reconcile_ui_source};
