//! Extraction of screen metadata from captured legacy form pages.
//!
//! Two independent extractors live here:
//!
//! - [`FormExtractor`] / [`extract_screen`] read the tab strip and the form
//!   controls of a captured form page into a
//!   [`ScreenMetadata`](formsync_core::ScreenMetadata) tree.
//! - [`extract_columns`] reads the listing grid's columns from its inline
//!   initialization script, or from the rendered header as a fallback.
//!
//! Heuristic fallbacks never fail extraction; they are recorded as
//! [`ParseSignal`]s in an [`ExtractionReport`]. Only an absent or empty
//! capture ([`ExtractError::SourceNotFound`]) or a screen identity with an
//! empty part ([`ExtractError::IncompleteContext`]) is an error.
//!
//! # Example
//!
//! ```
//! use formsync_core::ScreenContext;
//! use formsync_extract::extract_screen;
//!
//! let html = r##"<form model-name="Crm.Conta">
//!   <ul id="frmContaTab"><li><a href="#dados">Dados</a></li></ul>
//!   <div id="dados"><input type="checkbox" name="Vip"></div>
//! </form>"##;
//!
//! let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
//! let screen = extract_screen(&ctx, html).unwrap();
//! assert_eq!(screen.tabs[0].name, "Dados");
//! assert_eq!(screen.tabs[0].fields[0].field_type, "checkbox");
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod form;
pub mod grid;
pub mod output;
pub mod report;

pub use capture::{find_capture, metadata_output_path, read_metadata, read_optional_capture, write_metadata};
pub use config::{ExtractorConfig, MaskHint};
pub use error::ExtractError;
pub use form::{ExtractionRun, FormExtractor, extract_screen, extract_screen_with_report};
pub use grid::{ACTION_COLUMN, ColumnSource, extract_columns, extract_columns_with_source};
pub use report::{ExtractionReport, ParseSignal, SkippedFields};
