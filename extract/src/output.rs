//! Output formatting for metadata, columns and reports.

use formsync_core::{GridColumnMetadata, ScreenMetadata};

use crate::report::ExtractionReport;

/// Supported output formats.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

/// Formats screen metadata in the requested output format.
pub fn format_metadata(metadata: &ScreenMetadata, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(metadata)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(metadata).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Ok(metadata_to_table(metadata)),
    }
}

/// Formats grid columns in the requested output format.
pub fn format_columns(columns: &[GridColumnMetadata], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(columns)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(columns).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Ok(columns_to_table(columns)),
    }
}

/// Formats an extraction report in the requested output format.
pub fn format_report(report: &ExtractionReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Ok(report_to_table(report)),
    }
}

fn metadata_to_table(metadata: &ScreenMetadata) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} / {} / {}",
        metadata.module, metadata.menu, metadata.screen
    ));
    if !metadata.model_name.is_empty() {
        out.push_str(&format!("  (model {})", metadata.model_name));
    }
    out.push('\n');

    for tab in &metadata.tabs {
        let grid = if tab.has_grid { " [grid]" } else { "" };
        let id = tab.id.as_deref().unwrap_or("-");
        out.push_str(&format!("\n{} #{id}{grid}\n", tab.name));

        if tab.fields.is_empty() {
            out.push_str("  (no fields)\n");
            continue;
        }

        let key_width = tab
            .fields
            .iter()
            .map(|f| f.key.len())
            .max()
            .unwrap_or(0)
            .max(3);
        for field in &tab.fields {
            let mut flags = Vec::new();
            if field.required {
                flags.push("required".to_string());
            }
            if let Some(max) = field.max_length {
                flags.push(format!("max {max}"));
            }
            if field.is_hidden {
                flags.push("hidden".to_string());
            }
            out.push_str(&format!(
                "  {:<key_width$}  {:<10}  {}",
                field.key, field.field_type, field.label
            ));
            if !flags.is_empty() {
                out.push_str(&format!("  ({})", flags.join(", ")));
            }
            out.push('\n');
        }

        for note in &tab.dependencies {
            out.push_str(&format!("  note: {note}\n"));
        }
    }

    out
}

fn columns_to_table(columns: &[GridColumnMetadata]) -> String {
    if columns.is_empty() {
        return "No grid columns found.\n".to_string();
    }
    let width = columns.iter().map(|c| c.field.len()).max().unwrap_or(0).max(5);
    let mut out = format!("{:<width$}  TITLE\n", "FIELD");
    for column in columns {
        out.push_str(&format!("{:<width$}  {}\n", column.field, column.title));
    }
    out
}

fn report_to_table(report: &ExtractionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Screen:     {} / {}\n", report.module, report.screen));
    out.push_str(&format!(
        "Tab strip:  {}\n",
        report.tab_strip_selector.as_deref().unwrap_or("(synthetic)")
    ));
    out.push_str(&format!("Tabs:       {}\n", report.tab_count));
    out.push_str(&format!("Fields:     {}\n", report.field_count));
    out.push_str(&format!("Skipped:    {}\n", report.skipped_fields.total()));
    if report.signals.is_empty() {
        out.push_str("Signals:    none\n");
    } else {
        out.push_str("Signals:\n");
        for signal in &report.signals {
            out.push_str(&format!("  - {signal}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ParseSignal, SkippedFields};
    use formsync_core::{FieldMetadata, ScreenContext, TabMetadata};

    fn metadata() -> ScreenMetadata {
        let ctx = ScreenContext::new("CRM", "Movimento", "Contas");
        let mut metadata = ScreenMetadata::new(&ctx, "Conta");
        metadata.tabs.push(
            TabMetadata::new("Dados")
                .with_id("tabDados")
                .with_grid()
                .with_field(FieldMetadata::new("Email", "text").required().with_max_length(80)),
        );
        metadata
    }

    #[test]
    fn test_table_lists_fields_with_flags() {
        let out = format_metadata(&metadata(), OutputFormat::Table).unwrap();
        assert!(out.starts_with("CRM / Movimento / Contas  (model Conta)"));
        assert!(out.contains("Dados #tabDados [grid]"));
        assert!(out.contains("(required, max 80)"));
    }

    #[test]
    fn test_json_and_yaml_use_legacy_keys() {
        let json = format_metadata(&metadata(), OutputFormat::Json).unwrap();
        assert!(json.contains("\"hasGrid\": true"));
        let yaml = format_metadata(&metadata(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("modelName: Conta"));
    }

    #[test]
    fn test_columns_table() {
        let columns = vec![GridColumnMetadata::new("Cliente.Nome", "Cliente")];
        let out = format_columns(&columns, OutputFormat::Table).unwrap();
        assert!(out.contains("Cliente.Nome  Cliente"));
        assert_eq!(
            format_columns(&[], OutputFormat::Table).unwrap(),
            "No grid columns found.\n"
        );
    }

    #[test]
    fn test_report_table_lists_signals() {
        let report = ExtractionReport {
            module: "CRM".into(),
            screen: "Contas".into(),
            tab_strip_selector: None,
            tab_count: 1,
            field_count: 3,
            skipped_fields: SkippedFields::default(),
            signals: vec![ParseSignal::NoTabStrip],
        };
        let out = format_report(&report, OutputFormat::Table).unwrap();
        assert!(out.contains("(synthetic)"));
        assert!(out.contains("  - no_tab_strip"));
    }
}
