use std::fs;
use std::path::PathBuf;

use formsync_core::{ScreenContext, validate_metadata};
use formsync_extract::{
    ColumnSource, ExtractorConfig, FormExtractor, extract_columns, extract_columns_with_source,
    extract_screen,
};

fn ctx() -> ScreenContext {
    ScreenContext::new("CRM", "Movimento", "Contas")
}

#[test]
fn test_contas_fixture_extracts_tabs_in_strip_order() {
    let html = fixture("contas_form.html");
    let screen = extract_screen(&ctx(), &html).expect("fixture should extract");

    let names: Vec<_> = screen.tabs.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Dados Gerais", "Contatos", "Endereços"]);

    let grids: Vec<_> = screen.tabs.iter().map(|t| t.has_grid).collect();
    assert_eq!(grids, vec![false, true, true]);

    assert_eq!(screen.model_name, "ContaModelo");
    assert!(validate_metadata(&screen).is_empty());
}

#[test]
fn test_contas_fixture_field_details() {
    let html = fixture("contas_form.html");
    let screen = extract_screen(&ctx(), &html).expect("fixture should extract");
    let dados = &screen.tabs[0];

    let keys: Vec<_> = dados.fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["RazaoSocial", "Email", "ClienteId", "DataAbertura", "Ativo", "MotivoBloqueio"]
    );

    let razao = dados.find_field("RazaoSocial").unwrap();
    assert_eq!(razao.label, "Razão Social");
    assert!(razao.required);
    assert_eq!(razao.max_length, Some(150));

    let cliente = dados.find_field("ClienteId").unwrap();
    assert_eq!(cliente.field_type, "select");
    assert!(cliente.required);

    assert_eq!(dados.find_field("DataAbertura").unwrap().field_type, "date");
    assert_eq!(dados.find_field("Ativo").unwrap().field_type, "checkbox");

    let motivo = dados.find_field("MotivoBloqueio").unwrap();
    assert_eq!(motivo.field_type, "textarea");
    assert!(motivo.is_hidden);
    assert_eq!(dados.dependencies.len(), 2);

    let contatos = &screen.tabs[1];
    assert_eq!(contatos.fields.len(), 2);
    assert_eq!(contatos.fields[1].field_type, "text");
}

#[test]
fn test_contas_fixture_report_is_clean_except_skips() {
    let html = fixture("contas_form.html");
    let run = FormExtractor::new(ExtractorConfig::default())
        .extract(&ctx(), &html)
        .expect("fixture should extract");

    assert!(run.report.is_clean(), "signals: {:?}", run.report.signals);
    assert_eq!(run.report.tab_strip_selector.as_deref(), Some("#frmContaTab"));
    assert_eq!(run.report.skipped_fields.placeholder, 1);
    assert_eq!(run.report.field_count, 9);
}

#[test]
fn test_listing_fixture_prefers_script_columns() {
    let html = fixture("contas_lista.html");
    let (columns, source) = extract_columns_with_source(Some(&html)).expect("columns expected");
    assert_eq!(source, ColumnSource::Script);

    let fields: Vec<_> = columns.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["RazaoSocial", "Cliente.Nome", "ValorLimite", "DataAbertura"]
    );
    assert_eq!(columns[2].title, "Valor Limite");
}

#[test]
fn test_form_fixture_has_no_grid_columns() {
    let html = fixture("contas_form.html");
    assert!(extract_columns(Some(&html)).is_empty());
}

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture file must be readable")
}
