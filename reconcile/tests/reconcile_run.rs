//! End-to-end runs over a temporary frontend tree.

use std::fs;
use std::path::{Path, PathBuf};

use formsync_core::ScreenContext;
use formsync_extract::{ExtractError, FormExtractor};
use formsync_reconcile::{
    ArtifactStatus, LookupStrategy, MatchTier, ReconcileError, Reconciler, load_metadata,
};
use tempfile::TempDir;

const FORM_HTML: &str = r##"<html><body>
<form id="frmConta" model-name="Erp.Crm.Conta">
  <ul class="nav nav-tabs" id="frmContaTab">
    <li><a href="#tabDados">Dados Gerais</a></li>
    <li onclick="carregarAcaoGrid('tblContatos')"><a href="#tabContatos">Contatos: 2</a></li>
  </ul>
  <div class="tab-content">
    <div class="tab-pane" id="tabDados">
      <div class="form-group"><label>Razão Social</label><input type="text" name="RazaoSocial" maxlength="150" data-obrigatorio="true"></div>
      <div class="form-group"><label>E-mail</label><input type="text" name="Email"></div>
      <div class="form-group"><label>Cliente</label><select class="select2" name="ClienteId"></select></div>
    </div>
    <div class="tab-pane" id="tabContatos">
      <div class="form-group"><label>Nome do Contato</label><input type="text" name="ContatoNome"></div>
      <div class="form-group"><label>Telefone</label><input type="text" name="Telefone"></div>
    </div>
  </div>
</form>
</body></html>
"##;

const LISTING_HTML: &str = r##"<script>
jQuery("#tblContas").kendoGrid({"columns":[{"field":"AcaoBtn","title":" "},{"field":"RazaoSocial","title":"Razão Social"},{"field":"Email","title":"E-mail"},{"field":"ValorLimite","title":"Valor Limite"}]});
</script>"##;

const PRIMARY_MODEL: &str = "import { Mapper } from '@/common/core/models/base';
import type { AnyObject } from '@/common/core/types/any-object';

export class Conta extends Mapper {
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

const CONTACT_MODEL: &str = "import { Mapper } from '@/common/core/models/base';
import type { AnyObject } from '@/common/core/types/any-object';

export class ContaContato extends Mapper {
  constructor(json?: AnyObject) {
    super();
    this.map(json);
  }
}
";

const PRIMARY_UI: &str = r#"import { Forms } from '@/common/components/forms';

export const Index = () => {
  const { t } = useTranslation('crm');
  const form = useForm({ model: , service: ContaService });
  return (
    <Forms.Header>
      <Form.Input label={t('razaoSocial')} {...register("razaoSocial")} />
    </Forms.Header>
  );
};
"#;

const CONTACT_UI: &str = r#"import { Forms } from '@/common/components/forms';

export const Contatos = () => {
  const { t } = useTranslation('crm');
  return (
    <Forms.Detail>
    </Forms.Detail>
  );
};
"#;

const SERVICE: &str = "export class ContaService extends BaseService {
  constructor() {
    super({ model: new Placeholder(), url: 'contas' });
  }
}
";

const GRID: &str = r#"export const ContasGrid = () => {
  const { t } = useTranslation('crm');
  return (
    <Grid
      modelName="Conta"
      columns={[
        { label: t('razaoSocial'), field: 'razaoSocial', type: 'string', width: 150 },
      ]}
    />
  );
};
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let workspace = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        workspace.write("capture/form/contas.html", FORM_HTML);
        workspace.write("capture/lista/contas.html", LISTING_HTML);
        workspace.write("front/src/common/core/models/crm/conta.ts", PRIMARY_MODEL);
        workspace.write("front/src/common/core/models/crm/conta-contato.ts", CONTACT_MODEL);
        workspace.write("front/src/@crm/pages/contas/form/tabs/index.tsx", PRIMARY_UI);
        workspace.write("front/src/@crm/pages/contas/form/tabs/contatos/index.tsx", CONTACT_UI);
        workspace.write("front/src/@crm/services/contas/conta.service.ts", SERVICE);
        workspace.write("front/src/common/core/grids/crm/contas.tsx", GRID);
        workspace
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }

    fn config(&self, extra: &str) -> PathBuf {
        let yaml = format!(
            "screen:
  modulo: CRM
  tela: Contas
  menuPai: Movimento
paths:
  frontSrc: front/src
  formHtmlDir: capture/form
  listingHtmlDir: capture/lista
  metadataOut: out
reconcile:
  allowGridReplacement: true
{extra}"
        );
        let path = self.root().join("formsync.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }
}

#[test]
fn test_full_run_patches_every_artifact() {
    let ws = Workspace::new();
    let reconciler = Reconciler::from_config_file(ws.config("")).unwrap();
    let report = reconciler.run().unwrap();

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.tabs.len(), 2);
    assert!(matches!(
        report.tabs[0].model,
        ArtifactStatus::Found {
            tier: MatchTier::Directory,
            ..
        }
    ));

    let metadata = ws.root().join("out/CRM/Movimento/Contas_metadata.json");
    assert_eq!(report.metadata_path.as_deref(), metadata.to_str());
    assert!(load_metadata(&metadata).is_ok());

    let model = ws.read("front/src/common/core/models/crm/conta.ts");
    assert!(model.contains("  email?: string;\n  cliente?: select2;\n\n  constructor("));
    assert!(model.contains("    'cliente.id': 'ClienteId',"));
    assert!(model.contains("    'cliente.name': 'ClienteNome',"));
    assert!(model.starts_with("import type { select2 } from '@/common/core/types/select2';"));

    let contact_model = ws.read("front/src/common/core/models/crm/conta-contato.ts");
    assert!(contact_model.contains("  fieldMappingKeys = {\n    contatoNome: 'ContatoNome',\n    telefone: 'Telefone',\n  };"));

    let ui = ws.read("front/src/@crm/pages/contas/form/tabs/index.tsx");
    assert!(ui.contains(r#"{...register("email")}"#));
    let select = ui.find(r#"{...register("clienteId")}"#).unwrap();
    let wrapper = ui.find("</Forms.Header>").unwrap();
    assert!(select < wrapper);
    assert!(ui.contains("useForm({ model: Conta, service"));

    let contact_ui = ws.read("front/src/@crm/pages/contas/form/tabs/contatos/index.tsx");
    assert!(contact_ui.contains("<DataGrids.Main"));
    assert!(contact_ui.contains("{ field: 'contatoNome', title: t('nomeDoContato') },"));
    assert!(!contact_ui.contains("Forms.Detail"));
    assert!(report.tabs[1].ui_patch.as_ref().unwrap().grid_injected);

    let service = ws.read("front/src/@crm/services/contas/conta.service.ts");
    assert!(service.contains("extends BaseService<Conta> {"));
    assert!(service.contains("super({ model: Conta, url"));

    let grid = ws.read("front/src/common/core/grids/crm/contas.tsx");
    assert!(grid.contains("field: 'email', type: 'string'"));
    assert!(grid.contains("field: 'ValorLimite', type: 'decimal'"));
    assert_eq!(grid.matches("field: 'razaoSocial'").count(), 1);
}

#[test]
fn test_second_run_changes_nothing() {
    let ws = Workspace::new();
    let reconciler = Reconciler::from_config_file(ws.config("")).unwrap();
    let first = reconciler.run().unwrap();
    assert!(first.changed_files() > 0);

    let snapshot = [
        ws.read("front/src/common/core/models/crm/conta.ts"),
        ws.read("front/src/@crm/pages/contas/form/tabs/index.tsx"),
        ws.read("front/src/@crm/pages/contas/form/tabs/contatos/index.tsx"),
        ws.read("front/src/common/core/grids/crm/contas.tsx"),
    ];
    let second = reconciler.run().unwrap();
    assert_eq!(second.changed_files(), 0, "{:?}", second.summary_lines());
    assert!(second.warnings.is_empty(), "{:?}", second.warnings);
    assert_eq!(ws.read("front/src/common/core/models/crm/conta.ts"), snapshot[0]);
    assert_eq!(ws.read("front/src/@crm/pages/contas/form/tabs/index.tsx"), snapshot[1]);
    assert_eq!(ws.read("front/src/@crm/pages/contas/form/tabs/contatos/index.tsx"), snapshot[2]);
    assert_eq!(ws.read("front/src/common/core/grids/crm/contas.tsx"), snapshot[3]);
}

#[test]
fn test_dry_run_writes_nothing() {
    let ws = Workspace::new();
    let reconciler = Reconciler::from_config_file(ws.config("  dryRun: true\n")).unwrap();
    let report = reconciler.run().unwrap();

    assert!(report.dry_run);
    assert!(report.changed_files() > 0);
    assert!(report.metadata_path.is_none());
    assert!(!ws.root().join("out").exists());
    assert_eq!(ws.read("front/src/common/core/models/crm/conta.ts"), PRIMARY_MODEL);
    assert_eq!(ws.read("front/src/@crm/services/contas/conta.service.ts"), SERVICE);
    assert_eq!(ws.read("front/src/common/core/grids/crm/contas.tsx"), GRID);
}

#[test]
fn test_missing_artifacts_are_reported_not_fatal() {
    let ws = Workspace::new();
    fs::remove_file(ws.root().join("front/src/common/core/models/crm/conta-contato.ts")).unwrap();
    let report = Reconciler::from_config_file(ws.config("")).unwrap().run().unwrap();

    assert!(matches!(report.tabs[1].model, ArtifactStatus::NotFound { .. }));
    assert!(report.warnings.iter().any(|w| w == "Contatos: model not found"));
    assert!(report.needs_attention());
}

#[test]
fn test_materializes_missing_model() {
    let ws = Workspace::new();
    fs::remove_file(ws.root().join("front/src/common/core/models/crm/conta-contato.ts")).unwrap();
    let config = ws.config("  materializeSkeletons: true\n");
    let report = Reconciler::from_config_file(config).unwrap().run().unwrap();

    assert!(matches!(report.tabs[1].model, ArtifactStatus::Materialized { .. }));
    let model = ws.read("front/src/common/core/models/crm/conta-contato.ts");
    assert!(model.contains("export class ContaContato extends Mapper {"));
    assert!(model.contains("  telefone?: string;"));
}

#[test]
fn test_generation_log_strategy_requires_log() {
    let ws = Workspace::new();
    let mut reconciler = Reconciler::from_config_file(ws.config("")).unwrap();
    reconciler.config_mut().reconcile.lookup = LookupStrategy::GenerationLog;
    reconciler.config_mut().paths.generation_log = Some(ws.root().join("missing.json"));

    let err = reconciler.run().unwrap_err();
    assert!(matches!(err, ReconcileError::SourceNotFound(_)));
}

#[test]
fn test_generation_log_lookup_uses_logged_paths() {
    let ws = Workspace::new();
    ws.write(
        "front/src/common/core/models/crm/legacy/conta.ts",
        &PRIMARY_MODEL.replace("class Conta ", "class ContaLegada "),
    );
    ws.write(
        "log.json",
        r#"["common/core/models/crm/legacy/conta.ts", "@crm/pages/contas/form/tabs/index.tsx"]"#,
    );
    let mut reconciler = Reconciler::from_config_file(ws.config("")).unwrap();
    reconciler.config_mut().reconcile.lookup = LookupStrategy::GenerationLog;
    reconciler.config_mut().paths.generation_log = Some(ws.root().join("log.json"));

    let report = reconciler.run().unwrap();
    assert!(matches!(
        report.tabs[0].model,
        ArtifactStatus::Found {
            tier: MatchTier::LogExact,
            ..
        }
    ));
    assert!(ws.read("front/src/common/core/models/crm/legacy/conta.ts").contains("email?: string;"));
    assert_eq!(ws.read("front/src/common/core/models/crm/conta.ts"), PRIMARY_MODEL);
    assert!(matches!(report.tabs[1].model, ArtifactStatus::NotFound { .. }));
}

#[test]
fn test_missing_capture_is_fatal() {
    let ws = Workspace::new();
    fs::remove_file(ws.root().join("capture/form/contas.html")).unwrap();
    let err = Reconciler::from_config_file(ws.config("")).unwrap().run().unwrap_err();
    assert!(matches!(err, ReconcileError::SourceNotFound(_)));
}

#[test]
fn test_invalid_metadata_rejected() {
    let ws = Workspace::new();
    ws.write(
        "meta.json",
        r#"{"module":"CRM","menu":"Movimento","screen":"Contas","modelName":"Conta","tabs":[]}"#,
    );
    let err = load_metadata(&ws.root().join("meta.json")).unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidMetadata(_)));
}

#[test]
fn test_persisted_metadata_loads_back() {
    let ws = Workspace::new();
    let reconciler = Reconciler::from_config_file(ws.config("")).unwrap();
    let report = reconciler.run().unwrap();

    let path = PathBuf::from(report.metadata_path.expect("metadata written"));
    assert!(path.ends_with("CRM/Movimento/Contas_metadata.json"));
    let metadata = load_metadata(&path).unwrap();
    assert_eq!(metadata.menu, "Movimento");

    let columns = reconciler.listing_columns().unwrap();
    let again = reconciler.reconcile(&metadata, &columns).unwrap();
    assert_eq!(again.changed_files(), 0);
}

#[test]
fn test_metadata_without_menu_is_never_written() {
    let ws = Workspace::new();
    let html = fs::read_to_string(ws.root().join("capture/form/contas.html")).unwrap();
    let ctx = ScreenContext::new("CRM", "", "Contas");

    let err = FormExtractor::default().extract(&ctx, &html).unwrap_err();
    assert!(matches!(err, ExtractError::IncompleteContext(_)));

    let mut config = Reconciler::from_config_file(ws.config("")).unwrap().config().clone();
    config.screen.menu.clear();
    let err = Reconciler::new(config).run().unwrap_err();
    assert!(matches!(err, ReconcileError::Extract(ExtractError::IncompleteContext(_))));
    assert!(!ws.root().join("out").exists());
}

#[test]
fn test_grid_tab_without_replacement_is_reported() {
    let ws = Workspace::new();
    let mut config = Reconciler::from_config_file(ws.config("")).unwrap().config().clone();
    config.reconcile.allow_grid_replacement = false;

    let report = Reconciler::new(config).run().unwrap();
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w == "Contatos component: grid skipped, grid replacement not enabled"),
        "{:?}",
        report.warnings
    );
}
