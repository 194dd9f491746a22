use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use formsync_core::{ArtifactKind, ScreenContext, validate_metadata};
use formsync_extract::output::{OutputFormat, format_columns, format_metadata, format_report};
use formsync_extract::{
    ExtractorConfig, FormExtractor, extract_columns_with_source, find_capture, read_metadata, write_metadata,
};
use formsync_reconcile::{LookupStrategy, NameContext, NamingRules, Reconciler, TabRef, load_metadata};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI-specific artifact kind with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliArtifactKind {
    Model,
    UiComponent,
    Service,
    ListingGrid,
}

impl From<CliArtifactKind> for ArtifactKind {
    fn from(kind: CliArtifactKind) -> Self {
        match kind {
            CliArtifactKind::Model => Self::Model,
            CliArtifactKind::UiComponent => Self::UiComponent,
            CliArtifactKind::Service => Self::Service,
            CliArtifactKind::ListingGrid => Self::ListingGrid,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "formsync")]
#[command(version = PACKAGE_VERSION)]
#[command(about = "Extract legacy form metadata and reconcile generated frontend sources")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract screen metadata from a captured form page.
    Extract(ExtractArgs),
    /// Extract listing grid columns from a captured listing page.
    Columns(ColumnsArgs),
    /// Print the ordered candidate paths for a generated artifact.
    Candidates(CandidatesArgs),
    /// Patch generated models, components, services and grids for a screen.
    Reconcile(ReconcileArgs),
    /// Validate one or more metadata JSON files.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct ScreenArgs {
    /// Business module (e.g. CRM).
    #[arg(long)]
    module: String,
    /// Parent menu of the screen.
    #[arg(long)]
    menu: String,
    /// Screen name as shown in the legacy menu.
    #[arg(long)]
    screen: String,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Captured HTML file, or a directory whose first .html file is used.
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    screen: ScreenArgs,
    /// Write the metadata JSON under this root as {module}/{menu}/{screen}_metadata.json.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print the extraction report instead of the metadata.
    #[arg(long)]
    with_report: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ColumnsArgs {
    /// Captured listing HTML file or directory. Absent input yields no columns.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct CandidatesArgs {
    #[arg(long)]
    kind: CliArtifactKind,
    #[arg(long)]
    module: String,
    #[arg(long)]
    screen: String,
    /// URL keyword the screen was generated under.
    #[arg(long)]
    keyword: Option<String>,
    /// Display name of the screen's first tab.
    #[arg(long)]
    first_tab: Option<String>,
    /// Tab the artifact belongs to.
    #[arg(long)]
    tab: Option<String>,
    /// Position of --tab in the tab strip; 0 is the primary tab.
    #[arg(long, default_value_t = 0)]
    tab_index: usize,
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    /// Path to the screen's formsync.yaml (or .json).
    #[arg(long)]
    config: PathBuf,
    /// Reconcile against an existing metadata JSON instead of extracting.
    #[arg(long)]
    metadata: Option<PathBuf>,
    /// Compute every patch without writing files.
    #[arg(long)]
    dry_run: bool,
    /// Allow replacing a grid tab's form with a data grid.
    #[arg(long)]
    allow_grid_replacement: bool,
    /// Write skeletons for models and components that were never generated.
    #[arg(long)]
    materialize_skeletons: bool,
    /// Override the configured lookup strategy.
    #[arg(long)]
    lookup: Option<LookupStrategy>,
    /// Write the JSON report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print the JSON report instead of the summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Metadata JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::Columns(args) => run_columns(args),
        Command::Candidates(args) => run_candidates(args),
        Command::Reconcile(args) => run_reconcile(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_extract(args: ExtractArgs) -> Result<(), String> {
    let page = resolve_capture(&args.input)?;
    let html = fs::read_to_string(&page)
        .map_err(|err| format!("Failed to read '{}': {err}", page.display()))?;

    let context = ScreenContext::new(&args.screen.module, &args.screen.menu, &args.screen.screen);
    let run = FormExtractor::new(ExtractorConfig::default())
        .extract(&context, &html)
        .map_err(|err| err.to_string())?;

    if let Some(root) = &args.output {
        let path = write_metadata(root, &run.metadata).map_err(|err| err.to_string())?;
        eprintln!("Wrote {}", path.display());
    }

    let rendered = if args.with_report {
        format_report(&run.report, args.format)?
    } else {
        format_metadata(&run.metadata, args.format)?
    };
    println!("{rendered}");
    Ok(())
}

fn run_columns(args: ColumnsArgs) -> Result<(), String> {
    let html = match &args.input {
        Some(input) => {
            let page = resolve_capture(input)?;
            Some(
                fs::read_to_string(&page)
                    .map_err(|err| format!("Failed to read '{}': {err}", page.display()))?,
            )
        }
        None => None,
    };

    let columns = match extract_columns_with_source(html.as_deref()) {
        Some((columns, source)) => {
            debug!(source = %source, columns = columns.len(), "Extracted listing columns");
            columns
        }
        None => Vec::new(),
    };
    println!("{}", format_columns(&columns, args.format)?);
    Ok(())
}

fn run_candidates(args: CandidatesArgs) -> Result<(), String> {
    let mut ctx = NameContext::new(&args.screen, &args.module).with_keyword(args.keyword);
    if let Some(first) = args.first_tab {
        ctx = ctx.with_first_tab(first);
    }
    let tab = args.tab.as_deref().map(|name| TabRef::new(name, args.tab_index));

    let rules = NamingRules::default();
    for candidate in rules.candidates(args.kind.into(), &ctx, tab) {
        println!("{candidate}");
    }
    Ok(())
}

fn run_reconcile(args: ReconcileArgs) -> Result<(), String> {
    let mut reconciler = Reconciler::from_config_file(&args.config).map_err(|err| err.to_string())?;
    {
        let options = &mut reconciler.config_mut().reconcile;
        options.dry_run |= args.dry_run;
        options.allow_grid_replacement |= args.allow_grid_replacement;
        options.materialize_skeletons |= args.materialize_skeletons;
        if let Some(lookup) = args.lookup {
            options.lookup = lookup;
        }
    }

    let report = match &args.metadata {
        Some(path) => {
            let metadata = load_metadata(path).map_err(|err| err.to_string())?;
            let columns = reconciler.listing_columns().map_err(|err| err.to_string())?;
            reconciler.reconcile(&metadata, &columns)
        }
        None => reconciler.run(),
    }
    .map_err(|err| err.to_string())?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("Failed to serialize report: {err}"))?;
    if let Some(path) = &args.report {
        fs::write(path, &json).map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
    }

    if args.json {
        println!("{json}");
    } else {
        for line in report.summary_lines() {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut invalid = 0usize;
    for path in &args.inputs {
        let metadata = match read_metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                println!("FAIL {}: {err}", path.display());
                invalid += 1;
                continue;
            }
        };
        let errors = validate_metadata(&metadata);
        if errors.is_empty() {
            println!("OK   {} ({} tabs, {} fields)", path.display(), metadata.tabs.len(), metadata.field_count());
        } else {
            invalid += 1;
            for error in errors {
                println!("FAIL {}: {error}", path.display());
            }
        }
    }

    if invalid > 0 {
        return Err(format!("{invalid} of {} metadata files failed validation", args.inputs.len()));
    }
    Ok(())
}

fn resolve_capture(input: &Path) -> Result<PathBuf, String> {
    if input.is_dir() {
        find_capture(input, None).map_err(|err| err.to_string())
    } else if input.is_file() {
        Ok(input.to_path_buf())
    } else {
        Err(format!("source not found: '{}' does not exist", input.display()))
    }
}
