use chrono::Local;
use clap::{Parser, Subcommand};
use logseq_notion::locate::{self, Export, LocateError};
use logseq_notion::pipeline::{self, RunSummary, Variant};
use logseq_notion::{config, output};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Shared flags for commands that convert.
#[derive(clap::Args, Clone)]
struct BatchArgs {
    /// Convert every export under --source; a failing export does not stop the batch
    #[arg(long)]
    all: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "logseq-notion")]
#[command(about = "Convert an outliner graph export into an importable page tree")]
#[command(long_about = "\
Convert an outliner graph export into an importable page tree

Every page and journal gets a sanitized output filename, and every [[link]]
is rewritten to point at it. Tasks, properties, block references, queries
and asset images are normalized along the way.

Source layout:

  logseq-export/
  ├── config.toml                  # Base config (optional)
  ├── work-notes/                  # One export
  │   ├── config.toml              # Export config (overrides base)
  │   ├── pages/
  │   │   ├── contents.md          # Folded into the database landing page
  │   │   └── Project A.md
  │   ├── journals/
  │   │   └── 2025_01_01.md        # Titled 2025年01月01日 (zh) or 2025-01-01 (en)
  │   └── assets/
  └── personal/

Output (per run):

  convert   notion-import/<export>-<timestamp>/notion-output/
  database  notion-import/<export>-team-<timestamp>/notion-import/

Set RUST_LOG to change log verbosity (default: info).
Run 'logseq-notion gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding the export, or several exports
    #[arg(long, default_value = "logseq-export", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "notion-import", global = true)]
    output: PathBuf,

    /// Name of the export under --source
    #[arg(short = 's', long = "export", global = true)]
    export: Option<String>,

    /// Append a random identifier to every output filename
    #[arg(long, global = true)]
    with_ids: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the exports under --source
    List,
    /// Write one markdown file per page and journal
    Convert(BatchArgs),
    /// Write pages into a database with CSV views and a landing page
    Database {
        #[command(flatten)]
        batch: BatchArgs,
        /// Team name, used for the landing page and database names
        #[arg(short = 't', long)]
        team_name: Option<String>,
    },
    /// Resolve every link without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::List => {
            output::print_export_list(&cli.source, &locate::list_exports(&cli.source));
        }
        Command::Convert(batch) => convert(&cli, batch.all, Variant::Pages)?,
        Command::Database { batch, team_name } => convert(
            &cli,
            batch.all,
            Variant::Database {
                team_name: team_name.clone(),
            },
        )?,
        Command::Check => {
            let export = locate::locate(&cli.source, cli.export.as_deref())?;
            let config = config::load_config(&cli.source, &export.root)?;
            init_thread_pool(&config.processing);
            println!("==> Checking {}", export.root.display());
            let report = pipeline::check(&export, &config)?;
            output::print_check(&report);
            if !report.is_clean() {
                return Err(format!(
                    "{} unresolved links, {} unreadable files",
                    report.unresolved.len(),
                    report.unreadable.len()
                )
                .into());
            }
            println!("==> All links resolve");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn convert(cli: &Cli, all: bool, variant: Variant) -> Result<(), Box<dyn std::error::Error>> {
    if !all {
        let export = locate::locate(&cli.source, cli.export.as_deref())?;
        let summary = convert_one(cli, &export, &variant)?;
        output::print_run_summary(&summary);
        return Ok(());
    }

    let names = locate::list_exports(&cli.source);
    if names.is_empty() {
        return Err(LocateError::NoExports(cli.source.clone()).into());
    }
    println!("==> Converting {} exports", names.len());
    let mut failed = 0;
    for name in &names {
        let result = locate::locate(&cli.source, Some(name))
            .map_err(|e| e.to_string())
            .and_then(|export| convert_one(cli, &export, &variant).map_err(|e| e.to_string()));
        if result.is_err() {
            failed += 1;
        }
        println!("{}", output::format_batch_result(name, &result));
    }
    if failed > 0 {
        return Err(format!("{failed} of {} exports failed", names.len()).into());
    }
    Ok(())
}

fn convert_one(
    cli: &Cli,
    export: &Export,
    variant: &Variant,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let mut config = config::load_config(&cli.source, &export.root)?;
    if cli.with_ids {
        config.with_ids = true;
    }
    init_thread_pool(&config.processing);
    let out_dir = pipeline::run_directory(&cli.output, &export.name, variant, Local::now());
    Ok(pipeline::run(export, &out_dir, &config, variant)?)
}

/// Log to stderr so stdout stays readable; `RUST_LOG` overrides the level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
/// Only the first call takes effect.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
