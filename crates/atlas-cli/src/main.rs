mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use atlas_core::query::guards::DEFAULT_TOP_FILES;
use atlas_core::query::search::Search;
use atlas_core::query::stats::Stats;
use atlas_core::query::unused::Unused;
use atlas_core::{AtlasError, Indexer, Project, Settings};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::render::{print_tone, Tone};

const LOG_ENV: &str = "ATLAS_LOG";

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Project-scoped codebase indexer", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print search, stats, and unused results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "directory", global = true, default_value = ".")]
    directory: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize atlas in the project directory
    Init,
    /// Index the project
    Index {
        /// Re-index from scratch
        #[arg(short, long)]
        fresh: bool,
    },
    /// Search for symbols by name
    Search {
        /// The symbol to search for
        query: String,

        /// Match any name containing the query, ignoring case
        #[arg(short, long)]
        partial: bool,
    },
    /// Show index location, last run, and pending changes
    Status,
    /// Show codebase statistics
    Stats {
        /// Number of top files to show
        #[arg(short, long, default_value_t = DEFAULT_TOP_FILES)]
        limit: usize,
    },
    /// Find potentially unused symbols
    Unused,
    /// Show current version
    Version,
    /// Update atlas to the latest version
    Upgrade,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let shown = if let Some(AtlasError::NotInitialized(_)) = err.downcast_ref::<AtlasError>() {
                print_tone(Tone::Warning, "atlas not initialized. Run 'atlas init'")
            } else {
                print_tone(Tone::Error, &format!("error: {err:#}"))
            };
            if shown.is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let dir = cli.directory.as_path();
    let json = cli.json;
    match cli.command {
        Commands::Init => {
            let project = Project::init(dir).context("Failed to initialize")?;
            print_tone(
                Tone::Success,
                &format!("Initialized atlas in {}", project.root().display()),
            )?;
        }
        Commands::Index { fresh } => {
            let project = Project::load(dir)?;
            let mut indexer = Indexer::open(&project, &Settings::from_env())?;
            let symbols = indexer.run(fresh).context("Indexing failed")?;
            print!("{}", render::index_summary(&symbols));
        }
        Commands::Search { query, partial } => {
            let results = Search::open(&Project::load(dir)?)?
                .find(&query, partial)
                .context("Search failed")?;
            if json {
                print!("{}", render::json(&results)?);
            } else if results.is_empty() {
                print_tone(Tone::Warning, &format!("No results found for {query}"))?;
            } else {
                print!("{}", render::search_results(&query, &results));
            }
        }
        Commands::Status => status(dir)?,
        Commands::Stats { limit } => {
            let stats = Stats::open(&Project::load(dir)?)?
                .generate(limit)
                .context("Failed to compute stats")?;
            if json {
                print!("{}", render::json(&stats)?);
            } else {
                print!("{}", render::codebase_stats(&stats));
            }
        }
        Commands::Unused => {
            let unused = Unused::open(&Project::load(dir)?)?
                .find()
                .context("Analysis failed")?;
            if json {
                print!("{}", render::json(&unused)?);
            } else {
                print!("{}", render::unused_symbols(&unused));
            }
        }
        Commands::Version => println!("atlas version {}", env!("CARGO_PKG_VERSION")),
        Commands::Upgrade => {
            print_tone(
                Tone::Warning,
                &format!(
                    "atlas {} was built from source; self-update is not available. \
                     Rebuild from the latest sources to upgrade.",
                    env!("CARGO_PKG_VERSION")
                ),
            )?;
        }
    }
    Ok(())
}

fn status(dir: &Path) -> Result<()> {
    let project = Project::load(dir)?;
    let indexer = Indexer::open(&project, &Settings::from_env())?;
    let last_indexed = indexer.last_indexed()?;
    let diff = indexer.diff_only().context("Failed to get status")?;

    print!(
        "{}",
        render::project_status(project.root(), project.metadata_dir(), last_indexed)
    );
    println!();
    if diff.is_clean() {
        print_tone(Tone::Success, "Working directory clean. Index up to date")?;
    } else {
        print!("{}", render::file_status(&diff));
    }
    Ok(())
}
