//! Mainframe Lineage CLI
//!
//! Loads chunks from a source directory or a JSON chunk dump and prints
//! lineage, field usage or graph reports as JSON.
//!
//! Usage:
//!   mainframe-lineage --dir ./src lineage
//!   mainframe-lineage --dir ./src fields --copybook ACCTREC
//!   mainframe-lineage --chunks chunks.json --session S1 graph --element VSAMFILE --radius 1

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use mainframe_lineage::ingest::{load_source, pick_session, Source, DEFAULT_SESSION};
use mainframe_lineage::{LineageAnalyzer, LineageConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mainframe-lineage")]
#[command(about = "CRUD and field lineage for mainframe sources")]
#[command(group(ArgGroup::new("source").required(true).args(["dir", "chunks"])))]
struct Cli {
    /// Source directory to chunk and analyze
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// JSON array of chunk records
    #[arg(long)]
    chunks: Option<PathBuf>,

    /// Session id (defaults to the first session in a chunk dump)
    #[arg(short, long)]
    session: Option<String>,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CRUD lineage maps for files and tables
    Lineage,

    /// Field usage for one copybook
    Fields {
        /// Copybook name or fragment
        #[arg(long)]
        copybook: String,
    },

    /// Whole graph, or the neighborhood of one element
    Graph {
        /// Node id or name to center on
        #[arg(short, long)]
        element: Option<String>,

        /// Hops around the element (defaults to graph.default_radius)
        #[arg(short, long)]
        radius: Option<usize>,
    },

    /// SHA-256 digest of the session's chunks
    Digest,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = LineageConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let source = match (cli.dir, cli.chunks) {
        (Some(dir), _) => Source::Directory(dir),
        (None, Some(path)) => Source::ChunkDump(path),
        (None, None) => bail!("either --dir or --chunks is required"),
    };
    let requested = cli.session.as_deref().unwrap_or(DEFAULT_SESSION);
    let store = load_source(&source, requested, &config.ingest)?;
    let session = pick_session(&store, cli.session.as_deref());

    let analyzer = LineageAnalyzer::new(store, config)?;
    let config = analyzer.config();

    let output = match cli.command {
        Commands::Lineage => config.render(&analyzer.analyze_lineage(&session)?)?,
        Commands::Fields { copybook } => config.render(&analyzer.analyze_fields(&session, &copybook)?)?,
        Commands::Graph { element: None, .. } => config.render(&analyzer.build_graph(&session)?.view())?,
        Commands::Graph {
            element: Some(element),
            radius,
        } => {
            let graph = analyzer.build_graph(&session)?;
            let radius = radius.unwrap_or(config.graph.default_radius);
            let sub = graph.neighborhood(&element, radius);
            if sub.is_empty() {
                let suggestions: Vec<String> = graph.search(&element, 5).into_iter().map(|r| r.id).collect();
                if !suggestions.is_empty() {
                    eprintln!("No node matches '{}'. Did you mean: {}", element, suggestions.join(", "));
                }
            }
            config.render(&sub.view())?
        }
        Commands::Digest => analyzer.snapshot(&session)?.digest(),
    };

    println!("{}", output);
    Ok(())
}
