use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use mainframe_lineage::ingest::{load_source, pick_session, Source, DEFAULT_SESSION};
use mainframe_lineage::{LineageAnalyzer, LineageConfig, LineageGraph};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lineage-graph-export")]
#[command(about = "Export the program/file/table lineage graph to DOT, SVG or JSON")]
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

    /// Export only the neighborhood of this element
    #[arg(short, long)]
    element: Option<String>,

    /// Neighborhood radius (defaults to graph.default_radius)
    #[arg(short, long)]
    radius: Option<usize>,

    /// Output file (defaults to lineage.<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: dot, svg or json
    #[arg(short, long, default_value = "dot")]
    format: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
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

    println!("Loading chunks from: {:?}", source);
    let requested = cli.session.as_deref().unwrap_or(DEFAULT_SESSION);
    let store = load_source(&source, requested, &config.ingest)?;
    let session = pick_session(&store, cli.session.as_deref());
    let analyzer = LineageAnalyzer::new(store, config)?;

    let mut graph = analyzer.build_graph(&session)?;
    if let Some(element) = &cli.element {
        let radius = cli.radius.unwrap_or(analyzer.config().graph.default_radius);
        graph = graph.neighborhood(element, radius);
    }

    println!("Graph built: {} nodes, {} edges", graph.node_count(), graph.edge_count());

    let output_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("lineage.{}", cli.format)));

    match cli.format.as_str() {
        "dot" => {
            std::fs::write(&output_path, graph.to_dot())?;
            println!("✅ Exported DOT to: {:?}", output_path);
        }
        "json" => {
            std::fs::write(&output_path, serde_json::to_string_pretty(&graph.view())?)?;
            println!("✅ Exported JSON to: {:?}", output_path);
        }
        "svg" => {
            export_svg(&graph, &output_path)?;
            println!("✅ Exported SVG to: {:?}", output_path);
        }
        other => bail!("invalid format '{}'. Use 'dot', 'svg' or 'json'", other),
    }

    Ok(())
}

/// Render through GraphViz `dot`
fn export_svg(graph: &LineageGraph, output_path: &Path) -> anyhow::Result<()> {
    let temp_dot = output_path.with_extension("temp.dot");
    std::fs::write(&temp_dot, graph.to_dot())?;

    let output = std::process::Command::new("dot")
        .arg("-Tsvg")
        .arg(&temp_dot)
        .arg("-o")
        .arg(output_path)
        .output()
        .context("running graphviz `dot`")?;

    let _ = std::fs::remove_file(&temp_dot);

    if !output.status.success() {
        bail!(
            "GraphViz conversion failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}
