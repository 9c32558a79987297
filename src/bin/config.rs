//! Lineage Config CLI
//!
//! View and manage lineage analysis configuration.

use clap::{Parser, Subcommand};
use mainframe_lineage::LineageConfig;

#[derive(Parser)]
#[command(name = "lineage-config")]
#[command(about = "View and manage lineage analysis configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: lineage.toml)
        #[arg(short, long, default_value = "lineage.toml")]
        output: String,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = LineageConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Lineage Configuration\n");
                println!("Scan:");
                println!("  Artifact markers: {}", cfg.scan.artifact_markers.join(" "));
                println!("  Parallel: {}", cfg.scan.parallel);
                println!("  Strip line numbers: {}", cfg.scan.strip_line_numbers);

                println!("\nIngest:");
                println!("  Lines per chunk: {}", cfg.ingest.lines_per_chunk);
                println!("  Extensions: {}", cfg.ingest.extensions.join(" "));
                println!("  Skip prefixes: {}", cfg.ingest.skip_prefixes.join(" "));

                println!("\nFields:");
                println!("  Copybook markers: {}", cfg.fields.copybook_markers.join(" "));

                println!("\nGraph:");
                println!("  Default radius: {}", cfg.graph.default_radius);

                println!("\nOutput:");
                println!("  Format: {:?}", cfg.output.format);
            }
        }

        Commands::Init { output } => {
            let cfg = LineageConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => match LineageConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                if cfg.ingest.lines_per_chunk == 0 {
                    eprintln!("❌ Configuration error: ingest.lines_per_chunk must be positive");
                    std::process::exit(1);
                }
                println!("✅ Configuration is valid");
                println!("   Artifact markers: {}", cfg.scan.artifact_markers.len());
                println!("   Copybook markers: {}", cfg.fields.copybook_markers.len());
                println!("   Default radius: {}", cfg.graph.default_radius);
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
