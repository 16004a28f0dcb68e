//! Market Analysis (remkt-analysis) - command-line entry point
//!
//! Reads the per-source extraction payload as JSON, runs the analysis and
//! prints the resulting `MarketAnalysis` as JSON on stdout. Logs go to
//! stderr so the output stays machine-readable.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use remkt_analysis::input::parse_market_input_str;
use remkt_analysis::{logging, MarketAnalyzer};
use tracing::info;

/// Command-line arguments for remkt-analysis
#[derive(Parser, Debug)]
#[command(name = "remkt-analysis")]
#[command(about = "Fuse multi-source real-estate market data into one validated record")]
#[command(version)]
struct Args {
    /// Extraction payload (JSON); reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Analysis config file (falls back to REMKT_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config loading logs through a bootstrap subscriber; the global one
    // needs the configured level
    let config =
        logging::load_config(args.config.as_deref()).context("Failed to load analysis configuration")?;
    logging::init(&config.logging);

    let payload = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read input from stdin")?;
            buffer
        }
    };

    let observations = parse_market_input_str(&payload).context("Invalid input payload")?;
    info!("Loaded {} source(s)", observations.len());

    let analysis = MarketAnalyzer::new(config).analyze(&observations);

    let output = if args.pretty {
        serde_json::to_string_pretty(&analysis)
    } else {
        serde_json::to_string(&analysis)
    }
    .context("Failed to serialize analysis")?;
    println!("{}", output);

    Ok(())
}
