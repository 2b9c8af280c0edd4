// revcheck command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use revcheck_lib::models::AnalysisInput;
use revcheck_lib::services::{ConfigStore, PROVIDER_NAME};

/// Detect likely-fake product reviews
#[derive(Parser, Debug)]
#[command(name = "revcheck", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a set of reviews and write the report as JSON
    Analyze {
        /// Request file (JSON); `-` reads stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Report destination; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration directory
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip the classification service and use heuristics only
        #[arg(long)]
        offline: bool,
    },
    /// Print the active heuristic rule table
    Rules {
        /// Configuration directory
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Store the classification service credential in the config file
    SetKey {
        key: String,

        /// Configuration directory
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn open_store(config_dir: Option<PathBuf>) -> Result<ConfigStore> {
    let dir = match config_dir {
        Some(dir) => dir,
        None => ConfigStore::default_config_dir().context("Could not determine config directory")?,
    };
    Ok(ConfigStore::new(dir))
}

fn read_input(path: &Path) -> Result<AnalysisInput> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).context("Invalid analysis request")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    revcheck_lib::init_logging();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            offline,
        } => {
            let store = open_store(config)?;
            let app_config = store.load().context("Failed to load configuration")?;
            let request = read_input(&input)?;

            let report = revcheck_lib::analyze_reviews(request, &app_config, Some(&store), offline)
                .await
                .context("Analysis failed")?;
            let json = serde_json::to_string_pretty(&report)?;

            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Rules { config } => {
            let store = open_store(config)?;
            let scorer = store
                .load()
                .context("Failed to load configuration")?
                .build_scorer()
                .context("Invalid heuristic rule table")?;
            println!("{}", serde_json::to_string_pretty(&scorer.specs())?);
        }
        Commands::SetKey { key, config } => {
            let store = open_store(config)?;
            store
                .set_api_key(PROVIDER_NAME, &key)
                .context("Failed to store credential")?;
            info!(
                "Credential saved (len={}) to {}",
                key.trim().len(),
                store.config_file().display()
            );
        }
    }

    Ok(())
}
