//! Try-on CLI - drive the virtual try-on job pipeline from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Run a try-on and wait for the result
//! tryon generate me.jpg https://cdn.example.com/shirt.jpg --label "Linen Shirt"
//!
//! # Submit only, then resume polling later
//! tryon generate me.jpg shirt.jpg --no-wait
//! tryon poll /api/v1/tryon/status/<job-id>
//!
//! # Inspect garment preparation locally
//! tryon prepare shirt.jpg --output shirt.prepared.jpg
//!
//! # View configuration
//! tryon config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Try-on - virtual try-on job pipeline.
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a try-on image from a customer photo and a garment photo
    Generate(cli::generate::GenerateArgs),

    /// Poll an accepted job until it finishes or the budget runs out
    Poll(cli::poll::PollArgs),

    /// Compress and crop a garment image locally
    Prepare(cli::prepare::PrepareArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln
    let config = match tryon_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tryon config path`."
            );
            tryon_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Try-on v{}", tryon_core::VERSION);

    match cli.command {
        Commands::Generate(args) => cli::generate::execute(args).await,
        Commands::Poll(args) => cli::poll::execute(args).await,
        Commands::Prepare(args) => cli::prepare::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
