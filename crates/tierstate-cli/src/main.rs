// CLI for operator tooling and local flush simulations

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tierstate_cli::commands::{check_config, graph, simulate, wire};
use tierstate_core::TierMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tierctl")]
#[command(about = "Tier state controller tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a wire integer into a mode name
    Decode {
        /// Wire value
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },

    /// Encode a mode name into its wire integer
    Encode {
        /// Mode name (in_memory, in_memory_grace, flushing, on_disk)
        mode: TierMode,
    },

    /// Print the transition table
    Graph,

    /// Validate a configuration file with environment overrides applied
    CheckConfig {
        /// Config file path
        path: PathBuf,
    },

    /// Run partitions through pressure, grace and flush against a local directory
    Simulate {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of partitions
        #[arg(short = 'n', long, default_value = "4")]
        partitions: usize,

        /// Fail every k-th flush call
        #[arg(long)]
        fail_every: Option<u32>,

        /// Directory receiving partition manifests
        #[arg(short, long, default_value = ".tierstate")]
        dir: PathBuf,

        /// Override the grace period in milliseconds
        #[arg(long)]
        grace_ms: Option<u64>,

        /// Give up after this many seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing, RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Decode { value } => {
            println!("{}", wire::decode(value)?);
        }
        Commands::Encode { mode } => {
            println!("{}", wire::encode(mode));
        }
        Commands::Graph => {
            print!("{}", graph::render());
        }
        Commands::CheckConfig { path } => {
            print!("{}", check_config::run(&path)?);
        }
        Commands::Simulate {
            config,
            partitions,
            fail_every,
            dir,
            grace_ms,
            timeout_secs,
        } => {
            let mut options = simulate::SimulationOptions::new(dir);
            options.config = check_config::load(config.as_deref())?;
            if let Some(grace_ms) = grace_ms {
                options.config.flush.grace_period_ms = grace_ms;
            }
            options.partitions = partitions;
            options.fail_every = fail_every;
            options.timeout = Duration::from_secs(timeout_secs);

            let report = simulate::run(options).await?;
            for event in &report.events {
                println!("{}", serde_json::to_string(event)?);
            }
            for (partition, mode) in &report.final_modes {
                eprintln!("{partition}: {mode}");
            }
        }
    }

    Ok(())
}
