use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "isofilter")]
#[command(version, about = "Remove or classify isomorphs in a stream of graphs")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Settings file (default: $XDG_CONFIG_HOME/isofilter/isofilter.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read graphs, group them by isomorphism class and write the result
    Filter(cmd::FilterArgs),
    /// View or validate settings
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current settings
    Show,
    /// Validate settings and show any warnings
    Validate,
    /// Write a default settings file
    Init,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "isofilter=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Filter(args) => cmd::cmd_filter(args, cli.config.as_deref()).await?,
        Commands::Config { command } => cmd::cmd_config(cli.config.as_deref(), command)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!(">E isofilter: {:#}", e);
        std::process::exit(1);
    }
}
