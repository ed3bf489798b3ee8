//! `voodoo-player` CLI - resolve stream URLs and watch live streams come online

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "voodoo-player")]
#[command(about = "Resolve Voodoo stream URLs and watch live streams come online")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/voodoo-player/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an input URL to its canonical stream URL
    Resolve {
        /// Input URL, e.g. https://spatial.streamvoodoo.com/live2/alice/5
        url: String,

        /// Placeholder URL to attach to the descriptor
        #[arg(long)]
        preview: Option<String>,

        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single availability check against a URL
    Probe {
        /// URL to check with a HEAD request
        url: String,
    },

    /// Load a user's live stream and wait until it is available
    Watch {
        /// User id
        user_id: String,

        /// Stream id
        stream_id: String,

        /// Load the stream directly instead of showing the preview clip
        #[arg(long)]
        no_preview: bool,

        /// Milliseconds between availability checks
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show the effective configuration
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = cmd::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve { url, preview, json } => {
            cmd::resolve::cmd_resolve(&url, preview.as_deref(), json, &config)?;
        }
        Commands::Probe { url } => {
            if !cmd::probe::cmd_probe(&url).await? {
                std::process::exit(1);
            }
        }
        Commands::Watch {
            user_id,
            stream_id,
            no_preview,
            interval_ms,
            timeout_secs,
        } => {
            cmd::watch::cmd_watch(
                &user_id,
                &stream_id,
                !no_preview,
                interval_ms,
                timeout_secs,
                config,
            )
            .await?;
        }
        Commands::Config { path } => {
            cmd::show_config::cmd_config(path, cli.config.as_deref(), &config)?;
        }
    }

    Ok(())
}
