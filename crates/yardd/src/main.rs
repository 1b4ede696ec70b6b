//! yardd — the Yardgrid daemon.
//!
//! Single binary that assembles the yard service:
//! - Configuration (TOML)
//! - Yard state, placement policy, optional learned scorer
//! - Rehydration from a resident snapshot
//! - Reoptimization and training loops
//!
//! # Usage
//!
//! ```text
//! yardd run --config /etc/yardgrid/yard.toml --snapshot residents.json
//! yardd default-config > yard.toml
//! ```

mod daemon;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yard_core::YardgridConfig;

#[derive(Parser)]
#[command(name = "yardd", about = "Yardgrid container-yard daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the yard service until interrupted.
    Run {
        /// Configuration file; built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON array of residents to restore at startup.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Emit logs as JSON lines.
        #[arg(long)]
        json_logs: bool,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            snapshot,
            json_logs,
        } => {
            let config = match &config {
                Some(path) => YardgridConfig::from_file(path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                None => YardgridConfig::default(),
            };
            init_tracing(&config.logging.level, json_logs)?;
            daemon::run(config, snapshot).await
        }
        Command::DefaultConfig => {
            print!("{}", YardgridConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {level:?}"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
