//! copilot - Flare Copilot gateway and CLI
//!
//! Subcommands:
//! - `copilot serve` - Run the HTTP gateway
//! - `copilot tools` - Print the tool registry
//! - `copilot config` - Show effective configuration
//! - `copilot price <SYMBOL>` - Read an FTSO price
//! - `copilot proof <ROUND_ID>` - Fetch an FDC attestation proof

use anyhow::Result;
use clap::{Parser, Subcommand};
use copilot_gateway::{commands, serve, telemetry};
use flareconf::CopilotConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "copilot")]
#[command(about = "Conversational assistant over Flare's on-chain oracles")]
#[command(version)]
struct Cli {
    /// Config file (overrides ./flare-copilot.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// HTTP port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// OTLP gRPC endpoint for span export (e.g., "localhost:4317")
        #[arg(long)]
        otlp_endpoint: Option<String>,
    },

    /// Print the tool registry JSON
    Tools,

    /// Show config sources and effective values (secrets redacted)
    Config,

    /// Read a price from the FTSO
    Price {
        /// Asset symbol (FLR, BTC, ETH)
        symbol: String,
    },

    /// Fetch an attestation proof for a voting round
    Proof {
        /// FDC voting round id
        round_id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = CopilotConfig::load_from(cli.config.as_deref())?;

    // Serve installs its own subscriber once the port and OTLP flags are folded in
    if !matches!(cli.command, Commands::Serve { .. }) {
        telemetry::init_cli(&config.telemetry.log_level);
    }

    match cli.command {
        Commands::Serve {
            port,
            otlp_endpoint,
        } => {
            if let Some(port) = port {
                config.bind.http_port = port;
            }
            if otlp_endpoint.is_some() {
                config.telemetry.otlp_endpoint = otlp_endpoint;
            }

            let telemetry = telemetry::init(
                &config.telemetry.log_level,
                config.telemetry.otlp_endpoint.as_deref(),
            )?;
            let result = serve::run(&config).await;
            telemetry.shutdown();
            result
        }
        Commands::Tools => commands::tools(),
        Commands::Config => commands::config(cli.config.as_deref()),
        Commands::Price { symbol } => commands::price(&config, &symbol).await,
        Commands::Proof { round_id } => commands::proof(&config, round_id).await,
    }
}
