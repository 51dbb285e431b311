// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use anyhow::Result;
use claims_gateway::{config::Config, gateway, observability};
use clap::{Parser, Subcommand};

/// Role-assignment gateway for an external identity provider.
#[derive(Parser, Debug)]
#[command(name = "claims-gateway", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Bind address (overrides [gateway] host)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides [gateway] port; 0 picks a free port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration with secrets masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    observability::init_tracing(&config.observability);
    config.log_source();

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            gateway::run_gateway(config).await
        }
        Command::CheckConfig => {
            if let Some(path) = &config.config_path {
                println!("# {}", path.display());
            }
            print!("{}", config.redacted().to_toml()?);
            Ok(())
        }
    }
}
