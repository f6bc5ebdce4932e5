// Copyright 2025
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sentinel_privacy::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = cli.load_config()?;

    match cli.command {
        Commands::Serve { host, port } => {
            cli::apply_overrides(&mut config, host, port);
            sentinel_privacy::server::start(config).await?;
        }
        Commands::Anonymize { text } => {
            let out = cli::anonymize(&config, &text)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Classify { text } => {
            let out = cli::classify(&config, &text)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
