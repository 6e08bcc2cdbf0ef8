//! Forensic Triage - Main Entry Point
//!
//! Flags anomalous rows in CSV security logs, from the command line or over HTTP.

use clap::Parser;
use forensic_triage::cli::{cmd_analyze, cmd_info, cmd_local, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forensic_triage=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { data, contamination, feature, require, output, preview, suspicious_limit } => {
            cmd_analyze(
                &data,
                contamination,
                feature.as_deref(),
                &require,
                output.as_deref(),
                preview,
                suspicious_limit,
            )?;
        }
        Commands::Local { data, output } => {
            cmd_local(&data, output.as_deref())?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::Serve { port, host } => {
            cmd_serve(&host, port).await?;
        }
    }

    Ok(())
}
