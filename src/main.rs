// Fieldcase - Bulk Form Submission Export Tool
// Copyright (c) 2026 Fieldcase Contributors
// Licensed under the MIT License

use clap::Parser;
use fieldcase::cli::{Cli, Commands};
use fieldcase::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    if let Err(e) = init_logging(log_level) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(5);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Fieldcase - Bulk Form Submission Export Tool"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Export(args) => args.execute(&cli.prefs).await,
        Commands::List(args) => args.execute(&cli.prefs),
        Commands::Status(args) => args.execute(&cli.prefs),
    }
}
