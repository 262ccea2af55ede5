//! localapps CLI - Entry Point

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::debug;

use localapps::cli::args::{Cli, Commands};
use localapps::commands::{cmd_config, cmd_deploy, cmd_version};
use localapps::errors::CliError;
use localapps::logs::{init_logging, LogOptions};
use localapps::storage::layout::StorageLayout;
use localapps::storage::settings::CliConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_options = LogOptions {
        log_level: cli.log_level,
        json_format: cli.log_json,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let layout = match cli.config {
        Some(path) => StorageLayout::default().with_config_file(path),
        None => StorageLayout::default(),
    };

    // Version lookups work without a config file
    if let Commands::Version = cli.cmd {
        return cmd_version().await;
    }

    let config = CliConfig::load_or_init(&layout).await?;
    debug!("Using config {:?}", config);

    match cli.cmd {
        Commands::Deploy(args) => cmd_deploy(&config, args).await.map(|_| ()),
        Commands::Config(args) => cmd_config(&layout, config, args.cmd).await,
        Commands::Version => cmd_version().await,
    }
}

fn report(error: &CliError) {
    match error {
        CliError::ApiRejection { code, message, detail, .. } => {
            eprintln!("{} {}", format!("[Error -> {}]", code).red().bold(), message);
            if let Some(detail) = detail {
                eprintln!("\n{}", detail);
            }
        }
        other => eprintln!("{} {}", "Error:".red().bold(), other),
    }
}
