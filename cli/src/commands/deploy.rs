use std::time::Duration;

use colored::Colorize;
use tracing::info;

use crate::cli::args::DeployArgs;
use crate::deploy::docker::DockerCli;
use crate::deploy::executor::{DeployExecutor, DeployReport};
use crate::errors::CliError;
use crate::storage::settings::CliConfig;

pub async fn cmd_deploy(config: &CliConfig, args: DeployArgs) -> Result<DeployReport, CliError> {
    let engine = DockerCli::new(args.engine);
    info!(
        "Deploying {} to {} with {}",
        args.file.display(),
        config.server.url,
        engine.program()
    );

    let mut executor = DeployExecutor::new(config, &engine, Duration::from_secs(args.timeout))?;
    let report = executor.deploy(&args.file).await?;

    if report.updated {
        println!("\n{} {}", "Updated".green().bold(), report.app_name);
    }
    println!(
        "\nApp deployed. Find it on the server: {}",
        report.server_url.cyan()
    );
    Ok(report)
}
