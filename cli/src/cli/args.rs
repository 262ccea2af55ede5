use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logs::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "localapps-cli", version, about = "Deploy apps to a localapps server")]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "LOCALAPPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, global = true, env = "LOCALAPPS_LOG", default_value = "warn")]
    pub log_level: LogLevel,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy your app to the server
    #[command(visible_alias = "push")]
    Deploy(DeployArgs),

    /// Check the CLI version
    Version,

    /// Show or change the CLI configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// App manifest
    #[arg(long, short, default_value = "app.yml")]
    pub file: PathBuf,

    /// Timeout in seconds for each server API request
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Container tool used to build and push images
    #[arg(long, env = "LOCALAPPS_ENGINE", default_value = "docker")]
    pub engine: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,

    /// Update and save the configuration
    Set {
        /// Server URL, e.g. http://localhost:8080
        #[arg(long)]
        url: Option<String>,

        /// API key sent to the server
        #[arg(long)]
        api_key: Option<String>,
    },
}
