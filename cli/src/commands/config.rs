use tracing::info;
use url::Url;

use crate::cli::args::ConfigCommands;
use crate::errors::CliError;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::CliConfig;

pub async fn cmd_config(
    layout: &StorageLayout,
    mut config: CliConfig,
    cmd: ConfigCommands,
) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Show => {
            println!("Config file: {}", layout.config_file().path().display());
            println!("Server URL:  {}", config.server.url);
            println!(
                "API key:     {}",
                if config.server.api_key().is_some() { "set" } else { "not set" }
            );
            Ok(())
        }
        ConfigCommands::Set { url, api_key } => {
            if url.is_none() && api_key.is_none() {
                return Err(CliError::ConfigError(
                    "nothing to change, pass --url and/or --api-key".to_string(),
                ));
            }

            if let Some(url) = url {
                let parsed = Url::parse(&url)
                    .map_err(|e| CliError::ConfigError(format!("invalid server url {}: {}", url, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(CliError::ConfigError(format!(
                        "server url must be http or https, got {}",
                        parsed.scheme()
                    )));
                }
                config.server.url = url.trim_end_matches('/').to_string();
            }
            if let Some(api_key) = api_key {
                config.server.set_api_key(api_key);
            }

            config.save(layout).await?;
            info!("Saved config to {}", layout.config_file().path().display());
            println!("Configuration saved");
            Ok(())
        }
    }
}
