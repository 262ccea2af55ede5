//! CLI config file management

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info};

use crate::errors::CliError;
use crate::storage::layout::StorageLayout;

/// Server used when the config file does not exist yet
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// CLI configuration, loaded once at startup and passed to whoever needs it
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Remote server configuration
    #[serde(default)]
    pub server: ServerSettings,
}

/// Remote server settings
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the localapps server
    #[serde(default = "default_server_url")]
    pub url: String,

    /// API key sent verbatim in the `Authorization` header
    #[serde(
        rename = "apiKey",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_api_key",
        deserialize_with = "deserialize_api_key"
    )]
    pub api_key: Option<SecretString>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            api_key: None,
        }
    }
}

impl ServerSettings {
    /// Expose the API key for building request headers
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret())
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.api_key = (!key.is_empty()).then(|| SecretString::from(key));
    }
}

fn serialize_api_key<S: Serializer>(key: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(key) => serializer.serialize_str(key.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_api_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    let key = Option::<String>::deserialize(deserializer)?;
    Ok(key.filter(|k| !k.is_empty()).map(SecretString::from))
}

impl CliConfig {
    /// Load the config file, writing the default one first if it is missing
    pub async fn load_or_init(layout: &StorageLayout) -> Result<Self, CliError> {
        let file = layout.config_file();

        if !file.exists().await {
            info!("Creating default CLI config at {}", file.path().display());
            let default = format!(r#"{{"server":{{"url":"{}"}}}}"#, DEFAULT_SERVER_URL);
            file.write_string(&default).await.map_err(|e| {
                CliError::ConfigError(format!(
                    "cannot create cli config file {}: {}",
                    file.path().display(),
                    e
                ))
            })?;
        }

        let config: CliConfig = file.read_json().await.map_err(|e| {
            CliError::ConfigError(format!(
                "failed to decode cli config {}: {}",
                file.path().display(),
                e
            ))
        })?;

        debug!("Loaded CLI config for server {}", config.server.url);
        Ok(config)
    }

    /// Persist the config back to disk
    pub async fn save(&self, layout: &StorageLayout) -> Result<(), CliError> {
        let file = layout.config_file();
        file.write_json(self).await.map_err(|e| {
            CliError::ConfigError(format!(
                "failed to write cli config {}: {}",
                file.path().display(),
                e
            ))
        })
    }
}
