//! Error types for the localapps CLI

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the localapps CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read manifest {}: {source}", path.display())]
    ManifestReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {}: {source}", path.display())]
    ManifestParseError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),

    #[error("Failed to connect to the container engine. Is it running? ({0})")]
    EngineUnavailable(String),

    #[error("Image build failed for part '{part}' ({})", describe_exit(*exit_code))]
    ImageBuildError { part: String, exit_code: Option<i32> },

    #[error("Failed to open registry session: {0}")]
    RegistryOpenError(String),

    #[error("Failed to close registry session: {0}")]
    RegistryCloseError(String),

    #[error("Image push failed for part '{part}': {cause}")]
    ImagePushError { part: String, cause: String },

    #[error("Failed to upload app: {0}")]
    UploadTransportError(String),

    #[error("[Error -> {code}] {message}")]
    ApiRejection {
        status: u16,
        code: String,
        message: String,
        detail: Option<String>,
    },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl CliError {
    /// Process exit code reported for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError(_) => 2,
            CliError::ManifestReadError { .. } => 3,
            CliError::ManifestParseError { .. } | CliError::ManifestInvalid(_) => 4,
            CliError::EngineUnavailable(_) | CliError::ImageBuildError { .. } => 5,
            CliError::RegistryOpenError(_) => 6,
            CliError::RegistryCloseError(_) => 7,
            CliError::ImagePushError { .. } => 8,
            CliError::UploadTransportError(_) => 9,
            CliError::ApiRejection { .. } => 10,
            CliError::ServerError(_)
            | CliError::IoError(_)
            | CliError::JsonError(_)
            | CliError::HttpError(_)
            | CliError::Internal(_) => 1,
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Internal(format!("{err:#}"))
    }
}
