//! Remote registry session

use reqwest::Method;
use tracing::{debug, info};
use url::Url;

use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::models::api::RegistryInfo;

const REGISTRY_PATH: &str = "/api/registry";

/// A temporary registry opened on the server for one deploy
///
/// `close` consumes the session, so it can be released at most once.
#[derive(Debug)]
#[must_use = "a registry session must be closed"]
pub struct RegistrySession {
    port: u16,
    target: Url,
}

impl RegistrySession {
    /// Ask the server for a registry session
    pub async fn open(client: &HttpClient) -> Result<Self, CliError> {
        let response = client
            .request(Method::GET, REGISTRY_PATH)
            .send()
            .await
            .map_err(|e| CliError::RegistryOpenError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CliError::RegistryOpenError(e.to_string()))?;

        if !status.is_success() {
            return Err(CliError::RegistryOpenError(format!(
                "server answered {}: {}",
                status,
                body.trim()
            )));
        }

        let info: RegistryInfo = serde_json::from_str(&body)
            .map_err(|e| CliError::RegistryOpenError(format!("unexpected response body: {}", e)))?;

        let target = registry_target(client.base_url(), info.port)?;
        info!("Opened registry session at {}", target);

        Ok(Self {
            port: info.port,
            target,
        })
    }

    /// Where the local relay forwards to
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Release the session on the server
    pub async fn close(self, client: &HttpClient) -> Result<(), CliError> {
        debug!("Closing registry session on port {}", self.port);

        let response = client
            .request(Method::DELETE, REGISTRY_PATH)
            .send()
            .await
            .map_err(|e| CliError::RegistryCloseError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::RegistryCloseError(format!(
                "server answered {}: {}",
                status,
                body.trim()
            )));
        }

        info!("Closed registry session");
        Ok(())
    }
}

/// `<scheme>://<server-host>:<port>` for the server at `server_url`
pub fn registry_target(server_url: &str, port: u16) -> Result<Url, CliError> {
    let server = Url::parse(server_url)
        .map_err(|e| CliError::RegistryOpenError(format!("invalid server url {}: {}", server_url, e)))?;

    if !matches!(server.scheme(), "http" | "https") {
        return Err(CliError::RegistryOpenError(format!(
            "unsupported registry scheme '{}'",
            server.scheme()
        )));
    }

    let host = server
        .host_str()
        .ok_or_else(|| CliError::RegistryOpenError(format!("server url {} has no host", server_url)))?;

    Url::parse(&format!("{}://{}:{}", server.scheme(), host, port))
        .map_err(|e| CliError::RegistryOpenError(e.to_string()))
}
