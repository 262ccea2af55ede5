//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use tracing::debug;

use crate::errors::CliError;
use crate::storage::settings::ServerSettings;

/// Default per-request timeout for server API calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the localapps server API
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client for the configured server
    pub fn new(server: &ServerSettings, timeout: Duration) -> Result<Self, CliError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            client,
            base_url: server.url.trim_end_matches('/').to_string(),
            api_key: server.api_key().map(str::to_string),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request to `path` with the API key attached
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let request = self.client.request(method, &url);
        match &self.api_key {
            Some(key) => request.header(header::AUTHORIZATION, key),
            None => request,
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
