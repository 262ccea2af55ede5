//! Remote API models

use serde::{Deserialize, Deserializer, Serialize};

/// Response code the server uses when the app is already installed
pub const ERROR_APP_INSTALLED: &str = "AppInstalled";

/// Error envelope returned by the server on non-204 responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,

    /// Nested error, either a string or an arbitrary JSON value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl ApiResult {
    pub fn is_app_installed(&self) -> bool {
        self.code == ERROR_APP_INSTALLED
    }

    /// Nested error rendered as text, if any
    pub fn detail(&self) -> Option<String> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Body of `GET /api/registry`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryInfo {
    /// Port of the temporary registry on the server host
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
}

fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid registry port: {:?}", text))),
    }
}
