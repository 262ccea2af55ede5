//! App registration API client

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::models::api::ApiResult;
use crate::models::app::{resolve_relative, AppManifest};

const APPS_PATH: &str = "/api/apps";

/// Result of a single upload attempt that did not fail outright
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The server accepted the app (`204 No Content`)
    Deployed,

    /// The server reported the app is already installed
    AlreadyInstalled { status: u16, result: ApiResult },
}

impl HttpClient {
    /// Upload the manifest (and icon) to `POST /api/apps`
    ///
    /// Files are read from disk on every call, so a retry sends fresh bytes.
    pub async fn upload_app(
        &self,
        manifest_path: &Path,
        manifest: &AppManifest,
        update: bool,
    ) -> Result<UploadOutcome, CliError> {
        let form = build_form(manifest_path, manifest, update).await?;

        let response = self
            .request(Method::POST, APPS_PATH)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CliError::UploadTransportError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(UploadOutcome::Deployed);
        }

        let body = response
            .text()
            .await
            .map_err(|e| CliError::UploadTransportError(e.to_string()))?;
        debug!("Upload answered {}: {}", status, body.trim());

        let result = serde_json::from_str::<ApiResult>(&body).unwrap_or_else(|_| ApiResult {
            code: String::new(),
            message: body.trim().to_string(),
            error: None,
        });

        if result.is_app_installed() {
            return Ok(UploadOutcome::AlreadyInstalled {
                status: status.as_u16(),
                result,
            });
        }

        Err(api_rejection(status.as_u16(), result))
    }
}

/// Turn a server error envelope into the user facing error
pub fn api_rejection(status: u16, result: ApiResult) -> CliError {
    let detail = result.detail();
    let code = if result.code.is_empty() {
        status.to_string()
    } else {
        result.code
    };
    let message = if result.message.is_empty() {
        StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unexpected response")
            .to_string()
    } else {
        result.message
    };

    CliError::ApiRejection {
        status,
        code,
        message,
        detail,
    }
}

async fn build_form(manifest_path: &Path, manifest: &AppManifest, update: bool) -> Result<Form, CliError> {
    let manifest_file = File::new(manifest_path);
    let contents = manifest_file
        .read_bytes()
        .await
        .map_err(|source| CliError::ManifestReadError {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let mut form = Form::new().part(
        "file",
        Part::bytes(contents)
            .file_name(manifest_file.file_name())
            .mime_str("application/octet-stream")?,
    );

    if manifest.has_icon() {
        let icon_file = File::new(resolve_relative(manifest_path, &manifest.icon));
        let icon = icon_file.read_bytes().await.map_err(|e| {
            CliError::ManifestInvalid(format!(
                "cannot read icon {}: {}",
                icon_file.path().display(),
                e
            ))
        })?;
        form = form.part(
            "icon",
            Part::bytes(icon)
                .file_name(icon_file.file_name())
                .mime_str("application/octet-stream")?,
        );
    }

    if update {
        form = form.text("update", "true");
    }

    Ok(form)
}
