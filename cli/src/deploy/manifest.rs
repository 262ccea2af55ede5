//! Manifest loader

use std::path::Path;

use tracing::debug;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::models::app::{resolve_relative, AppManifest};

/// Read and decode the app manifest at `path`
pub async fn load_manifest(path: &Path) -> Result<AppManifest, CliError> {
    let contents = File::new(path)
        .read_bytes()
        .await
        .map_err(|source| CliError::ManifestReadError {
            path: path.to_path_buf(),
            source,
        })?;

    let manifest: AppManifest =
        serde_yaml::from_slice(&contents).map_err(|source| CliError::ManifestParseError {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        "Loaded manifest {} ({} parts)",
        path.display(),
        manifest.parts.len()
    );
    Ok(manifest)
}

/// Check the manifest can be deployed from `manifest_path`'s directory
pub async fn validate_manifest(manifest: &AppManifest, manifest_path: &Path) -> Result<(), CliError> {
    let app_id = manifest.app_id();
    if app_id.is_empty() {
        return Err(CliError::ManifestInvalid(
            "app needs a non-empty name or id".to_string(),
        ));
    }
    if app_id.contains(char::is_whitespace) {
        return Err(CliError::ManifestInvalid(format!(
            "app id '{}' must not contain whitespace",
            app_id
        )));
    }

    if manifest.has_icon() {
        let icon = resolve_relative(manifest_path, &manifest.icon);
        if !File::new(&icon).exists().await {
            return Err(CliError::ManifestInvalid(format!(
                "icon file does not exist: {}",
                icon.display()
            )));
        }
    }

    for (part_name, part) in &manifest.parts {
        let context = resolve_relative(manifest_path, &part.src);
        let is_dir = tokio::fs::metadata(&context)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(CliError::ManifestInvalid(format!(
                "build context for part '{}' does not exist: {}",
                part_name,
                context.display()
            )));
        }
    }

    Ok(())
}
