//! Image builder

use std::path::Path;

use tracing::{debug, info};

use crate::deploy::engine::ContainerEngine;
use crate::errors::CliError;
use crate::models::app::{resolve_relative, AppManifest};

/// Build every part of the app, stopping at the first failed build
///
/// Returns the local tags that were built, in part order.
pub async fn build_images<E>(
    engine: &E,
    manifest: &AppManifest,
    manifest_path: &Path,
) -> Result<Vec<String>, CliError>
where
    E: ContainerEngine + ?Sized,
{
    let app_id = manifest.app_id();
    let mut tags = Vec::with_capacity(manifest.parts.len());

    for (part_name, part) in &manifest.parts {
        let tag = manifest.image_tag(part_name);
        let context = resolve_relative(manifest_path, &part.src);
        info!("Building part {} of {} as {}", part_name, app_id, tag);

        let exit_code = engine.build(&tag, &context.to_string_lossy()).await?;
        if exit_code != Some(0) {
            return Err(CliError::ImageBuildError {
                part: part_name.clone(),
                exit_code,
            });
        }

        debug!("Built {}", tag);
        tags.push(tag);
    }

    Ok(tags)
}
