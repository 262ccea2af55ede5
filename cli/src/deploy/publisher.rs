//! Image publisher: retag and push through the local registry relay

use tracing::info;

use crate::deploy::engine::ContainerEngine;
use crate::errors::CliError;
use crate::models::app::AppManifest;

/// Tag of a part's image as addressed through the relay on `proxy_port`
pub fn relay_tag(proxy_port: u16, local_tag: &str) -> String {
    format!("localhost:{}/{}", proxy_port, local_tag)
}

/// Push every part through the relay, aborting at the first failure
///
/// Returns the pushed tags in part order.
pub async fn push_images<E>(
    engine: &E,
    manifest: &AppManifest,
    proxy_port: u16,
) -> Result<Vec<String>, CliError>
where
    E: ContainerEngine + ?Sized,
{
    let mut pushed = Vec::with_capacity(manifest.parts.len());

    for part_name in manifest.parts.keys() {
        let local_tag = manifest.image_tag(part_name);
        let target = relay_tag(proxy_port, &local_tag);
        let failed = |e: CliError| CliError::ImagePushError {
            part: part_name.clone(),
            cause: e.to_string(),
        };

        info!("Pushing {}", target);
        engine.tag(&local_tag, &target).await.map_err(failed)?;
        engine.push(&target).await.map_err(failed)?;
        pushed.push(target);
    }

    Ok(pushed)
}
