//! Utility functions

use std::time::Duration;

use anyhow::Context;
use semver::Version;
use serde::Deserialize;

/// Where published CLI releases are looked up
pub const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/CyberL1/localapps-cli/releases/latest";

/// Version information for the CLI
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// A published release
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

/// Fetch the latest published release
pub async fn fetch_latest_release(url: &str, timeout: Duration) -> anyhow::Result<Release> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("localapps-cli/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;

    let release = client
        .get(url)
        .send()
        .await
        .context("failed to reach the release server")?
        .error_for_status()
        .context("release lookup was rejected")?
        .json::<Release>()
        .await
        .context("unexpected release payload")?;

    Ok(release)
}

/// Parse a version, tolerating a leading `v`
pub fn parse_version(raw: &str) -> anyhow::Result<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
        .with_context(|| format!("invalid version {:?}", raw))
}

/// Whether `latest` is a newer release than `current`
pub fn is_newer(current: &str, latest: &str) -> anyhow::Result<bool> {
    Ok(parse_version(current)? < parse_version(latest)?)
}
