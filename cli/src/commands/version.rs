use std::time::Duration;

use colored::Colorize;

use crate::errors::CliError;
use crate::utils::{fetch_latest_release, is_newer, version_info, LATEST_RELEASE_URL};

pub async fn cmd_version() -> Result<(), CliError> {
    let current = version_info();
    let latest = fetch_latest_release(LATEST_RELEASE_URL, Duration::from_secs(10)).await?;

    if is_newer(&current.version, &latest.tag_name)? {
        println!("{}", "A new update is available".yellow().bold());
    }

    println!(
        "Your CLI Version: {} ({}, built {})\nLatest CLI version: {}",
        current.version, current.git_hash, current.build_time, latest.tag_name
    );
    Ok(())
}
