//! Docker CLI backed container engine

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::deploy::engine::ContainerEngine;
use crate::errors::CliError;

/// Shells out to `docker` (or a compatible tool such as `podman`)
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: &[&str]) -> Command {
        debug!("Running: {} {}", self.program, args.join(" "));
        let mut command = Command::new(&self.program);
        command.args(args).kill_on_drop(true);
        command
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn ping(&self) -> Result<(), CliError> {
        let output = self
            .command(&["info"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CliError::EngineUnavailable(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CliError::EngineUnavailable(stderr.trim().to_string()));
        }

        // `info` output differs between docker and podman, only its status matters
        debug!("{} info returned {} bytes", self.program, output.stdout.len());
        Ok(())
    }

    async fn build(&self, tag: &str, context: &str) -> Result<Option<i32>, CliError> {
        // stdout/stderr are inherited so build output streams to the terminal
        let status = self
            .command(&["build", "-t", tag, context])
            .status()
            .await
            .map_err(|e| CliError::EngineUnavailable(format!("failed to run {} build: {}", self.program, e)))?;

        Ok(status.code())
    }

    async fn tag(&self, source: &str, target: &str) -> Result<(), CliError> {
        let output = self
            .command(&["tag", source, target])
            .output()
            .await
            .map_err(|e| CliError::Internal(format!("failed to run {} tag: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CliError::Internal(format!(
                "{} tag {} {} failed: {}",
                self.program,
                source,
                target,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn push(&self, target: &str) -> Result<(), CliError> {
        let status = self
            .command(&["push", target])
            .status()
            .await
            .map_err(|e| CliError::Internal(format!("failed to run {} push: {}", self.program, e)))?;

        if !status.success() {
            return Err(CliError::Internal(match status.code() {
                Some(code) => format!("{} push exited with code {}", self.program, code),
                None => format!("{} push was terminated by a signal", self.program),
            }));
        }
        Ok(())
    }
}
