//! Container engine abstraction

use async_trait::async_trait;

use crate::errors::CliError;

/// Operations the deploy flow needs from the local container tooling
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check the engine is reachable
    async fn ping(&self) -> Result<(), CliError>;

    /// Build `context` into a local image tagged `tag`
    ///
    /// Returns the build tool's exit code; `Some(0)` means the tag now resolves
    /// to a local image, `None` means the build was killed by a signal.
    async fn build(&self, tag: &str, context: &str) -> Result<Option<i32>, CliError>;

    /// Add `target` as another tag of the local image `source`
    async fn tag(&self, source: &str, target: &str) -> Result<(), CliError>;

    /// Push `target`, streaming progress to stdout
    async fn push(&self, target: &str) -> Result<(), CliError>;
}
