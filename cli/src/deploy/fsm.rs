//! Finite State Machine for the deploy pipeline
//!
//! ```text
//! Pending -> LoadingManifest -> BuildingImages -> OpeningRegistry
//!   -> StartingProxy -> PushingImages -> Uploading [-> Updating]
//!   -> ClosingRegistry -> Done | Failed
//! ```
//!
//! A failure after the registry opened always routes through
//! `ClosingRegistry`; a failure before that goes straight to `Failed`.

use serde::{Deserialize, Serialize};

/// Deploy state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    /// Nothing started yet
    Pending,

    /// Reading and validating the manifest
    LoadingManifest,

    /// Building part images locally
    BuildingImages,

    /// Requesting a registry session from the server
    OpeningRegistry,

    /// Starting the local relay
    StartingProxy,

    /// Pushing part images through the relay
    PushingImages,

    /// First registration attempt
    Uploading,

    /// Registration retried as an update
    Updating,

    /// Releasing the registry session
    ClosingRegistry,

    /// Deploy succeeded
    Done,

    /// Deploy failed
    Failed,
}

/// Deploy event
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// Start the pipeline
    Begin,

    /// Manifest read and validated
    ManifestLoaded,

    /// All images built
    ImagesBuilt,

    /// Registry session opened
    RegistryOpened,

    /// Relay listening
    ProxyStarted,

    /// All images pushed
    ImagesPushed,

    /// Server answered that the app is already installed
    AppInstalled,

    /// Server accepted the app
    Uploaded,

    /// Registry session released
    RegistryClosed,

    /// A step failed
    Fail(String),
}

/// Deploy FSM
#[derive(Debug, Clone)]
pub struct DeployFsm {
    state: DeployState,
    error: Option<String>,
    registry_open: bool,
    updated: bool,
}

impl DeployFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: DeployState::Pending,
            error: None,
            registry_open: false,
            updated: false,
        }
    }

    /// Get current state
    pub fn state(&self) -> &DeployState {
        &self.state
    }

    /// First error recorded, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a registry session is currently held
    pub fn registry_open(&self) -> bool {
        self.registry_open
    }

    /// Whether registration went through the update edge
    pub fn updated(&self) -> bool {
        self.updated
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, DeployState::Done | DeployState::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeployEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeployState::Pending, DeployEvent::Begin) => DeployState::LoadingManifest,
            (DeployState::LoadingManifest, DeployEvent::ManifestLoaded) => DeployState::BuildingImages,
            (DeployState::BuildingImages, DeployEvent::ImagesBuilt) => DeployState::OpeningRegistry,
            (DeployState::OpeningRegistry, DeployEvent::RegistryOpened) => {
                self.registry_open = true;
                DeployState::StartingProxy
            }
            (DeployState::StartingProxy, DeployEvent::ProxyStarted) => DeployState::PushingImages,
            (DeployState::PushingImages, DeployEvent::ImagesPushed) => DeployState::Uploading,

            // Only the first attempt may turn into an update
            (DeployState::Uploading, DeployEvent::AppInstalled) => {
                self.updated = true;
                DeployState::Updating
            }
            (DeployState::Uploading | DeployState::Updating, DeployEvent::Uploaded) => {
                DeployState::ClosingRegistry
            }

            (DeployState::ClosingRegistry, DeployEvent::RegistryClosed) => {
                self.registry_open = false;
                if self.error.is_some() {
                    DeployState::Failed
                } else {
                    DeployState::Done
                }
            }
            (DeployState::ClosingRegistry, DeployEvent::Fail(err)) => {
                self.registry_open = false;
                if self.error.is_none() {
                    self.error = Some(err.clone());
                }
                DeployState::Failed
            }

            (state, DeployEvent::Fail(err))
                if !matches!(
                    state,
                    DeployState::Pending | DeployState::Done | DeployState::Failed
                ) =>
            {
                self.error = Some(err.clone());
                if self.registry_open {
                    DeployState::ClosingRegistry
                } else {
                    DeployState::Failed
                }
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}
