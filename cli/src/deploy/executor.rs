//! Deploy orchestrator

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::deploy::builder::build_images;
use crate::deploy::engine::ContainerEngine;
use crate::deploy::fsm::{DeployEvent, DeployFsm, DeployState};
use crate::deploy::manifest::{load_manifest, validate_manifest};
use crate::deploy::publisher::push_images;
use crate::errors::CliError;
use crate::http::apps::{api_rejection, UploadOutcome};
use crate::http::client::HttpClient;
use crate::models::app::AppManifest;
use crate::registry::proxy::RegistryProxy;
use crate::registry::session::RegistrySession;
use crate::storage::settings::CliConfig;

/// Summary of a successful deploy
#[derive(Debug, Clone, PartialEq)]
pub struct DeployReport {
    /// App identity used for image names
    pub app_id: String,

    /// App name from the manifest
    pub app_name: String,

    /// Local tags that were built and pushed
    pub images: Vec<String>,

    /// Whether the app replaced an installed version
    pub updated: bool,

    /// Server the app was deployed to
    pub server_url: String,
}

/// Runs one deploy: build, open registry, relay pushes, register, close
pub struct DeployExecutor<'a, E: ContainerEngine + ?Sized> {
    engine: &'a E,
    client: HttpClient,
    fsm: DeployFsm,
}

impl<'a, E: ContainerEngine + ?Sized> DeployExecutor<'a, E> {
    /// Create an executor for the configured server
    pub fn new(config: &CliConfig, engine: &'a E, timeout: Duration) -> Result<Self, CliError> {
        Ok(Self {
            engine,
            client: HttpClient::new(&config.server, timeout)?,
            fsm: DeployFsm::new(),
        })
    }

    /// Get the current deploy state
    pub fn state(&self) -> &DeployState {
        self.fsm.state()
    }

    /// Deploy the app described by the manifest at `manifest_path`
    pub async fn deploy(&mut self, manifest_path: &Path) -> Result<DeployReport, CliError> {
        self.advance(DeployEvent::Begin)?;

        let result = self.run(manifest_path).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    async fn run(&mut self, manifest_path: &Path) -> Result<DeployReport, CliError> {
        let manifest = load_manifest(manifest_path).await?;
        validate_manifest(&manifest, manifest_path).await?;
        self.engine.ping().await?;
        self.advance(DeployEvent::ManifestLoaded)?;

        println!("Building {}", manifest.name);
        let images = build_images(self.engine, &manifest, manifest_path).await?;
        self.advance(DeployEvent::ImagesBuilt)?;

        println!("Deploying app to the server");
        let session = RegistrySession::open(&self.client).await?;

        let outcome = self.with_session(&manifest, manifest_path, &session).await;
        if let Err(e) = &outcome {
            self.record_failure(e);
        }

        let closed = session.close(&self.client).await;

        match (outcome, closed) {
            (Ok(updated), Ok(())) => {
                self.advance(DeployEvent::RegistryClosed)?;
                info!("Deployed {} ({} images)", manifest.app_id(), images.len());
                Ok(DeployReport {
                    app_id: manifest.app_id(),
                    app_name: manifest.name.clone(),
                    images,
                    updated,
                    server_url: self.client.base_url().to_string(),
                })
            }
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Ok(())) => {
                if let Err(fsm_err) = self.advance(DeployEvent::RegistryClosed) {
                    debug!("{}", fsm_err);
                }
                Err(e)
            }
            (Err(e), Err(close_err)) => {
                warn!("{}", close_err);
                self.record_failure(&close_err);
                Err(e)
            }
        }
    }

    /// Everything that happens while the registry session is held
    ///
    /// Returns whether the app was registered as an update.
    async fn with_session(
        &mut self,
        manifest: &AppManifest,
        manifest_path: &Path,
        session: &RegistrySession,
    ) -> Result<bool, CliError> {
        self.advance(DeployEvent::RegistryOpened)?;

        let proxy = RegistryProxy::start(session.target()).await?;
        self.advance(DeployEvent::ProxyStarted)?;

        let pushed = push_images(self.engine, manifest, proxy.port()).await;
        if let Err(e) = proxy.shutdown().await {
            warn!("Failed to stop registry relay: {}", e);
        }
        let pushed = pushed?;
        debug!("Pushed {:?}", pushed);
        self.advance(DeployEvent::ImagesPushed)?;

        self.register(manifest, manifest_path).await
    }

    /// Upload the app, retrying once as an update if it is already installed
    async fn register(&mut self, manifest: &AppManifest, manifest_path: &Path) -> Result<bool, CliError> {
        let mut update = false;

        loop {
            match self.client.upload_app(manifest_path, manifest, update).await? {
                UploadOutcome::Deployed => {
                    self.advance(DeployEvent::Uploaded)?;
                    return Ok(update);
                }
                UploadOutcome::AlreadyInstalled { status, result } => {
                    if update {
                        return Err(api_rejection(status, result));
                    }
                    info!("{} is already installed, retrying as an update", manifest.app_id());
                    println!("App is already installed, updating it");
                    self.advance(DeployEvent::AppInstalled)?;
                    update = true;
                }
            }
        }
    }

    fn advance(&mut self, event: DeployEvent) -> Result<(), CliError> {
        let from = self.fsm.state().clone();
        self.fsm.process(event).map_err(CliError::Internal)?;
        debug!("Deploy state {:?} -> {:?}", from, self.fsm.state());
        Ok(())
    }

    fn record_failure(&mut self, error: &CliError) {
        if self.fsm.is_terminal() {
            return;
        }
        if let Err(e) = self.fsm.process(DeployEvent::Fail(error.to_string())) {
            debug!("Could not record failure: {}", e);
        }
    }
}
