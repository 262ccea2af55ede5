//! Local registry relay
//!
//! A loopback HTTP server that forwards every request to the remote registry
//! session. The container engine pushes to `localhost:<port>`, which it treats
//! as an insecure local registry, while the relay streams layers to the
//! server without buffering them. `https` targets are reached over rustls
//! with the platform's root certificates.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::CliError;

/// How long `shutdown` waits for in-flight transfers before aborting the relay
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

struct RelayTarget {
    host: String,
    port: u16,
    authority: String,
    tls: Option<TlsConnector>,
}

fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = roots.add_parsable_certificates(certs);
            debug!("Loaded {} native root certificates ({} ignored)", added, ignored);
        }
        Err(e) => warn!("Failed to load native root certificates: {}", e),
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Handle to a running relay; the relay stops when the handle is shut down
/// or dropped.
#[derive(Debug)]
pub struct RegistryProxy {
    port: u16,
    cancel: CancellationToken,
    handle: Option<JoinHandle<Result<(), CliError>>>,
}

impl RegistryProxy {
    /// Bind `127.0.0.1` on a free port and start relaying to `target`
    pub async fn start(target: &Url) -> Result<Self, CliError> {
        let host = target
            .host_str()
            .ok_or_else(|| CliError::ServerError(format!("relay target {} has no host", target)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = target
            .port_or_known_default()
            .ok_or_else(|| CliError::ServerError(format!("relay target {} has no port", target)))?;
        let tls = match target.scheme() {
            "http" => None,
            "https" => Some(tls_connector()),
            other => {
                return Err(CliError::ServerError(format!(
                    "unsupported relay target scheme '{}'",
                    other
                )))
            }
        };
        let relay_target = Arc::new(RelayTarget {
            authority: format!("{}:{}", target.host_str().unwrap_or(&host), port),
            host,
            port,
            tls,
        });

        let app = Router::new()
            .fallback(relay)
            .with_state(relay_target.clone())
            .layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| CliError::ServerError(format!("failed to bind relay: {}", e)))?;
        let local_port = listener.local_addr()?.port();
        info!(
            "Relaying localhost:{} to registry {}",
            local_port, relay_target.authority
        );

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(|e| CliError::ServerError(e.to_string()))
        });

        Ok(Self {
            port: local_port,
            cancel,
            handle: Some(handle),
        })
    }

    /// Port the relay listens on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting connections and wait for the relay task to finish
    pub async fn shutdown(mut self) -> Result<(), CliError> {
        self.cancel.cancel();

        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(Ok(result)) => {
                debug!("Relay on port {} stopped", self.port);
                result
            }
            Ok(Err(e)) => Err(CliError::Internal(format!("relay task failed: {}", e))),
            Err(_) => {
                warn!("Relay on port {} did not drain in time, aborting", self.port);
                handle.abort();
                Ok(())
            }
        }
    }
}

impl Drop for RegistryProxy {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn relay(State(target): State<Arc<RelayTarget>>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match forward(&target, request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Relay {} {} failed: {}", method, path, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

/// Forward one request over a fresh upstream connection, streaming both bodies
async fn forward(target: &RelayTarget, request: Request) -> Result<Response, CliError> {
    let stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| CliError::ServerError(format!("failed to connect to {}: {}", target.authority, e)))?;

    match &target.tls {
        None => send(target, stream, request).await,
        Some(connector) => {
            let server_name = ServerName::try_from(target.host.as_str())
                .map_err(|e| CliError::ServerError(format!("invalid server name {}: {}", target.host, e)))?
                .to_owned();
            let stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| CliError::ServerError(format!("TLS handshake with {} failed: {}", target.authority, e)))?;
            send(target, stream, request).await
        }
    }
}

async fn send<IO>(target: &RelayTarget, io: IO, request: Request) -> Result<Response, CliError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .map_err(|e| CliError::ServerError(format!("handshake with {} failed: {}", target.authority, e)))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "Upstream connection error");
        }
    });

    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut builder = hyper::Request::builder().method(parts.method).uri(path);

    // The incoming Host is kept so registry-generated Location headers point
    // back at the relay
    if let Some(headers) = builder.headers_mut() {
        *headers = parts.headers;
        strip_hop_by_hop(headers);
        if !headers.contains_key(header::HOST) {
            let authority = target
                .authority
                .parse()
                .map_err(|_| CliError::ServerError(format!("invalid authority {}", target.authority)))?;
            headers.insert(header::HOST, authority);
        }
    }

    let outbound = builder
        .body(body)
        .map_err(|e| CliError::ServerError(format!("failed to build relay request: {}", e)))?;

    let response = sender
        .send_request(outbound)
        .await
        .map_err(|e| CliError::ServerError(format!("relay request failed: {}", e)))?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
