//! Deploy pipeline tests against the fake server and engine

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use localapps::deploy::executor::DeployExecutor;
use localapps::deploy::fsm::DeployState;
use localapps::errors::CliError;

use crate::common::{EngineCall, FakeEngine, FakeServer, Project};

const DEMO: &str = "name: Demo\nparts:\n  web:\n    src: ./web\n";
const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_single_part_deploy_succeeds() {
    let server = FakeServer::start().await;
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(Some("secret-key"));

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let report = executor.deploy(&project.manifest_path()).await.unwrap();

    assert_eq!(report.app_id, "demo");
    assert_eq!(report.images, vec!["localapps/apps/demo/web".to_string()]);
    assert!(!report.updated);
    assert_eq!(report.server_url, server.url);
    assert_eq!(executor.state(), &DeployState::Done);

    let recorded = server.recorded();
    assert_eq!(recorded.registry_opens, 1);
    assert_eq!(recorded.registry_closes, 1);
    assert_eq!(recorded.uploads.len(), 1);
    assert!(recorded.uploads[0].update.is_none());
    assert!(recorded
        .authorization
        .iter()
        .all(|auth| auth.as_deref() == Some("secret-key")));

    let calls = engine.calls();
    assert_eq!(calls[0], EngineCall::Ping);
    match &calls[1] {
        EngineCall::Build { tag, context } => {
            assert_eq!(tag, "localapps/apps/demo/web");
            assert!(context.ends_with("web"));
        }
        other => panic!("expected a build, got {:?}", other),
    }
    let pushes = engine.pushes();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].starts_with("localhost:"));
    assert!(pushes[0].ends_with("/localapps/apps/demo/web"));
}

#[tokio::test]
async fn test_every_part_is_built_and_pushed_once() {
    let server = FakeServer::start().await;
    let project = Project::new(
        "name: My App\nparts:\n  web:\n    src: web\n  api:\n    src: api\n  worker:\n    src: worker\n",
        &["web", "api", "worker"],
    );
    let engine = FakeEngine::new();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    executor.deploy(&project.manifest_path()).await.unwrap();

    assert_eq!(
        engine.builds(),
        vec![
            "localapps/apps/my-app/api",
            "localapps/apps/my-app/web",
            "localapps/apps/my-app/worker",
        ]
    );

    let pushes = engine.pushes();
    assert_eq!(pushes.len(), 3);
    for (push, part) in pushes.iter().zip(["api", "web", "worker"]) {
        assert!(push.ends_with(&format!("/localapps/apps/my-app/{}", part)));
    }

    let tags: Vec<EngineCall> = engine
        .calls()
        .into_iter()
        .filter(|c| matches!(c, EngineCall::Tag { .. }))
        .collect();
    assert_eq!(tags.len(), 3);
    assert!(server.recorded().authorization.iter().all(Option::is_none));
}

#[tokio::test]
async fn test_already_installed_retries_once_as_update() {
    let server = FakeServer::start().await;
    server.respond_to_upload(
        StatusCode::CONFLICT,
        json!({ "code": "AppInstalled", "message": "App is already installed" }),
    );
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let report = executor.deploy(&project.manifest_path()).await.unwrap();
    assert!(report.updated);

    let recorded = server.recorded();
    assert_eq!(recorded.uploads.len(), 2);
    assert!(recorded.uploads[0].update.is_none());
    assert_eq!(recorded.uploads[1].update.as_deref(), Some("true"));
    assert_eq!(recorded.uploads[0].file, recorded.uploads[1].file);
    assert_eq!(recorded.registry_opens, 1);
    assert_eq!(recorded.registry_closes, 1);

    // The retry re-registers only; images are built and pushed once
    assert_eq!(engine.builds().len(), 1);
    assert_eq!(engine.pushes().len(), 1);
}

#[tokio::test]
async fn test_second_already_installed_is_terminal() {
    let server = FakeServer::start().await;
    for _ in 0..3 {
        server.respond_to_upload(
            StatusCode::CONFLICT,
            json!({ "code": "AppInstalled", "message": "App is already installed" }),
        );
    }
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    match &err {
        CliError::ApiRejection { status, code, .. } => {
            assert_eq!(*status, 409);
            assert_eq!(code, "AppInstalled");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 10);
    assert_eq!(executor.state(), &DeployState::Failed);

    let recorded = server.recorded();
    assert_eq!(recorded.uploads.len(), 2);
    assert_eq!(recorded.registry_closes, 1);
}

#[tokio::test]
async fn test_api_rejection_still_closes_registry() {
    let server = FakeServer::start().await;
    server.respond_to_upload(
        StatusCode::BAD_REQUEST,
        json!({ "code": "InvalidApp", "message": "Manifest is invalid", "error": "parts missing" }),
    );
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    match err {
        CliError::ApiRejection { code, message, detail, .. } => {
            assert_eq!(code, "InvalidApp");
            assert_eq!(message, "Manifest is invalid");
            assert_eq!(detail.as_deref(), Some("parts missing"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let recorded = server.recorded();
    assert_eq!(recorded.uploads.len(), 1);
    assert_eq!(recorded.registry_opens, 1);
    assert_eq!(recorded.registry_closes, 1);
}

#[tokio::test]
async fn test_build_failure_aborts_before_registry() {
    let server = FakeServer::start().await;
    let project = Project::new(
        "name: Demo\nparts:\n  api:\n    src: api\n  web:\n    src: web\n",
        &["api", "web"],
    );
    let engine = FakeEngine::new().failing_build("localapps/apps/demo/api", 1);
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    match &err {
        CliError::ImageBuildError { part, exit_code } => {
            assert_eq!(part, "api");
            assert_eq!(*exit_code, Some(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 5);
    assert_eq!(executor.state(), &DeployState::Failed);

    assert_eq!(engine.builds(), vec!["localapps/apps/demo/api"]);
    assert!(engine.pushes().is_empty());

    let recorded = server.recorded();
    assert_eq!(recorded.registry_opens, 0);
    assert_eq!(recorded.registry_closes, 0);
    assert!(recorded.uploads.is_empty());
}

#[tokio::test]
async fn test_push_failure_stops_remaining_parts_and_closes_registry() {
    let server = FakeServer::start().await;
    let project = Project::new(
        "name: Demo\nparts:\n  api:\n    src: api\n  db:\n    src: db\n  web:\n    src: web\n",
        &["api", "db", "web"],
    );
    let engine = FakeEngine::new().failing_push("/localapps/apps/demo/db");
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    match &err {
        CliError::ImagePushError { part, cause } => {
            assert_eq!(part, "db");
            assert!(cause.contains("denied"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 8);

    // web is never pushed
    assert_eq!(engine.pushes().len(), 2);

    let recorded = server.recorded();
    assert_eq!(recorded.registry_opens, 1);
    assert_eq!(recorded.registry_closes, 1);
    assert!(recorded.uploads.is_empty());
}

#[tokio::test]
async fn test_registry_open_failure() {
    let server = FakeServer::start().await;
    server.set_registry_status(StatusCode::INTERNAL_SERVER_ERROR);
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    assert!(matches!(err, CliError::RegistryOpenError(_)));
    assert_eq!(err.exit_code(), 6);
    assert!(engine.pushes().is_empty());

    let recorded = server.recorded();
    assert_eq!(recorded.registry_closes, 0);
    assert!(recorded.uploads.is_empty());
}

#[tokio::test]
async fn test_close_failure_after_success_is_reported() {
    let server = FakeServer::start().await;
    server.set_close_status(StatusCode::INTERNAL_SERVER_ERROR);
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    assert!(matches!(err, CliError::RegistryCloseError(_)));
    assert_eq!(err.exit_code(), 7);
    assert_eq!(executor.state(), &DeployState::Failed);
    assert_eq!(server.recorded().registry_closes, 1);
}

#[tokio::test]
async fn test_close_failure_does_not_mask_primary_error() {
    let server = FakeServer::start().await;
    server.set_close_status(StatusCode::INTERNAL_SERVER_ERROR);
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new().failing_push("/web");
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    assert!(matches!(err, CliError::ImagePushError { .. }));
    assert_eq!(server.recorded().registry_closes, 1);
}

#[tokio::test]
async fn test_unavailable_engine_fails_before_building() {
    let server = FakeServer::start().await;
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new().unavailable();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    assert!(matches!(err, CliError::EngineUnavailable(_)));
    assert_eq!(engine.calls(), vec![EngineCall::Ping]);
    assert_eq!(server.recorded().registry_opens, 0);
}

#[tokio::test]
async fn test_manifest_errors_stop_everything() {
    let server = FakeServer::start().await;
    let engine = FakeEngine::new();
    let config = server.config(None);

    let project = Project::new("name: Demo\nparts:\n  web:\n    src: ./missing\n", &[]);
    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();
    assert!(matches!(err, CliError::ManifestInvalid(_)));

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    let err = executor
        .deploy(&project.path().join("absent.yml"))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::ManifestReadError { .. }));
    assert_eq!(err.exit_code(), 3);

    assert!(engine.calls().is_empty());
    assert_eq!(server.recorded().registry_opens, 0);
}

#[tokio::test]
async fn test_pushes_travel_through_the_relay() {
    let server = FakeServer::start().await;
    // Point the registry session back at the fake server so the relay has an upstream
    server.set_registry_port(server.port);
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new().probing_relay();
    let config = server.config(None);

    let mut executor = DeployExecutor::new(&config, &engine, TIMEOUT).unwrap();
    executor.deploy(&project.manifest_path()).await.unwrap();

    let pushes = engine.pushes();
    let relay_authority = pushes[0].split('/').next().unwrap().to_string();

    let recorded = server.recorded();
    assert_eq!(recorded.registry_hosts.len(), 1);
    // The relay keeps the client's Host header
    assert_eq!(
        recorded.registry_hosts[0],
        relay_authority.replace("localhost", "127.0.0.1")
    );
}

#[tokio::test]
async fn test_upload_transport_failure_still_closes_registry() {
    let server = FakeServer::start().await;
    server.stall_uploads(Duration::from_secs(5));
    let project = Project::new(DEMO, &["web"]);
    let engine = FakeEngine::new();
    let config = server.config(None);

    // The upload outlives the per-request timeout
    let mut executor = DeployExecutor::new(&config, &engine, Duration::from_secs(1)).unwrap();
    let err = executor.deploy(&project.manifest_path()).await.unwrap_err();

    assert!(matches!(err, CliError::UploadTransportError(_)));
    assert_eq!(err.exit_code(), 9);
    assert_eq!(executor.state(), &DeployState::Failed);

    let recorded = server.recorded();
    assert_eq!(recorded.uploads.len(), 1);
    assert_eq!(recorded.registry_opens, 1);
    assert_eq!(recorded.registry_closes, 1);
}
