// Remote-mode ProjectStore against a wiremock backend.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devforge_core::model::validate_workspace_json;
use devforge_core::{
    CoreError, ForgeConfig, ProjectDraft, ProjectStatus, ProjectStore, Service, StoreMode,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn project_json(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": status,
        "createdAt": "2024-01-15T10:30:00Z",
        "updatedAt": "2024-01-20T14:22:00Z",
        "frontend": { "url": format!("http://{name}.local"), "port": 3000, "status": status, "framework": "react" },
        "backend": { "url": format!("http://api.{name}.local"), "port": 8000, "status": status, "framework": "fastapi" },
        "environment": { "mode": "development", "variables": {} },
        "resources": { "cpu": { "usage": 0 }, "memory": { "usage": 0 }, "disk": { "usage": 0 } },
        "config": { "autoRestart": true, "watchFiles": true, "hotReload": true, "ssl": false },
        "logs": { "frontend": [], "backend": [] }
    })
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn config_for(server: &MockServer) -> ForgeConfig {
    let mut config = ForgeConfig {
        api_url: Url::parse(&server.uri()).unwrap(),
        ..ForgeConfig::default()
    };
    config.realtime.enabled = false;
    config
}

async fn remote_store(projects: Value) -> (MockServer, ProjectStore) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(projects))
        .mount(&server)
        .await;
    let store = ProjectStore::new(config_for(&server)).unwrap();
    assert_eq!(store.init().await, StoreMode::Remote);
    (server, store)
}

// ── Source selection ────────────────────────────────────────────────

#[tokio::test]
async fn reachable_backend_selects_remote_mode() {
    let (_server, store) = remote_store(json!([project_json("p1", "myblog", "running")])).await;
    assert_eq!(store.mode(), Some(StoreMode::Remote));
    assert_eq!(store.projects().len(), 1);
    assert!(store.realtime_state().is_none());
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_mock_for_good() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let store = ProjectStore::new(config_for(&server)).unwrap();
    assert_eq!(store.init().await, StoreMode::Mock);
    // Later calls never contact the backend again.
    assert_eq!(store.get_projects().await.unwrap().len(), 3);
    assert_eq!(store.init().await, StoreMode::Mock);
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_projects_replaces_list_and_notifies_on_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([project_json("p1", "myblog", "running")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([
            project_json("p1", "myblog", "running"),
            project_json("p2", "shop", "stopped"),
        ])))
        .mount(&server)
        .await;

    let store = ProjectStore::new(config_for(&server)).unwrap();
    store.init().await;

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let _sub = store.subscribe(move |projects| sink.lock().unwrap().push(projects.len()));

    assert_eq!(store.get_projects().await.unwrap().len(), 2);
    // Unchanged refetch: no notification.
    store.get_projects().await.unwrap();
    assert_eq!(*calls.lock().unwrap(), [2]);
}

#[tokio::test]
async fn missing_project_and_failed_logs_degrade_quietly() {
    let (server, store) = remote_store(json!([])).await;
    Mock::given(method("GET"))
        .and(path("/api/projects/ghost"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "success": false, "error": "Project not found" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/ghost/logs/backend"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(store.get_project("ghost").await.is_none());
    assert!(store.get_project_logs("ghost", Service::Backend).await.is_empty());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn start_replaces_project_with_backend_copy() {
    let (server, store) = remote_store(json!([project_json("p1", "myblog", "stopped")])).await;
    Mock::given(method("POST"))
        .and(path("/api/projects/p1/start"))
        .respond_with(ok(project_json("p1", "myblog", "starting")))
        .mount(&server)
        .await;

    assert!(store.start_project("p1").await);
    assert_eq!(store.projects()[0].status, ProjectStatus::Starting);
    assert_eq!(store.pending_transitions(), 0);
}

#[tokio::test]
async fn failed_operation_returns_false() {
    let (server, store) = remote_store(json!([project_json("p1", "myblog", "running")])).await;
    Mock::given(method("POST"))
        .and(path("/api/projects/p1/stop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "container busy" })),
        )
        .mount(&server)
        .await;

    assert!(!store.stop_project("p1").await);
    assert_eq!(store.projects()[0].status, ProjectStatus::Running);
}

#[tokio::test]
async fn create_and_delete_go_through_backend() {
    let (server, store) = remote_store(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/projects"))
        .and(body_partial_json(json!({ "name": "demo", "frontend": { "framework": "react" } })))
        .respond_with(ok(project_json("srv-1", "demo", "stopped")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/projects/srv-1"))
        .respond_with(ok(Value::Null))
        .mount(&server)
        .await;

    let created = store.create_project(ProjectDraft::named("demo")).await.unwrap();
    assert_eq!(created.id, "srv-1");
    assert_eq!(store.projects().len(), 1);

    assert!(store.delete_project("srv-1").await);
    assert!(store.projects().is_empty());
}

#[tokio::test]
async fn create_failure_surfaces_server_message() {
    let (server, store) = remote_store(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/projects"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "success": false, "error": "name already taken" })),
        )
        .mount(&server)
        .await;

    let err = store.create_project(ProjectDraft::named("demo")).await.unwrap_err();
    match err {
        CoreError::Api { message, status } => {
            assert_eq!(message, "name already taken");
            assert_eq!(status, Some(409));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

// ── Workspaces ──────────────────────────────────────────────────────

const WORKSPACE: &str = r#"{
    "version": "2.0",
    "workspace": {
        "name": "team",
        "projects": [ { "name": "api", "path": "./api", "services": [] } ]
    }
}"#;

#[tokio::test]
async fn backend_rejection_is_a_validation_error() {
    let (server, store) = remote_store(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/workspaces/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": false,
            "errors": ["path ./api does not exist"]
        })))
        .mount(&server)
        .await;

    let err = store.validate_workspace(WORKSPACE).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid workspace file: Rejected by backend: path ./api does not exist"
    );
}

#[tokio::test]
async fn import_refreshes_the_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([project_json("p9", "api", "stopped")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/workspaces/import"))
        .and(body_partial_json(json!({ "overwrite": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workspaceId": "ws-1",
            "projectCount": 1,
            "message": "Workspace imported"
        })))
        .mount(&server)
        .await;

    let store = ProjectStore::new(config_for(&server)).unwrap();
    store.init().await;
    let schema = validate_workspace_json(WORKSPACE).unwrap().schema;
    let response = store.import_workspace(&schema, true).await.unwrap();

    assert_eq!(response.workspace_id, "ws-1");
    assert_eq!(response.project_count, 1);
    assert_eq!(store.projects()[0].id, "p9");
}
