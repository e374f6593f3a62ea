// Integration tests for `ApiClient` using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devforge_api::{
    ApiClient, BackendFramework, CreateProjectRequest, Environment, Error, FrontendFramework,
    ProjectConfig, ProjectStatus, Service, ServiceRequest, WorkspaceDocument, WorkspaceProject,
    WorkspaceSchema,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
    (server, client)
}

fn project_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": "myblog",
        "status": status,
        "createdAt": "2024-01-15T10:30:00Z",
        "updatedAt": "2024-01-20T14:22:00Z",
        "frontend": { "url": "http://myblog.local", "port": 3000, "status": status, "framework": "react" },
        "backend": { "url": "http://api.myblog.local", "port": 8000, "status": status, "framework": "fastapi" },
        "environment": { "mode": "development", "variables": {} },
        "resources": { "cpu": { "usage": 0 }, "memory": { "usage": 0 }, "disk": { "usage": 0 } },
        "config": { "autoRestart": true, "watchFiles": true, "hotReload": true, "ssl": false },
        "logs": { "frontend": [], "backend": [] }
    })
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_projects() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ok(json!([project_json("p1", "running"), project_json("p2", "stopped")])))
        .mount(&server)
        .await;

    let projects = client.list_projects().await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, "p1");
    assert_eq!(projects[1].status, ProjectStatus::Stopped);
}

#[tokio::test]
async fn test_start_project_returns_updated_project() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/projects/p1/start"))
        .respond_with(ok(project_json("p1", "starting")))
        .expect(1)
        .mount(&server)
        .await;

    let project = client.start_project("p1").await.unwrap();
    assert_eq!(project.status, ProjectStatus::Starting);
    assert_eq!(project.backend.status, ProjectStatus::Starting);
}

#[tokio::test]
async fn test_create_project_posts_camel_case_body() {
    let (server, client) = setup().await;

    let request = CreateProjectRequest {
        name: "demo".into(),
        description: None,
        frontend: ServiceRequest {
            framework: FrontendFramework::Vue,
            port: Some(3100),
            build_command: None,
            start_command: Some("npm run dev".into()),
        },
        backend: ServiceRequest {
            framework: BackendFramework::Express,
            port: None,
            build_command: None,
            start_command: None,
        },
        database: None,
        environment: Environment::default(),
        config: ProjectConfig::default(),
    };

    Mock::given(method("POST"))
        .and(path("/api/projects"))
        .and(body_json(json!({
            "name": "demo",
            "frontend": { "framework": "vue", "port": 3100, "startCommand": "npm run dev" },
            "backend": { "framework": "express" },
            "environment": { "mode": "development", "variables": {} },
            "config": { "autoRestart": true, "watchFiles": true, "hotReload": true, "ssl": false }
        })))
        .respond_with(ok(project_json("new", "stopped")))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.create_project(&request).await.unwrap();
    assert_eq!(created.id, "new");
}

#[tokio::test]
async fn test_project_logs_and_delete() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/p1/logs/backend"))
        .respond_with(ok(json!([{
            "id": "l1", "timestamp": "2024-01-20T14:22:00Z", "level": "warn",
            "source": "uvicorn", "message": "slow request"
        }])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/projects/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let logs = client.project_logs("p1", Service::Backend).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].source, "uvicorn");

    client.delete_project("p1").await.unwrap();
}

#[tokio::test]
async fn test_system_stats() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/system/stats"))
        .respond_with(ok(json!({
            "totalProjects": 3, "runningProjects": 1, "stoppedProjects": 1,
            "errorProjects": 0, "buildingProjects": 1,
            "systemResources": {
                "cpu": { "usage": 35.2, "cores": 8 },
                "memory": { "used": 8192, "total": 16384, "available": 8192 },
                "disk": { "used": 102400, "total": 512000, "available": 409600 }
            },
            "networkPorts": { "used": [3000, 8000], "available": [3001], "conflicts": [] }
        })))
        .mount(&server)
        .await;

    let stats = client.system_stats().await.unwrap();
    assert_eq!(stats.total_projects, 3);
    assert_eq!(stats.system_resources.cpu.cores, 8);
    assert_eq!(stats.network_ports.used, vec![3000, 8000]);
}

// ── Workspace endpoints ─────────────────────────────────────────────

#[tokio::test]
async fn test_workspace_export_then_import() {
    let (server, client) = setup().await;

    let exported = WorkspaceSchema::new(WorkspaceDocument {
        name: "team".into(),
        projects: vec![
            WorkspaceProject {
                name: "api".into(),
                path: "./api".into(),
                ..WorkspaceProject::default()
            },
            WorkspaceProject {
                name: "web".into(),
                path: "./web".into(),
                ..WorkspaceProject::default()
            },
        ],
        ..WorkspaceDocument::default()
    });

    Mock::given(method("GET"))
        .and(path("/api/workspaces/export"))
        .and(query_param("include_secrets", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&exported))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/workspaces/import"))
        .and(body_json(json!({
            "workspace_data": serde_json::to_value(&exported).unwrap(),
            "overwrite": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workspaceId": "ws-1", "projectCount": 2, "message": "Imported"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let schema = client.export_workspace(true).await.unwrap();
    let response = client.import_workspace(&schema, false).await.unwrap();

    assert_eq!(response.project_count, schema.workspace.projects.len());
    assert_eq!(response.workspace_id, "ws-1");
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_envelope_failure_carries_server_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/missing"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "Project not found" })),
        )
        .mount(&server)
        .await;

    let err = client.get_project("missing").await.unwrap_err();
    assert!(
        matches!(&err, Error::RequestFailed { message, .. } if message == "Project not found"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/projects/p1/stop"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = client.stop_project("p1").await.unwrap_err();
    match err {
        Error::RequestFailed { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "HTTP error! status: 500");
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_keeps_raw_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/system/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client.system_stats().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body.contains("proxy")));
}
