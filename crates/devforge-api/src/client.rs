// HTTP client for the devforge backend
//
// Wraps `reqwest::Client` with URL construction and `{success, data, error}`
// envelope unwrapping. Workspace endpoints return bare JSON documents and
// are parsed without the envelope.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    ApiResponse, CreateProjectRequest, LogEntry, Project, Service, SystemStats,
    WorkspaceImportRequest, WorkspaceImportResponse, WorkspaceSchema, WorkspaceValidateResponse,
};
use crate::transport::TransportConfig;

/// Typed client for the backend's `/api` surface.
///
/// All project methods return the unwrapped `data` payload; the envelope
/// is stripped before the caller sees it.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root, e.g. `http://localhost:8080`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Projects ─────────────────────────────────────────────────────

    pub async fn list_projects(&self) -> Result<Vec<Project>, Error> {
        let url = self.endpoint(&["api", "projects"])?;
        self.get(url).await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, Error> {
        let url = self.endpoint(&["api", "projects", id])?;
        self.get(url).await
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project, Error> {
        let url = self.endpoint(&["api", "projects"])?;
        self.post(url, request).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), Error> {
        let url = self.endpoint(&["api", "projects", id])?;
        debug!("DELETE {}", url);

        let resp = self.http.delete(url).send().await.map_err(Error::Transport)?;
        parse_envelope::<serde_json::Value>(resp)
            .await
            .map(|_| ())
    }

    pub async fn start_project(&self, id: &str) -> Result<Project, Error> {
        self.project_action(id, "start").await
    }

    pub async fn stop_project(&self, id: &str) -> Result<Project, Error> {
        self.project_action(id, "stop").await
    }

    pub async fn restart_project(&self, id: &str) -> Result<Project, Error> {
        self.project_action(id, "restart").await
    }

    pub async fn project_logs(&self, id: &str, service: Service) -> Result<Vec<LogEntry>, Error> {
        let url = self.endpoint(&["api", "projects", id, "logs", service.as_ref()])?;
        self.get(url).await
    }

    // ── System ───────────────────────────────────────────────────────

    pub async fn system_stats(&self) -> Result<SystemStats, Error> {
        let url = self.endpoint(&["api", "system", "stats"])?;
        self.get(url).await
    }

    // ── Workspaces ───────────────────────────────────────────────────

    /// Export the backend's workspace document.
    pub async fn export_workspace(&self, include_secrets: bool) -> Result<WorkspaceSchema, Error> {
        let mut url = self.endpoint(&["api", "workspaces", "export"])?;
        if include_secrets {
            url.query_pairs_mut().append_pair("include_secrets", "true");
        }
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        parse_plain(resp).await
    }

    pub async fn import_workspace(
        &self,
        schema: &WorkspaceSchema,
        overwrite: bool,
    ) -> Result<WorkspaceImportResponse, Error> {
        let url = self.endpoint(&["api", "workspaces", "import"])?;
        debug!("POST {}", url);

        let body = WorkspaceImportRequest {
            workspace_data: schema,
            overwrite,
        };
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;
        parse_plain(resp).await
    }

    /// Server-side validation of a workspace document.
    pub async fn validate_workspace(
        &self,
        schema: &WorkspaceSchema,
    ) -> Result<WorkspaceValidateResponse, Error> {
        let url = self.endpoint(&["api", "workspaces", "validate"])?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(schema)
            .send()
            .await
            .map_err(Error::Transport)?;
        parse_plain(resp).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build a URL under the base, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn project_action(&self, id: &str, action: &str) -> Result<Project, Error> {
        let url = self.endpoint(&["api", "projects", id, action])?;
        self.post(url, &serde_json::json!({})).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        parse_required(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        parse_required(resp).await
    }
}

async fn parse_required<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    parse_envelope(resp)
        .await?
        .ok_or_else(|| Error::Deserialization {
            message: "response envelope carried no data".into(),
            body: String::new(),
        })
}

/// Parse the `{success, data, error}` envelope, returning `data` on
/// success or `Error::RequestFailed` with the server's message.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Option<T>, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(Error::RequestFailed {
            status: Some(status.as_u16()),
            message: server_message(&body)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })?;

    if envelope.success {
        Ok(envelope.data)
    } else {
        Err(Error::RequestFailed {
            status: None,
            message: envelope
                .error
                .unwrap_or_else(|| "API request failed".into()),
        })
    }
}

/// Parse a bare (non-enveloped) JSON response.
async fn parse_plain<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(Error::RequestFailed {
            status: Some(status.as_u16()),
            message: server_message(&body)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Pull a human-readable message out of an error body, if it has one.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
}
