// ── Project update hook ──
//
// One managed socket on the `projects` topic. Inbound events are decoded
// into `ProjectEvent` and routed to caller-supplied callbacks.

use std::sync::Arc;

use devforge_api::websocket::topic_url;
use devforge_api::{Connection, ConnectionState, Envelope, ProjectEvent};
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::config::RealtimeConfig;
use crate::error::CoreError;
use crate::model::{LogEntry, Project, Service};

type ProjectFn = Arc<dyn Fn(Project) + Send + Sync>;
type DeletedFn = Arc<dyn Fn(String) + Send + Sync>;
type LogsFn = Arc<dyn Fn(String, Service, Vec<LogEntry>) + Send + Sync>;

/// Callbacks for the `projects` topic. Unset callbacks drop their event.
#[derive(Clone, Default)]
pub struct ProjectCallbacks {
    on_project_update: Option<ProjectFn>,
    on_project_created: Option<ProjectFn>,
    on_project_deleted: Option<DeletedFn>,
    on_logs_updated: Option<LogsFn>,
}

impl ProjectCallbacks {
    #[must_use]
    pub fn on_project_update(mut self, f: impl Fn(Project) + Send + Sync + 'static) -> Self {
        self.on_project_update = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_project_created(mut self, f: impl Fn(Project) + Send + Sync + 'static) -> Self {
        self.on_project_created = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_project_deleted(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_project_deleted = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_logs_updated(
        mut self,
        f: impl Fn(String, Service, Vec<LogEntry>) + Send + Sync + 'static,
    ) -> Self {
        self.on_logs_updated = Some(Arc::new(f));
        self
    }

    /// Route one decoded event.
    pub fn dispatch(&self, event: ProjectEvent) {
        match event {
            ProjectEvent::Updated(project) => {
                if let Some(f) = &self.on_project_update {
                    f(*project);
                }
            }
            ProjectEvent::Created(project) => {
                if let Some(f) = &self.on_project_created {
                    f(*project);
                }
            }
            ProjectEvent::Deleted { project_id } => {
                if let Some(f) = &self.on_project_deleted {
                    f(project_id);
                }
            }
            ProjectEvent::LogsUpdated {
                project_id,
                service,
                logs,
            } => {
                if let Some(f) = &self.on_logs_updated {
                    f(project_id, service, logs);
                }
            }
            ProjectEvent::Unknown { kind } => {
                warn!(kind = %kind, "ignoring unknown project event");
            }
        }
    }

    fn handle(&self, envelope: Envelope) {
        match ProjectEvent::from_envelope(envelope) {
            Ok(event) => self.dispatch(event),
            Err(e) => warn!(error = %e, "dropping malformed project event payload"),
        }
    }
}

/// Realtime subscription to project-collection changes.
pub struct ProjectUpdates {
    connection: Connection,
}

impl ProjectUpdates {
    /// Build the hook under `ws_base`. Does not connect.
    pub fn new(
        ws_base: &Url,
        config: &RealtimeConfig,
        callbacks: ProjectCallbacks,
    ) -> Result<Self, CoreError> {
        let url = topic_url(ws_base, &["projects"])?;
        debug!(url = %url, "project update hook created");
        Ok(Self {
            connection: Connection::new(url, config.reconnect(), move |envelope| {
                callbacks.handle(envelope);
            }),
        })
    }

    pub fn connect(&self) {
        self.connection.connect();
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.watch_state()
    }

    pub fn error(&self) -> Option<String> {
        self.connection.error()
    }

    pub fn url(&self) -> &Url {
        self.connection.url()
    }
}
