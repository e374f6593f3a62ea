// ── ProjectStore ──
//
// Every operation first resolves the data source (`init`), then either
// calls the backend or drives the mock simulator. Mutations commit a
// versioned snapshot under the state lock; delivery to listeners happens
// after the lock is released, in version order, skipping snapshots that
// were overtaken.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use devforge_api::{ApiClient, ConnectionState, ProjectEvent};
use tokio::sync::{OnceCell, watch};
use tracing::{debug, info, warn};

use super::collection::Collection;
use super::listeners::{Listeners, Subscription};
use super::{StoreMode, lock, new_id, timestamp};
use crate::config::ForgeConfig;
use crate::error::CoreError;
use crate::model::{
    LogEntry, Project, ProjectDraft, ProjectStatus, Service, SystemStats, ValidatedWorkspace,
    WorkspaceImportResponse, WorkspaceIssue, WorkspaceSchema, WorkspaceValidationError,
    validate_schema, validate_workspace_json,
};
use crate::realtime::{ProjectCallbacks, ProjectUpdates};
use crate::simulator::{self, Transition};
use crate::stream::{ProjectStream, Snapshot};

/// Handle to the project store. Clones share state.
#[derive(Clone)]
pub struct ProjectStore {
    inner: Arc<Inner>,
}

struct Inner {
    config: ForgeConfig,
    api: ApiClient,
    mode: OnceCell<StoreMode>,
    state: Mutex<Collection>,
    delivery: Mutex<Delivery>,
    listeners: Listeners,
    snapshot: watch::Sender<Snapshot>,
    realtime: Mutex<Option<ProjectUpdates>>,
}

/// Committed snapshots waiting to reach the listeners, in version order.
#[derive(Default)]
struct Delivery {
    /// Highest version queued so far; older commits that arrive late are skipped.
    accepted: u64,
    queue: VecDeque<Snapshot>,
    /// Set while one caller is draining the queue.
    draining: bool,
}

/// Releases the drain flag if a listener panics mid-delivery.
struct DrainGuard<'a>(&'a Mutex<Delivery>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut delivery = lock(self.0);
            delivery.draining = false;
            delivery.queue.clear();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        lock(&self.state).transitions.cancel_all();
    }
}

impl ProjectStore {
    /// Create an uninitialized store. Nothing is fetched until the first
    /// operation or an explicit [`init`](Self::init).
    pub fn new(config: ForgeConfig) -> Result<Self, CoreError> {
        let api = ApiClient::new(config.api_url.clone(), &config.transport())?;
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                api,
                mode: OnceCell::new(),
                state: Mutex::new(Collection::default()),
                delivery: Mutex::new(Delivery::default()),
                listeners: Listeners::default(),
                snapshot,
                realtime: Mutex::new(None),
            }),
        })
    }

    // ── Source selection ─────────────────────────────────────────────

    /// Resolve the data source: one check of the backend, falling back to
    /// mock mode for the rest of the store's life if it fails.
    pub async fn init(&self) -> StoreMode {
        *self.inner.mode.get_or_init(|| self.select_mode()).await
    }

    /// `None` until [`init`](Self::init) has completed.
    pub fn mode(&self) -> Option<StoreMode> {
        self.inner.mode.get().copied()
    }

    async fn select_mode(&self) -> StoreMode {
        if self.inner.config.force_mock {
            info!("mock mode requested, backend not contacted");
            self.seed_mock();
            return StoreMode::Mock;
        }

        match self.inner.api.list_projects().await {
            Ok(projects) => {
                info!(
                    url = %self.inner.config.api_url,
                    count = projects.len(),
                    "backend reachable, using remote data"
                );
                self.update(|c| ((), c.replace_all(projects)));
                if self.inner.config.realtime.enabled {
                    self.start_realtime();
                }
                StoreMode::Remote
            }
            Err(e) => {
                warn!(
                    url = %self.inner.config.api_url,
                    error = %e,
                    "backend unreachable, falling back to mock data"
                );
                self.seed_mock();
                StoreMode::Mock
            }
        }
    }

    fn seed_mock(&self) {
        if self.inner.config.mock.seed {
            let seed = simulator::seed_projects();
            self.update(|c| ((), c.replace_all(seed)));
        }
    }

    fn start_realtime(&self) {
        let apply = {
            let store = Arc::downgrade(&self.inner);
            Arc::new(move |event: ProjectEvent| {
                if let Some(inner) = store.upgrade() {
                    ProjectStore { inner }.apply_event(event);
                }
            })
        };
        let callbacks = ProjectCallbacks::default()
            .on_project_update({
                let apply = Arc::clone(&apply);
                move |project| apply(ProjectEvent::Updated(Box::new(project)))
            })
            .on_project_created({
                let apply = Arc::clone(&apply);
                move |project| apply(ProjectEvent::Created(Box::new(project)))
            })
            .on_project_deleted({
                let apply = Arc::clone(&apply);
                move |project_id| apply(ProjectEvent::Deleted { project_id })
            })
            .on_logs_updated(move |project_id, service, logs| {
                apply(ProjectEvent::LogsUpdated {
                    project_id,
                    service,
                    logs,
                });
            });

        match ProjectUpdates::new(
            &self.inner.config.ws_url,
            &self.inner.config.realtime,
            callbacks,
        ) {
            Ok(updates) => {
                updates.connect();
                *lock(&self.inner.realtime) = Some(updates);
            }
            Err(e) => warn!(error = %e, "realtime project updates unavailable"),
        }
    }

    /// State of the store's own `projects` subscription, if one was started.
    pub fn realtime_state(&self) -> Option<ConnectionState> {
        lock(&self.inner.realtime).as_ref().map(ProjectUpdates::state)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current list. Remote mode refetches and replaces the local copy.
    pub async fn get_projects(&self) -> Result<Vec<Project>, CoreError> {
        match self.init().await {
            StoreMode::Remote => {
                let projects = self.inner.api.list_projects().await?;
                self.update(|c| ((), c.replace_all(projects.clone())));
                Ok(projects)
            }
            StoreMode::Mock => Ok(lock(&self.inner.state).to_vec()),
        }
    }

    pub async fn get_project(&self, id: &str) -> Option<Project> {
        match self.init().await {
            StoreMode::Remote => match self.inner.api.get_project(id).await {
                Ok(project) => Some(project),
                Err(e) if e.is_not_found() => {
                    debug!(project_id = id, "project not found");
                    None
                }
                Err(e) => {
                    warn!(project_id = id, error = %e, "project fetch failed");
                    None
                }
            },
            StoreMode::Mock => lock(&self.inner.state).get(id).cloned(),
        }
    }

    /// Logs for one service. Empty when the project or the request fails.
    pub async fn get_project_logs(&self, id: &str, service: Service) -> Vec<LogEntry> {
        match self.init().await {
            StoreMode::Remote => match self.inner.api.project_logs(id, service).await {
                Ok(logs) => logs,
                Err(e) => {
                    warn!(project_id = id, %service, error = %e, "log fetch failed");
                    Vec::new()
                }
            },
            StoreMode::Mock => lock(&self.inner.state)
                .get(id)
                .map(|p| p.logs.get(service).to_vec())
                .unwrap_or_default(),
        }
    }

    pub async fn get_system_stats(&self) -> Result<SystemStats, CoreError> {
        match self.init().await {
            StoreMode::Remote => Ok(self.inner.api.system_stats().await?),
            StoreMode::Mock => Ok(simulator::system_stats(&lock(&self.inner.state).to_vec())),
        }
    }

    /// The last delivered snapshot, without touching the backend.
    pub fn projects(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub async fn start_project(&self, id: &str) -> bool {
        self.lifecycle(id, Transition::Start).await
    }

    pub async fn stop_project(&self, id: &str) -> bool {
        self.lifecycle(id, Transition::Stop).await
    }

    /// Stop, then start once the stop has completed.
    ///
    /// Like start and stop, the result only reports that the restart was
    /// issued. In mock mode the start half is abandoned if the stop half
    /// never lands (the project was deleted or another operation took
    /// over); follow the project's status for the outcome.
    pub async fn restart_project(&self, id: &str) -> bool {
        self.lifecycle(id, Transition::Restart).await
    }

    async fn lifecycle(&self, id: &str, transition: Transition) -> bool {
        match self.init().await {
            StoreMode::Remote => self.remote_lifecycle(id, transition).await,
            StoreMode::Mock => self.mock_lifecycle(id, transition),
        }
    }

    async fn remote_lifecycle(&self, id: &str, transition: Transition) -> bool {
        let api = &self.inner.api;
        let result = match transition {
            Transition::Start => api.start_project(id).await,
            Transition::Stop => api.stop_project(id).await,
            Transition::Restart => api.restart_project(id).await,
        };
        match result {
            Ok(project) => {
                self.update(|c| ((), c.upsert(project)));
                true
            }
            Err(e) => {
                warn!(project_id = id, %transition, error = %e, "project operation failed");
                false
            }
        }
    }

    /// Apply the immediate status, then play the delayed steps on a task.
    fn mock_lifecycle(&self, id: &str, transition: Transition) -> bool {
        let now = timestamp();
        let ticket = self.update(|c| {
            let Some(project) = c.projects.get_mut(id) else {
                return (None, false);
            };
            project.set_status(transition.initial_status());
            project.updated_at = now;
            (Some(c.transitions.begin(id)), true)
        });
        let Some((seq, cancel)) = ticket else {
            debug!(project_id = id, %transition, "no such mock project");
            return false;
        };

        let steps = transition.steps(&self.inner.config.mock);
        let last = steps.len();
        let store = Arc::downgrade(&self.inner);
        let id = id.to_owned();
        tokio::spawn(async move {
            for (index, (delay, status)) in steps.into_iter().enumerate() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
                let Some(inner) = store.upgrade() else {
                    return;
                };
                let live = ProjectStore { inner };
                if !live.apply_step(&id, seq, status, index + 1 == last) {
                    debug!(project_id = %id, %transition, "transition superseded or project gone");
                    return;
                }
            }
        });
        true
    }

    fn apply_step(&self, id: &str, seq: u64, status: ProjectStatus, last: bool) -> bool {
        let now = timestamp();
        self.update(|c| {
            if !c.transitions.is_current(id, seq) {
                return (false, false);
            }
            let Some(project) = c.projects.get_mut(id) else {
                c.transitions.finish(id, seq);
                return (false, false);
            };
            project.set_status(status);
            project.updated_at = now;
            if last {
                c.transitions.finish(id, seq);
            }
            (true, true)
        })
    }

    /// Number of mock transitions still in flight.
    pub fn pending_transitions(&self) -> usize {
        lock(&self.inner.state).transitions.len()
    }

    // ── Create / delete ──────────────────────────────────────────────

    /// Create a project from `draft`, merging it over the defaults.
    pub async fn create_project(&self, draft: ProjectDraft) -> Result<Project, CoreError> {
        let project = match self.init().await {
            StoreMode::Remote => self.inner.api.create_project(&draft.to_request()).await?,
            StoreMode::Mock => draft.into_project(new_id(), timestamp()),
        };
        self.update(|c| ((), c.upsert(project.clone())));
        info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Returns `false` (and notifies nobody) when `id` is unknown.
    pub async fn delete_project(&self, id: &str) -> bool {
        if self.init().await == StoreMode::Remote {
            if let Err(e) = self.inner.api.delete_project(id).await {
                warn!(project_id = id, error = %e, "project delete failed");
                return false;
            }
            self.update(|c| {
                let removed = c.remove(id).is_some();
                ((), removed)
            });
            return true;
        }

        self.update(|c| {
            let removed = c.remove(id).is_some();
            (removed, removed)
        })
    }

    // ── Realtime events ──────────────────────────────────────────────

    /// Apply one pushed event. Returns `true` if the list changed.
    pub fn apply_event(&self, event: ProjectEvent) -> bool {
        self.update(|c| {
            let changed = match event {
                ProjectEvent::Updated(project) => {
                    if c.contains(&project.id) {
                        c.upsert(*project)
                    } else {
                        debug!(project_id = %project.id, "update for unknown project ignored");
                        false
                    }
                }
                ProjectEvent::Created(project) => c.upsert(*project),
                ProjectEvent::Deleted { project_id } => c.remove(&project_id).is_some(),
                ProjectEvent::LogsUpdated {
                    project_id,
                    service,
                    logs,
                } => match c.projects.get_mut(&project_id) {
                    Some(project) if project.logs.get(service) != logs.as_slice() => {
                        project.logs.replace(service, logs);
                        true
                    }
                    _ => false,
                },
                ProjectEvent::Unknown { kind } => {
                    debug!(kind = %kind, "unknown project event ignored");
                    false
                }
            };
            (changed, changed)
        })
    }

    // ── Workspaces ───────────────────────────────────────────────────

    /// Validate a `workspace.json` string. In remote mode the backend is
    /// asked as well, after the local checks pass.
    pub async fn validate_workspace(&self, json: &str) -> Result<ValidatedWorkspace, CoreError> {
        let validated = validate_workspace_json(json)?;
        if self.init().await == StoreMode::Remote {
            let verdict = self.inner.api.validate_workspace(&validated.schema).await?;
            if !verdict.valid {
                let mut issues: Vec<_> =
                    verdict.errors.into_iter().map(WorkspaceIssue::Rejected).collect();
                if issues.is_empty() {
                    issues.push(WorkspaceIssue::Rejected("no reason given".into()));
                }
                return Err(WorkspaceValidationError { issues }.into());
            }
        }
        Ok(validated)
    }

    /// Export the current projects. Environment variables only with `include_secrets`.
    pub async fn export_workspace(&self, include_secrets: bool) -> Result<WorkspaceSchema, CoreError> {
        match self.init().await {
            StoreMode::Remote => Ok(self.inner.api.export_workspace(include_secrets).await?),
            StoreMode::Mock => Ok(simulator::export_workspace(
                &lock(&self.inner.state).to_vec(),
                include_secrets,
                &timestamp(),
            )),
        }
    }

    /// Import a workspace. With `overwrite`, projects sharing a name with an
    /// imported one are replaced; otherwise imports are appended.
    pub async fn import_workspace(
        &self,
        schema: &WorkspaceSchema,
        overwrite: bool,
    ) -> Result<WorkspaceImportResponse, CoreError> {
        validate_schema(schema)?;

        if self.init().await == StoreMode::Remote {
            let response = self.inner.api.import_workspace(schema, overwrite).await?;
            if let Err(e) = self.get_projects().await {
                warn!(error = %e, "project refresh after import failed");
            }
            return Ok(response);
        }

        let drafts: Vec<ProjectDraft> = schema
            .workspace
            .projects
            .iter()
            .map(simulator::draft_from_workspace)
            .collect();
        let project_count = drafts.len();
        let now = timestamp();
        self.update(|c| {
            let mut changed = false;
            if overwrite {
                for draft in &drafts {
                    changed |= c.remove_named(draft.name()) > 0;
                }
            }
            for draft in drafts {
                changed |= c.upsert(draft.into_project(new_id(), now.clone()));
            }
            ((), changed)
        });

        info!(project_count, overwrite, "workspace imported into mock store");
        Ok(WorkspaceImportResponse {
            workspace_id: schema.workspace.id.clone().unwrap_or_else(new_id),
            project_count,
            message: format!("Imported {project_count} project(s)"),
        })
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register `listener` to receive a copy of the list after every mutation.
    ///
    /// Listeners run synchronously on the mutating task, in mutation order.
    /// A listener may call back into the store: a mutation it makes is
    /// delivered once the current snapshot has reached every listener.
    pub fn subscribe(&self, listener: impl Fn(Snapshot) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.add(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Stream of snapshots, starting from the current one.
    pub fn watch(&self) -> ProjectStream {
        ProjectStream::new(self.inner.snapshot.subscribe())
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Cancel pending transitions and close the realtime connection.
    pub fn shutdown(&self) {
        lock(&self.inner.state).transitions.cancel_all();
        if let Some(updates) = lock(&self.inner.realtime).take() {
            updates.disconnect();
        }
        debug!("project store shut down");
    }

    // ── Commit & delivery ────────────────────────────────────────────

    fn update<R>(&self, f: impl FnOnce(&mut Collection) -> (R, bool)) -> R {
        let (result, commit) = {
            let mut state = lock(&self.inner.state);
            let (result, changed) = f(&mut state);
            (result, changed.then(|| state.commit()))
        };
        if let Some((version, snapshot)) = commit {
            self.deliver(version, snapshot);
        }
        result
    }

    /// Queue `snapshot` and, unless another call is already draining, hand
    /// every queued snapshot to the watchers and listeners. No lock is held
    /// while listeners run.
    fn deliver(&self, version: u64, snapshot: Snapshot) {
        {
            let mut delivery = lock(&self.inner.delivery);
            if version <= delivery.accepted {
                return;
            }
            delivery.accepted = version;
            delivery.queue.push_back(snapshot);
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }

        let _guard = DrainGuard(&self.inner.delivery);
        loop {
            let next = {
                let mut delivery = lock(&self.inner.delivery);
                let next = delivery.queue.pop_front();
                if next.is_none() {
                    delivery.draining = false;
                }
                next
            };
            let Some(snapshot) = next else {
                return;
            };
            self.inner.snapshot.send_replace(Arc::clone(&snapshot));
            self.inner.listeners.notify(&snapshot);
        }
    }
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}
