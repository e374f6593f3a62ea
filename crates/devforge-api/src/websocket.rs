//! WebSocket connection manager with fixed-delay reconnect.
//!
//! A [`Connection`] owns at most one live socket to a backend topic. Every
//! inbound text frame is decoded into an [`Envelope`] and handed to the
//! caller's handler synchronously, in arrival order. An unclean close
//! (anything but a normal 1000 close frame) schedules a reconnect after
//! [`ReconnectConfig::delay`]. A manual [`Connection::disconnect`] never
//! reconnects.
//!
//! # Example
//!
//! ```rust,ignore
//! use devforge_api::websocket::{Connection, ReconnectConfig};
//! use url::Url;
//!
//! let url = Url::parse("ws://localhost:8080/ws/projects")?;
//! let conn = Connection::new(url, ReconnectConfig::default(), |envelope| {
//!     println!("{}: {}", envelope.kind, envelope.payload);
//! });
//! conn.connect();
//! // ...
//! conn.disconnect();
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;

const MANUAL_DISCONNECT_REASON: &str = "Manual disconnect";

// ── Envelope ─────────────────────────────────────────────────────────

/// A decoded `{type, payload}` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Callback invoked for every decoded frame, on the socket's read task.
pub type FrameHandler = Arc<dyn Fn(Envelope) + Send + Sync>;

// ── ConnectionState ──────────────────────────────────────────────────

/// Lifecycle of a managed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    Connecting,
    Open,
    /// `clean` is `true` only for a normal (1000) closure.
    Closed { clean: bool },
}

impl ConnectionState {
    /// `true` for `Open` and `Connecting`.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::Connecting)
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Fixed-delay reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Reconnect after an unclean close. Default: `true`.
    pub auto_reconnect: bool,
    /// Delay before each reconnect attempt. Default: 3s.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            delay: Duration::from_millis(3000),
        }
    }
}

// ── Connection ───────────────────────────────────────────────────────

/// Handle to one managed WebSocket subscription.
///
/// Dropping the handle tears the connection down: any pending reconnect
/// is cancelled and an open socket is closed with code 1000.
pub struct Connection {
    shared: Arc<Shared>,
}

struct Shared {
    url: Url,
    reconnect: ReconnectConfig,
    handler: FrameHandler,
    state: watch::Sender<ConnectionState>,
    error: watch::Sender<Option<String>>,
    should_reconnect: AtomicBool,
    /// Bumped whenever a session is replaced; stale sessions stop publishing.
    generation: AtomicU64,
    attempts: AtomicU64,
    session: Mutex<Option<Session>>,
}

struct Session {
    cancel: CancellationToken,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

/// How one socket lifetime ended.
enum SessionEnd {
    Clean,
    Unclean(String),
    Cancelled,
}

impl Connection {
    /// Create a manager for `url`. Does not connect; call [`connect`](Self::connect).
    pub fn new(
        url: Url,
        reconnect: ReconnectConfig,
        handler: impl Fn(Envelope) + Send + Sync + 'static,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (error, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                url,
                reconnect,
                handler: Arc::new(handler),
                state,
                error,
                should_reconnect: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
                session: Mutex::new(None),
            }),
        }
    }

    /// Open the socket.
    ///
    /// No-op while a socket is `Open` or `Connecting`. When a reconnect is
    /// pending, the pending wait is cut short instead of opening a second
    /// socket. Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let shared = &self.shared;
        let mut session = lock(&shared.session);

        if shared.state.borrow().is_active() {
            debug!(url = %shared.url, "connect ignored: socket already active");
            return;
        }

        shared
            .should_reconnect
            .store(shared.reconnect.auto_reconnect, Ordering::SeqCst);

        if let Some(existing) = session.as_ref() {
            if !existing.task.is_finished() {
                debug!(url = %shared.url, "reconnect pending, waking it early");
                // Wakes only a task already parked in its delay; no permit is
                // stored for later waits.
                existing.wake.notify_waiters();
                return;
            }
        }

        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        shared.state.send_replace(ConnectionState::Connecting);

        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let task = tokio::spawn(session_loop(
            Arc::clone(shared),
            generation,
            cancel.clone(),
            Arc::clone(&wake),
        ));
        *session = Some(Session { cancel, wake, task });
    }

    /// Close the socket with code 1000 and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.shared.teardown();
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Most recent connection error, cleared when a socket opens.
    pub fn error(&self) -> Option<String> {
        self.shared.error.borrow().clone()
    }

    pub fn watch_error(&self) -> watch::Receiver<Option<String>> {
        self.shared.error.subscribe()
    }

    /// Number of connection attempts made so far, including reconnects.
    pub fn attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> &Url {
        &self.shared.url
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl Shared {
    fn teardown(&self) {
        // Cleared first so the close that follows is treated as intentional.
        self.should_reconnect.store(false, Ordering::SeqCst);

        let Some(session) = lock(&self.session).take() else {
            return;
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        session.cancel.cancel();
        self.state.send_replace(ConnectionState::Closed { clean: true });
        info!(url = %self.url, "websocket disconnected");
    }

    fn publish(&self, generation: u64, state: ConnectionState) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.state.send_replace(state);
        }
    }

    fn record_error(&self, generation: u64, error: Option<String>) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.error.send_replace(error);
        }
    }
}

// ── Session task ─────────────────────────────────────────────────────

async fn session_loop(
    shared: Arc<Shared>,
    generation: u64,
    cancel: CancellationToken,
    wake: Arc<Notify>,
) {
    loop {
        shared.publish(generation, ConnectionState::Connecting);

        match connect_and_read(&shared, generation, &cancel).await {
            SessionEnd::Cancelled => break,
            SessionEnd::Clean => {
                info!(url = %shared.url, "websocket closed normally");
                shared.publish(generation, ConnectionState::Closed { clean: true });
                break;
            }
            SessionEnd::Unclean(reason) => {
                warn!(url = %shared.url, error = %reason, "websocket closed unexpectedly");

                // Registered before the close is published, so a `connect()`
                // reacting to it always finds a waiter.
                let woken = wake.notified();
                tokio::pin!(woken);
                woken.as_mut().enable();

                shared.record_error(generation, Some(reason));
                shared.publish(generation, ConnectionState::Closed { clean: false });

                if !shared.should_reconnect.load(Ordering::SeqCst) {
                    break;
                }

                let delay = shared.reconnect.delay;
                info!(?delay, "scheduling websocket reconnect");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = woken.as_mut() => debug!("reconnect woken early"),
                    () = tokio::time::sleep(delay) => {}
                }

                if !shared.should_reconnect.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }
}

async fn connect_and_read(
    shared: &Shared,
    generation: u64,
    cancel: &CancellationToken,
) -> SessionEnd {
    shared.attempts.fetch_add(1, Ordering::SeqCst);
    debug!(url = %shared.url, "connecting websocket");

    let handshake = tokio::select! {
        biased;
        () = cancel.cancelled() => return SessionEnd::Cancelled,
        result = tokio_tungstenite::connect_async(shared.url.as_str()) => result,
    };
    let ws_stream = match handshake {
        Ok((stream, _response)) => stream,
        Err(e) => {
            return SessionEnd::Unclean(Error::WebSocketConnect(e.to_string()).to_string());
        }
    };

    info!(url = %shared.url, "websocket connected");
    shared.record_error(generation, None);
    shared.publish(generation, ConnectionState::Open);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: MANUAL_DISCONNECT_REASON.into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    debug!(error = %e, "close frame not delivered");
                }
                return SessionEnd::Cancelled;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => dispatch_frame(text.as_str(), &shared.handler),
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(f) if f.code == CloseCode::Normal => SessionEnd::Clean,
                            Some(f) => SessionEnd::Unclean(
                                Error::WebSocketClosed {
                                    code: u16::from(f.code),
                                    reason: f.reason.as_str().to_owned(),
                                }
                                .to_string(),
                            ),
                            None => SessionEnd::Unclean("close frame without status".into()),
                        };
                    }
                    // Ping/pong handled by tungstenite; binary frames unused.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return SessionEnd::Unclean(Error::WebSocketConnect(e.to_string()).to_string());
                    }
                    None => return SessionEnd::Unclean("stream ended without close frame".into()),
                }
            }
        }
    }
}

/// Decode one text frame and hand it to the handler. Bad frames are dropped.
fn dispatch_frame(text: &str, handler: &FrameHandler) {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => handler(envelope),
        Err(e) => {
            warn!(error = %e, "dropping unparseable websocket frame");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Topic URLs ───────────────────────────────────────────────────────

/// Join topic segments onto a WebSocket base such as `ws://localhost:8080/ws`.
pub fn topic_url(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert!(config.auto_reconnect);
        assert_eq!(config.delay, Duration::from_secs(3));
    }

    #[test]
    fn dispatch_decodes_envelope() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: FrameHandler = Arc::new(move |env| sink.lock().unwrap().push(env));

        dispatch_frame(
            r#"{"type":"project_deleted","payload":{"projectId":"p1"}}"#,
            &handler,
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, "project_deleted");
        assert_eq!(seen[0].payload["projectId"], "p1");
    }

    #[test]
    fn dispatch_drops_malformed_frames() {
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let handler: FrameHandler = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatch_frame("not json {{{", &handler);
        dispatch_frame(r#"{"payload":{}}"#, &handler);
        dispatch_frame(r#"{"type":"logs_clear"}"#, &handler);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn topic_url_appends_segments() {
        let base = Url::parse("ws://localhost:8080/ws").unwrap();
        let url = topic_url(&base, &["logs", "p1", "backend"]).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/ws/logs/p1/backend");
    }

    #[test]
    fn state_activity() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Open.is_active());
        assert!(!ConnectionState::Idle.is_active());
        assert!(!ConnectionState::Closed { clean: false }.is_active());
    }

    #[tokio::test]
    async fn disconnect_before_connect_is_noop() {
        let conn = Connection::new(
            Url::parse("ws://127.0.0.1:9/ws").unwrap(),
            ReconnectConfig::default(),
            |_| {},
        );
        conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Idle);
        assert_eq!(conn.attempts(), 0);
    }
}
