// ── Log stream hook ──
//
// One managed socket on `logs/{projectId}/{service}` feeding a bounded,
// ordered buffer. Applied events are re-broadcast for follow-mode readers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use devforge_api::websocket::topic_url;
use devforge_api::{Connection, ConnectionState, LogStreamEvent};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};
use url::Url;

use crate::config::RealtimeConfig;
use crate::error::CoreError;
use crate::model::{LogEntry, Service};
use crate::store::lock;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Ordered log buffer; the oldest entry goes first once full.
#[derive(Debug)]
struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns `false` for events that leave the buffer untouched.
    fn apply(&mut self, event: &LogStreamEvent) -> bool {
        match event {
            LogStreamEvent::Entry(entry) => self.push(entry.clone()),
            LogStreamEvent::Batch(entries) => {
                for entry in entries {
                    self.push(entry.clone());
                }
            }
            LogStreamEvent::Clear => self.entries.clear(),
            LogStreamEvent::Unknown { .. } => return false,
        }
        true
    }
}

/// Live log buffer for one project service.
pub struct LogStream {
    connection: Connection,
    project_id: String,
    service: Service,
    buffer: Arc<Mutex<LogBuffer>>,
    events: broadcast::Sender<LogStreamEvent>,
}

impl LogStream {
    /// Build the hook for `project_id` / `service` under `ws_base`. Does not connect.
    pub fn new(
        ws_base: &Url,
        project_id: &str,
        service: Service,
        config: &RealtimeConfig,
    ) -> Result<Self, CoreError> {
        let url = topic_url(ws_base, &["logs", project_id, service.as_ref()])?;
        let buffer = Arc::new(Mutex::new(LogBuffer::new(config.log_buffer_capacity)));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let handler = {
            let buffer = Arc::clone(&buffer);
            let events = events.clone();
            move |envelope| match LogStreamEvent::from_envelope(envelope) {
                Ok(LogStreamEvent::Unknown { kind }) => {
                    warn!(kind = %kind, "ignoring unknown log stream event");
                }
                Ok(event) => {
                    lock(&buffer).apply(&event);
                    // No receivers is fine: the buffer is the source of truth.
                    let _ = events.send(event);
                }
                Err(e) => warn!(error = %e, "dropping malformed log stream payload"),
            }
        };

        debug!(url = %url, "log stream created");
        Ok(Self {
            connection: Connection::new(url, config.reconnect(), handler),
            project_id: project_id.to_owned(),
            service,
            buffer,
            events,
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

    /// Copy of the buffered entries in arrival order.
    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.buffer).entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.buffer).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the local buffer. The server is not told.
    pub fn clear_logs(&self) {
        lock(&self.buffer).entries.clear();
    }

    /// Every event applied to the buffer from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogStreamEvent> {
        self.events.subscribe()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn url(&self) -> &Url {
        self.connection.url()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::LogLevel;

    fn entry(id: &str) -> LogEntry {
        LogEntry {
            id: id.into(),
            timestamp: "2024-01-20T14:22:00Z".into(),
            level: LogLevel::Info,
            source: "vite".into(),
            message: format!("line {id}"),
            metadata: None,
        }
    }

    fn ids(buffer: &LogBuffer) -> Vec<&str> {
        buffer.entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn batch_then_entry_keeps_arrival_order() {
        let mut buffer = LogBuffer::new(10);
        buffer.apply(&LogStreamEvent::Batch(vec![entry("A"), entry("B"), entry("C")]));
        buffer.apply(&LogStreamEvent::Entry(entry("D")));
        assert_eq!(ids(&buffer), ["A", "B", "C", "D"]);
    }

    #[test]
    fn full_buffer_evicts_oldest() {
        let mut buffer = LogBuffer::new(3);
        for id in ["1", "2", "3", "4", "5"] {
            buffer.push(entry(id));
        }
        assert_eq!(ids(&buffer), ["3", "4", "5"]);
    }

    #[test]
    fn clear_and_unknown() {
        let mut buffer = LogBuffer::new(3);
        buffer.push(entry("1"));
        assert!(!buffer.apply(&LogStreamEvent::Unknown {
            kind: "logs_rotated".into()
        }));
        assert_eq!(buffer.entries.len(), 1);
        assert!(buffer.apply(&LogStreamEvent::Clear));
        assert!(buffer.entries.is_empty());
    }

    #[test]
    fn topic_url_includes_project_and_service() {
        let base = Url::parse("ws://localhost:8080/ws").unwrap();
        let stream =
            LogStream::new(&base, "p 1", Service::Backend, &RealtimeConfig::default()).unwrap();
        assert_eq!(stream.url().as_str(), "ws://localhost:8080/ws/logs/p%201/backend");
        assert_eq!(stream.state(), ConnectionState::Idle);
        assert!(stream.is_empty());
    }
}
