// Typed push events decoded from WebSocket envelopes.
//
// Each topic has a closed set of known `type` strings. Anything else
// decodes to an `Unknown` arm so callers can log and move on.

use serde::Deserialize;

use crate::models::{LogEntry, Project, Service};
use crate::websocket::Envelope;

// ── Log topic: logs/{projectId}/{service} ────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LogStreamEvent {
    /// `log_entry`: append one entry.
    Entry(LogEntry),
    /// `logs_batch`: append entries in order.
    Batch(Vec<LogEntry>),
    /// `logs_clear`: empty the buffer.
    Clear,
    Unknown { kind: String },
}

impl LogStreamEvent {
    /// Decode an envelope. Fails only when a known type carries a bad payload.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, serde_json::Error> {
        Ok(match envelope.kind.as_str() {
            "log_entry" => Self::Entry(serde_json::from_value(envelope.payload)?),
            "logs_batch" => Self::Batch(serde_json::from_value(envelope.payload)?),
            "logs_clear" => Self::Clear,
            _ => Self::Unknown {
                kind: envelope.kind,
            },
        })
    }
}

// ── Project topic: projects ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectEvent {
    Updated(Box<Project>),
    Created(Box<Project>),
    Deleted {
        project_id: String,
    },
    LogsUpdated {
        project_id: String,
        service: Service,
        logs: Vec<LogEntry>,
    },
    Unknown {
        kind: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletedPayload {
    project_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsUpdatedPayload {
    project_id: String,
    service: Service,
    #[serde(default)]
    logs: Vec<LogEntry>,
}

impl ProjectEvent {
    pub fn from_envelope(envelope: Envelope) -> Result<Self, serde_json::Error> {
        Ok(match envelope.kind.as_str() {
            "project_updated" => Self::Updated(Box::new(serde_json::from_value(envelope.payload)?)),
            "project_created" => Self::Created(Box::new(serde_json::from_value(envelope.payload)?)),
            "project_deleted" => {
                let DeletedPayload { project_id } = serde_json::from_value(envelope.payload)?;
                Self::Deleted { project_id }
            }
            "logs_updated" => {
                let LogsUpdatedPayload {
                    project_id,
                    service,
                    logs,
                } = serde_json::from_value(envelope.payload)?;
                Self::LogsUpdated {
                    project_id,
                    service,
                    logs,
                }
            }
            _ => Self::Unknown {
                kind: envelope.kind,
            },
        })
    }

    /// Id of the project this event concerns, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Updated(p) | Self::Created(p) => Some(&p.id),
            Self::Deleted { project_id } | Self::LogsUpdated { project_id, .. } => {
                Some(project_id)
            }
            Self::Unknown { .. } => None,
        }
    }
}
