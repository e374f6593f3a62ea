// devforge-api: Async Rust client for the devforge environment backend
//
// Two surfaces:
// - HTTP project API (`/api/projects`, `/api/system`, `/api/workspaces`)
//   behind a `{success, data, error}` envelope
// - WebSocket push topics (`/ws/projects`, `/ws/logs/{id}/{service}`)
//   managed by a reconnecting `Connection`

pub mod client;
pub mod error;
pub mod events;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::ApiClient;
pub use error::Error;
pub use events::{LogStreamEvent, ProjectEvent};
pub use models::*;
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{Connection, ConnectionState, Envelope, ReconnectConfig};
