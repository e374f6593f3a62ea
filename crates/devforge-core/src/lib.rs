// devforge-core: project state between devforge-api and its consumers.
//
// The `ProjectStore` owns the authoritative project list, sourced from the
// backend or, when it cannot be reached, from the mock simulator. The
// realtime hooks wrap topic sockets for logs and project updates.

pub mod config;
pub mod error;
pub mod model;
pub mod realtime;
pub mod simulator;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ForgeConfig, MockConfig, RealtimeConfig, TlsVerification};
pub use error::CoreError;
pub use realtime::{LogStream, ProjectCallbacks, ProjectUpdates};
pub use store::{ProjectStore, StoreMode, Subscription};
pub use stream::{ProjectStream, ProjectWatchStream, Snapshot};

pub use devforge_api::{ConnectionState, LogStreamEvent, ProjectEvent};

// Model types at the crate root for ergonomics.
pub use model::{
    LogEntry, LogLevel, Project, ProjectDraft, ProjectStatus, Service, SystemStats,
    ValidatedWorkspace, WorkspaceImportResponse, WorkspaceSchema, WorkspaceValidationError,
};
