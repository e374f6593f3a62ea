// ── Realtime hooks ──
//
// Topic-specific wrappers over `devforge_api::Connection`.

mod logs;
mod projects;

pub use logs::LogStream;
pub use projects::{ProjectCallbacks, ProjectUpdates};
