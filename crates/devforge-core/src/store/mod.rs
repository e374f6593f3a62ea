// ── Project store ──
//
// Authoritative in-memory project list backed by either the remote API
// or the mock simulator, with push-based change notification.

mod collection;
mod listeners;
mod project_store;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub use listeners::Subscription;
pub use project_store::ProjectStore;

/// Where the store sources its data. Decided once by `init()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreMode {
    Remote,
    Mock,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
