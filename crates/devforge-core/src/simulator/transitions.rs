// ── Pending status transitions ──
//
// Each project has at most one outstanding transition. A new operation
// cancels the previous one and takes a fresh sequence number; a timer
// only applies its step while its sequence is still the current one.

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::MockConfig;
use crate::model::ProjectStatus;

/// A lifecycle operation the simulator plays out over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Transition {
    Start,
    Stop,
    Restart,
}

impl Transition {
    /// Status applied synchronously when the operation is issued.
    pub fn initial_status(self) -> ProjectStatus {
        match self {
            Self::Start => ProjectStatus::Starting,
            Self::Stop | Self::Restart => ProjectStatus::Stopping,
        }
    }

    /// Delayed steps, applied in order. A step that cannot be applied
    /// aborts the rest, so a restart never starts after a failed stop.
    pub fn steps(self, timings: &MockConfig) -> Vec<(Duration, ProjectStatus)> {
        match self {
            Self::Start => vec![(timings.start_delay, ProjectStatus::Running)],
            Self::Stop => vec![(timings.stop_delay, ProjectStatus::Stopped)],
            Self::Restart => vec![
                (timings.stop_delay, ProjectStatus::Stopped),
                (timings.restart_delay, ProjectStatus::Starting),
                (timings.start_delay, ProjectStatus::Running),
            ],
        }
    }
}

#[derive(Debug)]
struct Pending {
    seq: u64,
    cancel: CancellationToken,
}

/// Bookkeeping for outstanding transitions, keyed by project id.
#[derive(Debug, Default)]
pub(crate) struct Transitions {
    next_seq: u64,
    pending: HashMap<String, Pending>,
}

impl Transitions {
    /// Supersede whatever is pending for `id` and register a new transition.
    pub(crate) fn begin(&mut self, id: &str) -> (u64, CancellationToken) {
        self.cancel(id);
        self.next_seq += 1;
        let cancel = CancellationToken::new();
        self.pending.insert(
            id.to_owned(),
            Pending {
                seq: self.next_seq,
                cancel: cancel.clone(),
            },
        );
        (self.next_seq, cancel)
    }

    pub(crate) fn is_current(&self, id: &str, seq: u64) -> bool {
        self.pending.get(id).is_some_and(|p| p.seq == seq)
    }

    /// Drop the entry if `seq` is still the current one.
    pub(crate) fn finish(&mut self, id: &str, seq: u64) {
        if self.is_current(id, seq) {
            self.pending.remove(id);
        }
    }

    /// Cancel the outstanding transition for `id`, if any.
    pub(crate) fn cancel(&mut self, id: &str) -> bool {
        match self.pending.remove(id) {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.cancel.cancel();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
