// ── Reactive project stream ──
//
// `watch`-backed view of the store's project list, for consumers that
// prefer awaiting changes over registering a callback.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Project;

/// Shared, immutable copy of the project list.
pub type Snapshot = Arc<Vec<Project>>;

/// A subscription to the project list.
///
/// Holds the snapshot seen at creation and yields the latest one on each
/// change. Intermediate snapshots may be skipped under load.
pub struct ProjectStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl ProjectStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> ProjectWatchStream {
        ProjectWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding every new snapshot, starting with the current one.
pub struct ProjectWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for ProjectWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
