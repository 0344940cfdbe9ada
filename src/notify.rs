use tokio::sync::broadcast;

use crate::limits::CHANNEL_CAPACITY;

/// Broadcast channel for one collection's snapshots.
///
/// Every mutation publishes the collection's full current state — a
/// replace-whole-snapshot event, never an incremental diff. A receiver is
/// the subscription handle: dropping it guarantees no further deliveries.
pub struct SnapshotChannel<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> SnapshotChannel<T> {
    pub fn new() -> Self {
        Self {
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Publish a snapshot. No-op if nobody is listening.
    pub fn publish(&self, snapshot: T) {
        if self.sender.receiver_count() > 0 {
            metrics::counter!(crate::observability::SNAPSHOTS_PUBLISHED_TOTAL).increment(1);
            let _ = self.sender.send(snapshot);
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for SnapshotChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}
