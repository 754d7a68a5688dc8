use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use studyhall_types::events::SyncEvent;

use crate::directory::DirectoryStore;

/// Name of the channel every directory store publishes on.
pub const CHANNEL_NAME: &str = "study_groups_channel";

const CHANNEL_CAPACITY: usize = 256;

/// A sync event tagged with the store that published it.
#[derive(Debug, Clone)]
pub struct SyncEnvelope {
    pub origin: Uuid,
    pub event: SyncEvent,
}

/// Broadcast port used by `DirectoryStore`. Fire and forget: no acknowledgment.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, envelope: SyncEnvelope);
}

/// In-process broadcast channel connecting every store and gateway connection.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    name: String,
    tx: broadcast::Sender<SyncEnvelope>,
}

impl Relay {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RelayInner {
                name: name.into(),
                tx,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Subscribe to every envelope published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEnvelope> {
        self.inner.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(CHANNEL_NAME)
    }
}

impl Broadcaster for Relay {
    fn publish(&self, envelope: SyncEnvelope) {
        trace!("Publishing update from {} on '{}'", envelope.origin, self.inner.name);
        // No subscribers is not an error
        let _ = self.inner.tx.send(envelope);
    }
}

/// Keep `store` in step with foreign updates published on `relay`.
/// The store's own publications are skipped.
pub fn spawn_follower(store: Arc<Mutex<DirectoryStore>>, relay: &Relay) -> JoinHandle<()> {
    let mut rx = relay.subscribe();
    let name = relay.name().to_string();

    tokio::spawn(async move {
        loop {
            let envelope = match rx.recv().await {
                Ok(envelope) => envelope,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // The next full-state update resynchronizes us
                    warn!("Follower on '{}' lagged by {} updates", name, n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            store.lock().await.receive(&envelope);
        }

        debug!("Follower on '{}' stopped", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhall_types::models::Directory;

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let relay = Relay::default();
        let mut a = relay.subscribe();
        let mut b = relay.subscribe();
        assert_eq!(relay.subscriber_count(), 2);

        let origin = Uuid::new_v4();
        relay.publish(SyncEnvelope {
            origin,
            event: SyncEvent::UpdateGroups(Directory::default()),
        });

        assert_eq!(a.recv().await.unwrap().origin, origin);
        assert_eq!(b.recv().await.unwrap().origin, origin);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let relay = Relay::new("lonely");
        relay.publish(SyncEnvelope {
            origin: Uuid::new_v4(),
            event: SyncEvent::UpdateGroups(Directory::default()),
        });
        assert_eq!(relay.name(), "lonely");
    }
}
