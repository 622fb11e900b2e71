//! Registry of push subscribers for live item updates.
//!
//! Each open client connection holds a [`Subscription`]. A broadcast hands the
//! same pre-rendered fragment to every registered subscriber and drops the ones
//! whose connection is gone in the same pass.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

type Fragment = Arc<str>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, UnboundedSender<Fragment>>>,
}

impl Registry {
    fn subscribers(&self) -> MutexGuard<'_, HashMap<SubscriberId, UnboundedSender<Fragment>>> {
        // Nothing under the lock can panic halfway through a mutation.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Registry>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        let total = {
            let mut subscribers = self.inner.subscribers();
            subscribers.insert(id, sender);
            subscribers.len()
        };
        debug!(subscriber = id.0, total, "subscriber registered");
        Subscription {
            id,
            receiver,
            registry: self.clone(),
        }
    }

    /// Returns whether `id` was still registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.inner.subscribers().remove(&id).is_some();
        if removed {
            debug!(subscriber = id.0, "subscriber removed");
        }
        removed
    }

    /// Delivers `fragment` to every current subscriber and prunes closed ones.
    /// Returns the number of subscribers that accepted it.
    pub fn broadcast(&self, fragment: impl Into<Arc<str>>) -> usize {
        let fragment: Fragment = fragment.into();
        let mut subscribers = self.inner.subscribers();
        let before = subscribers.len();
        subscribers.retain(|_, sender| sender.send(fragment.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered < before {
            debug!(pruned = before - delivered, delivered, "pruned closed subscribers");
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}

/// One open push connection. Unregisters itself when dropped.
pub struct Subscription {
    id: SubscriberId,
    receiver: UnboundedReceiver<Fragment>,
    registry: SubscriberRegistry,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Fragment> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Fragment> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Fragment;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
