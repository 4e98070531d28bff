//! Change notifications for store collections.
//!
//! Stores publish a [`ChangeEvent`] after every committed mutation. Readers
//! hold a [`Subscription`] scoped to one collection and re-query on each event.
//! Delivery is at-least-once: a subscriber that falls behind receives a single
//! synthetic event in place of the ones it missed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default number of buffered events per feed.
const FEED_CAPACITY: usize = 64;

/// A store collection that can be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Jobs,
    Applications,
    CrawlHistory,
    SystemStatus,
}

/// Kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Upsert,
    Delete,
    /// Events were dropped for a lagging subscriber
    Resync,
}

/// A committed mutation on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    /// Rows touched by the mutation
    pub rows: usize,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, kind: ChangeKind, rows: usize) -> Self {
        Self {
            collection,
            kind,
            rows,
            at: Utc::now(),
        }
    }
}

/// Something a reader can subscribe to for change events.
pub trait ChangeNotifier: Send + Sync {
    fn subscribe(&self, collection: Collection) -> Subscription;
}

/// Broadcast feed shared by a store and its subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        log::debug!(
            "change on {:?}: {:?} x{}",
            event.collection,
            event.kind,
            event.rows
        );
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for ChangeFeed {
    fn subscribe(&self, collection: Collection) -> Subscription {
        Subscription {
            collection,
            rx: self.tx.subscribe(),
        }
    }
}

/// A live subscription to one collection. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    collection: Collection,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Wait for the next event on this collection.
    ///
    /// Returns `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.collection == self.collection => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!(
                        "subscriber on {:?} lagged by {} events; resyncing",
                        self.collection,
                        missed
                    );
                    return Some(ChangeEvent::new(self.collection, ChangeKind::Resync, 0));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered event on this collection, if any.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.collection == self.collection => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Some(ChangeEvent::new(self.collection, ChangeKind::Resync, 0));
                }
                Err(_) => return None,
            }
        }
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_collection() {
        let feed = ChangeFeed::new();
        let mut jobs = feed.subscribe(Collection::Jobs);

        feed.publish(ChangeEvent::new(Collection::SystemStatus, ChangeKind::Upsert, 1));
        feed.publish(ChangeEvent::new(Collection::Jobs, ChangeKind::Upsert, 3));

        let event = jobs.recv().await.unwrap();
        assert_eq!(event.collection, Collection::Jobs);
        assert_eq!(event.rows, 3);
        assert!(jobs.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_gets_resync() {
        let feed = ChangeFeed::with_capacity(2);
        let mut jobs = feed.subscribe(Collection::Jobs);

        for _ in 0..5 {
            feed.publish(ChangeEvent::new(Collection::Jobs, ChangeKind::Upsert, 1));
        }

        let event = jobs.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Resync);
    }

    #[tokio::test]
    async fn test_recv_ends_when_feed_dropped() {
        let feed = ChangeFeed::new();
        let mut jobs = feed.subscribe(Collection::Jobs);
        drop(feed);
        assert!(jobs.recv().await.is_none());
    }

    #[test]
    fn test_unsubscribe_releases_receiver() {
        let feed = ChangeFeed::new();
        let sub = feed.subscribe(Collection::Jobs);
        assert_eq!(feed.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
    }
}
