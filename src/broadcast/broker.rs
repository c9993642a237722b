use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info};

use crate::common::channels::{create_update_channel, UpdateReceiver, UpdateSender};
use crate::common::types::OddsUpdate;

/// Delivery channel a listener is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Updates for one market
    Market(String),
    /// Updates for every market
    All,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Market(market_id) => write!(f, "market:{}", market_id),
            Channel::All => write!(f, "*"),
        }
    }
}

struct Listener {
    id: u64,
    sender: UpdateSender,
}

#[derive(Default)]
struct BrokerInner {
    channels: DashMap<Channel, Vec<Listener>>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

impl BrokerInner {
    fn remove(&self, channel: &Channel, id: u64) {
        if let Some(mut listeners) = self.channels.get_mut(channel) {
            listeners.retain(|l| l.id != id);
        }
        self.channels.remove_if(channel, |_, listeners| listeners.is_empty());
    }
}

/// In-process fan-out of odds updates, keyed by market
///
/// Construct one per process (or per test) and share it by cloning; clones
/// refer to the same registry. There is no limit on the number of
/// listeners. Nothing here is durable: the sequence log is the record.
#[derive(Clone, Default)]
pub struct EventBroker {
    inner: Arc<BrokerInner>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to updates for one market
    pub fn subscribe(&self, market_id: &str) -> Subscription {
        self.attach(Channel::Market(market_id.to_string()))
    }

    /// Listen to updates for every market
    pub fn subscribe_all(&self) -> Subscription {
        self.attach(Channel::All)
    }

    fn attach(&self, channel: Channel) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = create_update_channel();

        // The flag is read under the shard lock that shutdown's clear also takes
        let mut listeners = self.inner.channels.entry(channel.clone()).or_default();
        if self.inner.shut_down.load(Ordering::SeqCst) {
            drop(listeners);
            drop(sender);
            self.inner
                .channels
                .remove_if(&channel, |_, listeners| listeners.is_empty());
            debug!(%channel, "Broker shut down, subscription closed immediately");
        } else {
            listeners.push(Listener { id, sender });
            drop(listeners);
            debug!(%channel, subscription_id = id, "Subscribed");
        }

        Subscription {
            id,
            channel,
            receiver,
            broker: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an update to its market's listeners and to wildcard listeners
    ///
    /// Returns the number of listeners reached. Never blocks.
    pub fn publish(&self, update: OddsUpdate) -> usize {
        let update = Arc::new(update);
        let market = Channel::Market(update.market_id().to_string());

        let mut delivered = 0;
        for channel in [&market, &Channel::All] {
            if let Some(mut listeners) = self.inner.channels.get_mut(channel) {
                listeners.retain(|l| l.sender.send(Arc::clone(&update)).is_ok());
                delivered += listeners.len();
            }
        }

        debug!(
            market_id = update.market_id(),
            sequence_id = update.sequence_id(),
            delivered,
            "Published odds update"
        );
        delivered
    }

    /// Listeners currently attached to one market's channel
    pub fn subscriber_count(&self, market_id: &str) -> usize {
        self.inner
            .channels
            .get(&Channel::Market(market_id.to_string()))
            .map_or(0, |listeners| listeners.len())
    }

    /// Listeners across every channel, wildcard included
    pub fn total_subscribers(&self) -> usize {
        self.inner
            .channels
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }

    /// Detach every listener; their subscriptions then read end-of-stream.
    /// Later subscriptions are closed on arrival.
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        let dropped = self.total_subscribers();
        self.inner.channels.clear();
        info!(dropped, "Event broker shut down");
    }
}

/// A live attachment to one broker channel
///
/// Dropping it detaches the listener, so a stream that ends for any reason
/// releases its slot exactly once.
pub struct Subscription {
    id: u64,
    channel: Channel,
    receiver: UpdateReceiver,
    broker: Weak<BrokerInner>,
}

impl Subscription {
    /// Next update, or `None` once the broker has shut down
    pub async fn recv(&mut self) -> Option<Arc<OddsUpdate>> {
        self.receiver.recv().await
    }

    /// Next already-queued update, without waiting
    pub fn try_recv(&mut self) -> Option<Arc<OddsUpdate>> {
        match self.receiver.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Detach now instead of at drop
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.remove(&self.channel, self.id);
        }
        debug!(channel = %self.channel, subscription_id = self.id, "Unsubscribed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::OddsSnapshot;
    use chrono::Utc;

    fn update(market_id: &str, sequence_id: i64) -> OddsUpdate {
        OddsUpdate::durable(OddsSnapshot {
            sequence_id,
            market_id: market_id.to_string(),
            yes_odds: 2.0,
            no_odds: 2.0,
            yes_pool: 100.0,
            no_pool: 100.0,
            total_pool: 200.0,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_only_matching_market() {
        let broker = EventBroker::new();
        let mut a = broker.subscribe("a");
        let mut b = broker.subscribe("b");

        assert_eq!(broker.publish(update("a", 1)), 1);

        assert_eq!(a.recv().await.unwrap().sequence_id(), 1);
        assert!(b.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_wildcard_sees_every_market() {
        let broker = EventBroker::new();
        let mut all = broker.subscribe_all();

        broker.publish(update("a", 1));
        broker.publish(update("b", 2));

        assert_eq!(all.recv().await.unwrap().market_id(), "a");
        assert_eq!(all.recv().await.unwrap().market_id(), "b");
    }

    #[tokio::test]
    async fn test_updates_arrive_in_publish_order() {
        let broker = EventBroker::new();
        let mut sub = broker.subscribe("m");
        for id in 1..=50 {
            broker.publish(update("m", id));
        }
        for id in 1..=50 {
            assert_eq!(sub.recv().await.unwrap().sequence_id(), id);
        }
    }

    #[test]
    fn test_drop_unsubscribes() {
        let broker = EventBroker::new();
        let first = broker.subscribe("m");
        let second = broker.subscribe("m");
        assert_eq!(broker.subscriber_count("m"), 2);

        drop(first);
        assert_eq!(broker.subscriber_count("m"), 1);

        second.unsubscribe();
        assert_eq!(broker.subscriber_count("m"), 0);
        assert_eq!(broker.total_subscribers(), 0);
    }

    #[test]
    fn test_many_listeners_on_one_market() {
        let broker = EventBroker::new();
        let subs: Vec<_> = (0..500).map(|_| broker.subscribe("busy")).collect();
        assert_eq!(broker.publish(update("busy", 1)), 500);
        drop(subs);
        assert_eq!(broker.subscriber_count("busy"), 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_every_subscription() {
        let broker = EventBroker::new();
        let mut sub = broker.subscribe("m");
        let mut all = broker.subscribe_all();

        broker.shutdown();

        assert!(sub.recv().await.is_none());
        assert!(all.recv().await.is_none());
        assert_eq!(broker.publish(update("m", 1)), 0);

        let mut late = broker.subscribe("m");
        assert!(late.recv().await.is_none());
    }

    #[test]
    fn test_brokers_are_isolated() {
        let one = EventBroker::new();
        let two = EventBroker::new();
        let _sub = one.subscribe("m");

        assert_eq!(two.publish(update("m", 1)), 0);
        assert_eq!(one.subscriber_count("m"), 1);
    }

    #[test]
    fn test_subscribe_racing_shutdown_leaves_no_listener() {
        for _ in 0..20 {
            let broker = EventBroker::new();
            let workers: Vec<_> = (0..8)
                .map(|i| {
                    let broker = broker.clone();
                    std::thread::spawn(move || {
                        (0..50)
                            .map(|_| broker.subscribe(&format!("m{}", i % 3)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            broker.shutdown();
            let mut subs: Vec<Subscription> = workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect();

            assert_eq!(broker.total_subscribers(), 0);
            assert_eq!(broker.publish(update("m0", 1)), 0);
            for sub in &mut subs {
                assert!(matches!(
                    sub.receiver.try_recv(),
                    Err(TryRecvError::Disconnected)
                ));
            }
        }
    }
}
