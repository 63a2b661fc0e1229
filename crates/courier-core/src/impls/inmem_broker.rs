//! InMemoryBroker - 開発・テスト用のブローカー
//!
//! Implements both sides of the broker boundary:
//! - `Publisher`: synchronous append of an encoded signature.
//! - `Broker`: async `consume` that waits on a `Notify` until something arrives
//!   or the broker is closed.
//!
//! Single FIFO, no routing. Topology belongs to real broker adapters.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::domain::{DeliveryId, PublishError, TaskSignature};
use crate::ports::{Broker, Clock, Delivery, IdGenerator, Publisher, SystemClock, UlidGenerator};

#[derive(Debug, Clone)]
struct Envelope {
    id: DeliveryId,
    body: Vec<u8>,
    published_at: DateTime<Utc>,
}

#[derive(Default)]
struct BrokerState {
    ready: VecDeque<Envelope>,
    closed: bool,
    acked: usize,
    rejected: usize,
}

struct Shared {
    state: Mutex<BrokerState>,
    notify: Notify,
}

impl Shared {
    // A panicking handler must not wedge the broker for every other consumer.
    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct InMemoryBroker {
    shared: Arc<Shared>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock<C: Clock + Clone + 'static>(clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState::default()),
                notify: Notify::new(),
            }),
            clock: Box::new(clock.clone()),
            ids: Box::new(UlidGenerator::new(clock)),
        }
    }

    /// Stop accepting publishes. Consumers drain the backlog, then get `None`.
    pub fn close(&self) {
        self.shared.state().closed = true;
        self.shared.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state().closed
    }

    /// Messages waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.shared.state().ready.len()
    }

    pub fn acked(&self) -> usize {
        self.shared.state().acked
    }

    pub fn rejected(&self) -> usize {
        self.shared.state().rejected
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for InMemoryBroker {
    fn publish(&self, signature: TaskSignature) -> Result<(), PublishError> {
        let body = signature
            .encode()
            .map_err(|e| PublishError::Encode(e.to_string()))?;

        let mut state = self.shared.state();
        if state.closed {
            return Err(PublishError::Closed);
        }
        let envelope = Envelope {
            id: self.ids.generate_delivery_id(),
            body,
            published_at: self.clock.now(),
        };
        tracing::debug!(task = %signature.name, delivery_id = %envelope.id, "Published");
        state.ready.push_back(envelope);
        drop(state);

        self.shared.notify.notify_one();
        Ok(())
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn consume(&self) -> Option<Box<dyn Delivery>> {
        loop {
            // register interest before checking, so close()/publish() between
            // the check and the await is not missed
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.state();
                if let Some(envelope) = state.ready.pop_front() {
                    return Some(Box::new(InMemoryDelivery {
                        envelope,
                        shared: Arc::clone(&self.shared),
                    }));
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }
}

struct InMemoryDelivery {
    envelope: Envelope,
    shared: Arc<Shared>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn id(&self) -> DeliveryId {
        self.envelope.id
    }

    fn body(&self) -> &[u8] {
        &self.envelope.body
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.envelope.published_at
    }

    async fn ack(self: Box<Self>) {
        self.shared.state().acked += 1;
    }

    async fn reject(self: Box<Self>, requeue: bool) {
        let mut state = self.shared.state();
        if requeue && !state.closed {
            state.ready.push_back(self.envelope.clone());
            drop(state);
            self.shared.notify.notify_one();
        } else {
            state.rejected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskArg;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_consume_roundtrip() {
        let broker = InMemoryBroker::new();
        let sig = TaskSignature::new("add").with_args([TaskArg::int(2), TaskArg::int(3)]);
        broker.publish(sig.clone()).unwrap();
        assert_eq!(broker.pending(), 1);

        let delivery = broker.consume().await.unwrap();
        assert_eq!(TaskSignature::decode(delivery.body()).unwrap(), sig);
        delivery.ack().await;

        assert_eq!(broker.pending(), 0);
        assert_eq!(broker.acked(), 1);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let broker = InMemoryBroker::new();
        for name in ["a", "b", "c"] {
            broker.publish(TaskSignature::new(name)).unwrap();
        }
        let mut names = Vec::new();
        for _ in 0..3 {
            let d = broker.consume().await.unwrap();
            names.push(TaskSignature::decode(d.body()).unwrap().name);
            d.ack().await;
        }
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_publish_wakes_consume() {
        let broker = Arc::new(InMemoryBroker::new());

        let consumer = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.consume().await.map(|d| d.body().to_vec()) }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        broker.publish(TaskSignature::new("late")).unwrap();

        let body = consumer.await.unwrap().unwrap();
        assert_eq!(TaskSignature::decode(&body).unwrap().name, "late");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let broker = InMemoryBroker::new();
        broker.publish(TaskSignature::new("last")).unwrap();
        broker.close();

        assert_eq!(
            broker.publish(TaskSignature::new("too-late")),
            Err(PublishError::Closed)
        );
        assert!(broker.consume().await.is_some());
        assert!(broker.consume().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_idle_consumers() {
        let broker = Arc::new(InMemoryBroker::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move { broker.consume().await.is_none() })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        broker.close();

        for c in consumers {
            assert!(tokio::time::timeout(Duration::from_secs(1), c)
                .await
                .unwrap()
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_reject_with_requeue_redelivers_same_id() {
        let broker = InMemoryBroker::new();
        broker.publish(TaskSignature::new("retry-me")).unwrap();

        let first = broker.consume().await.unwrap();
        let id = first.id();
        first.reject(true).await;

        let second = broker.consume().await.unwrap();
        assert_eq!(second.id(), id);
        second.reject(false).await;

        assert_eq!(broker.rejected(), 1);
        assert_eq!(broker.pending(), 0);
    }

    #[tokio::test]
    async fn test_fixed_clock_stamps_deliveries() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let broker = InMemoryBroker::with_clock(FixedClock::new(at));
        broker.publish(TaskSignature::new("t")).unwrap();

        let d = broker.consume().await.unwrap();
        assert_eq!(d.published_at(), at);
        assert_eq!(d.id().as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
    }
}
