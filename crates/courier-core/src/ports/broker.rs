//! Broker port - inbound delivery
//!
//! The broker owns redelivery and acknowledgement. The core only sees one
//! `Delivery` at a time and settles it once processing finished.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::DeliveryId;

/// One message handed to a consumer.
/// The consumer owns the delivery and must either `ack` or `reject` it.
#[async_trait]
pub trait Delivery: Send {
    fn id(&self) -> DeliveryId;

    /// Encoded `TaskSignature`.
    fn body(&self) -> &[u8];

    fn published_at(&self) -> DateTime<Utc>;

    async fn ack(self: Box<Self>);

    /// `requeue = false` discards the message.
    async fn reject(self: Box<Self>, requeue: bool);
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Wait for the next delivery. `None` once the broker is closed and drained.
    async fn consume(&self) -> Option<Box<dyn Delivery>>;
}
