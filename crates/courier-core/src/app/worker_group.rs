use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::worker_loop::Worker;
use crate::ports::{Broker, Delivery};

/// Worker group handle.
/// - `request_shutdown()` でワーカー全体が新しい delivery を取らなくなる
/// - `join()` で全ワーカーの終了を待てる
///
/// Every consumer shares one `Worker`; the worker keeps no per-message state,
/// so no lock is needed around it.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` consumers.
    pub fn spawn(n: usize, broker: Arc<dyn Broker>, worker: Arc<Worker>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for slot in 0..n {
            let broker = Arc::clone(&broker);
            let worker = Arc::clone(&worker);
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                consume_loop(slot, broker, worker, &mut rx).await;
            }));
        }

        Self { shutdown_tx, joins }
    }

    /// Stop taking new deliveries. In-flight handlers run to completion.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait until every consumer has stopped (broker closed or shutdown).
    pub async fn join(self) {
        for j in self.joins {
            if let Err(e) = j.await {
                tracing::error!(error = %e, "Consumer task panicked");
            }
        }
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        self.join().await;
    }
}

async fn consume_loop(
    slot: usize,
    broker: Arc<dyn Broker>,
    worker: Arc<Worker>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    tracing::debug!(consumer_tag = %worker.consumer_tag(), slot, "Consumer started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let delivery = tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped together with the group handle
                if changed.is_err() {
                    break;
                }
                continue;
            }
            delivery = broker.consume() => delivery,
        };

        let Some(delivery) = delivery else {
            // broker closed and drained
            break;
        };

        handle_delivery(&worker, delivery).await;
    }
    tracing::debug!(consumer_tag = %worker.consumer_tag(), slot, "Consumer stopped");
}

/// Run the synchronous worker loop on the blocking pool, then settle the
/// delivery: ack once every continuation is published, reject (no requeue)
/// when publishing failed.
async fn handle_delivery(worker: &Arc<Worker>, delivery: Box<dyn Delivery>) {
    let delivery_id = delivery.id();
    tracing::debug!(
        consumer_tag = %worker.consumer_tag(),
        delivery_id = %delivery_id,
        published_at = %delivery.published_at(),
        "Received delivery"
    );

    let body = delivery.body().to_vec();
    let processing = tokio::task::spawn_blocking({
        let worker = Arc::clone(worker);
        move || worker.on_message(&body)
    })
    .await;

    match processing {
        Ok(Ok(_)) => {
            delivery.ack().await;
        }
        Ok(Err(e)) => {
            tracing::error!(
                consumer_tag = %worker.consumer_tag(),
                delivery_id = %delivery_id,
                error = %e,
                "Publishing continuations failed, rejecting delivery"
            );
            delivery.reject(false).await;
        }
        Err(e) => {
            tracing::error!(
                consumer_tag = %worker.consumer_tag(),
                delivery_id = %delivery_id,
                error = %e,
                "Handler panicked, rejecting delivery"
            );
            delivery.reject(false).await;
        }
    }
}
